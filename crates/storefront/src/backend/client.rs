//! JSON REST client for the hosted document database.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use super::BackendError;
use crate::config::BackendConfig;

/// How much of an error body to keep for diagnostics.
const ERROR_BODY_LIMIT: usize = 500;

/// One record in the hosted document database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Backend-assigned document ID, unique within its collection.
    pub id: String,
    /// The document payload.
    #[serde(default)]
    pub fields: Value,
}

/// Envelope the backend wraps collection reads in.
#[derive(Debug, Deserialize)]
struct DocumentList {
    #[serde(default)]
    documents: Vec<Document>,
}

/// Client for the hosted document database.
///
/// Cheaply cloneable; all clones share one HTTP connection pool.
/// Implements `Debug` manually to keep the API key out of logs.
#[derive(Clone)]
pub struct DocumentClient {
    inner: Arc<DocumentClientInner>,
}

struct DocumentClientInner {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for DocumentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentClient")
            .field("base_url", &self.inner.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl DocumentClient {
    /// Create a new client for the configured backend.
    #[must_use]
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            inner: Arc::new(DocumentClientInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.as_str().trim_end_matches('/').to_owned(),
                api_key: config.api_key.expose_secret().to_owned(),
            }),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = self.inner.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(segment);
        }
        url
    }

    /// Send a request and map transport/status failures to `BackendError`.
    async fn send(
        &self,
        method: Method,
        url: String,
        body: Option<&Value>,
    ) -> Result<reqwest::Response, BackendError> {
        let mut request = self
            .inner
            .client
            .request(method, url)
            .bearer_auth(&self.inner.api_key);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        Ok(response)
    }

    /// Read a response body, turning non-success statuses into errors.
    async fn read_body(response: reqwest::Response) -> Result<String, BackendError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        Ok(body)
    }

    /// Fetch every document in `collection`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport failure, non-success status, or
    /// an unparseable response.
    #[instrument(skip(self))]
    pub async fn list(&self, collection: &str) -> Result<Vec<Document>, BackendError> {
        let response = self
            .send(Method::GET, self.endpoint(&[collection]), None)
            .await?;
        let body = Self::read_body(response).await?;
        let list: DocumentList = serde_json::from_str(&body)?;
        debug!(count = list.documents.len(), "listed collection");
        Ok(list.documents)
    }

    /// Fetch the documents in `collection` whose `field` equals `value`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport failure, non-success status, or
    /// an unparseable response.
    #[instrument(skip(self, value))]
    pub async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, BackendError> {
        let body = json!({ "field": field, "equals": value });
        let response = self
            .send(
                Method::POST,
                self.endpoint(&[collection, "query"]),
                Some(&body),
            )
            .await?;
        let body = Self::read_body(response).await?;
        let list: DocumentList = serde_json::from_str(&body)?;
        debug!(count = list.documents.len(), "query matched");
        Ok(list.documents)
    }

    /// Fetch a single document by ID.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the document does not exist, and
    /// other `BackendError` variants for transport or decode failures.
    #[instrument(skip(self))]
    pub async fn get(&self, collection: &str, id: &str) -> Result<Document, BackendError> {
        let response = self
            .send(Method::GET, self.endpoint(&[collection, id]), None)
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound {
                collection: collection.to_owned(),
                id: id.to_owned(),
            });
        }
        let body = Self::read_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Create a document with a backend-assigned ID. Returns the stored
    /// document.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport failure, non-success status, or
    /// an unparseable response.
    #[instrument(skip(self, fields))]
    pub async fn create(
        &self,
        collection: &str,
        fields: &Value,
    ) -> Result<Document, BackendError> {
        let response = self
            .send(Method::POST, self.endpoint(&[collection]), Some(fields))
            .await?;
        let body = Self::read_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Create or fully replace the document at a caller-chosen ID.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport failure or non-success status.
    #[instrument(skip(self, fields))]
    pub async fn upsert(
        &self,
        collection: &str,
        id: &str,
        fields: &Value,
    ) -> Result<(), BackendError> {
        let response = self
            .send(Method::PUT, self.endpoint(&[collection, id]), Some(fields))
            .await?;
        Self::read_body(response).await?;
        Ok(())
    }

    /// Merge `fields` into an existing document.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the document does not exist, and
    /// other `BackendError` variants for transport failures.
    #[instrument(skip(self, fields))]
    pub async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: &Value,
    ) -> Result<(), BackendError> {
        let response = self
            .send(
                Method::PATCH,
                self.endpoint(&[collection, id]),
                Some(fields),
            )
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound {
                collection: collection.to_owned(),
                id: id.to_owned(),
            });
        }
        Self::read_body(response).await?;
        Ok(())
    }

    /// Delete a document. Deleting an already-absent document succeeds.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport failure or non-success status.
    #[instrument(skip(self))]
    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), BackendError> {
        let response = self
            .send(Method::DELETE, self.endpoint(&[collection, id]), None)
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::read_body(response).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use url::Url;

    fn test_client() -> DocumentClient {
        DocumentClient::new(&BackendConfig {
            base_url: Url::parse("https://api.luxe.test/v1/").unwrap(),
            api_key: SecretString::from("k".repeat(20)),
        })
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let client = test_client();
        assert_eq!(
            client.endpoint(&["products"]),
            "https://api.luxe.test/v1/products"
        );
        assert_eq!(
            client.endpoint(&["products", "p-1"]),
            "https://api.luxe.test/v1/products/p-1"
        );
    }

    #[test]
    fn test_document_decodes_without_fields() {
        let doc: Document = serde_json::from_str(r#"{"id":"p-1"}"#).unwrap();
        assert_eq!(doc.id, "p-1");
        assert_eq!(doc.fields, Value::Null);
    }

    #[test]
    fn test_document_list_decodes_empty_envelope() {
        let list: DocumentList = serde_json::from_str("{}").unwrap();
        assert!(list.documents.is_empty());
    }
}
