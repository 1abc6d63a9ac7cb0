//! Product catalog reads.
//!
//! Products live in the backend's `products` collection and are treated as
//! immutable by the storefront; only the admin surface (see
//! [`crate::admin`]) writes them. Listings are cached for five minutes.
//!
//! Document decoding is deliberately tolerant: catalog data predates some
//! fields (image, rating, category), and a listing must not fail because
//! one legacy record is missing them.

use std::time::Duration;

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{instrument, warn};

use luxe_core::{Price, ProductId, Rating};

use crate::backend::{BackendError, Document, DocumentClient};

/// Collection products live in.
pub const PRODUCTS_COLLECTION: &str = "products";

/// Fallback image shown when a product has none of its own.
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/300x300?text=Product+Image";

const CACHE_CAPACITY: u64 = 64;
const CACHE_TTL: Duration = Duration::from_secs(300); // 5 minutes

/// A product in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Product ID (the backend document key).
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Unit price.
    pub price: Price,
    /// Plain text description.
    #[serde(default)]
    pub description: String,
    /// Category name used for filtering.
    #[serde(default)]
    pub category: String,
    /// Image URL, if the product has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Aggregate review rating.
    #[serde(default)]
    pub rating: Rating,
}

impl Product {
    /// Image URL for display, falling back to the shared placeholder.
    #[must_use]
    pub fn image_or_placeholder(&self) -> &str {
        self.image.as_deref().unwrap_or(PLACEHOLDER_IMAGE)
    }
}

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    All,
    Category(String),
}

/// Read access to the product catalog.
#[derive(Clone)]
pub struct Catalog {
    documents: DocumentClient,
    cache: Cache<CacheKey, Vec<Product>>,
}

impl Catalog {
    /// Create a catalog over the given backend client.
    #[must_use]
    pub fn new(documents: DocumentClient) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        Self { documents, cache }
    }

    /// Fetch the full catalog.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the backend cannot be reached; the caller
    /// may retry.
    #[instrument(skip(self))]
    pub async fn fetch_all(&self) -> Result<Vec<Product>, BackendError> {
        if let Some(hit) = self.cache.get(&CacheKey::All).await {
            return Ok(hit);
        }

        let docs = self.documents.list(PRODUCTS_COLLECTION).await?;
        let products = decode_products(docs);
        self.cache.insert(CacheKey::All, products.clone()).await;
        Ok(products)
    }

    /// Fetch the products in one category.
    ///
    /// A blank category yields an empty list without a backend round trip.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the backend cannot be reached; the caller
    /// may retry.
    #[instrument(skip(self))]
    pub async fn fetch_by_category(&self, category: &str) -> Result<Vec<Product>, BackendError> {
        let category = category.trim();
        if category.is_empty() {
            return Ok(Vec::new());
        }

        let key = CacheKey::Category(category.to_owned());
        if let Some(hit) = self.cache.get(&key).await {
            return Ok(hit);
        }

        let docs = self
            .documents
            .query_eq(PRODUCTS_COLLECTION, "category", &json!(category))
            .await?;
        let products = decode_products(docs);
        self.cache.insert(key, products.clone()).await;
        Ok(products)
    }

    /// Fetch a single product by ID. Uncached; detail views are rare next
    /// to listings.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` for an unknown ID, `Parse` for a
    /// document that cannot be decoded even tolerantly, and transport
    /// errors otherwise.
    #[instrument(skip(self))]
    pub async fn fetch(&self, id: &ProductId) -> Result<Product, BackendError> {
        let doc = self.documents.get(PRODUCTS_COLLECTION, id.as_str()).await?;
        Ok(decode_product(doc)?)
    }

    /// Drop all cached listings. Called after admin product mutations.
    pub(crate) fn invalidate(&self) {
        self.cache.invalidate_all();
    }
}

/// Decode one product document, merging the document key in as the ID.
fn decode_product(doc: Document) -> Result<Product, serde_json::Error> {
    let mut fields = doc.fields;
    if let Some(map) = fields.as_object_mut() {
        map.insert("id".to_owned(), Value::String(doc.id));
    }
    serde_json::from_value(fields)
}

/// Decode a listing, skipping documents that cannot be decoded rather than
/// failing the whole page.
fn decode_products(docs: Vec<Document>) -> Vec<Product> {
    docs.into_iter()
        .filter_map(|doc| {
            let id = doc.id.clone();
            match decode_product(doc) {
                Ok(product) => Some(product),
                Err(e) => {
                    warn!(id, error = %e, "skipping undecodable product document");
                    None
                }
            }
        })
        .collect()
}
