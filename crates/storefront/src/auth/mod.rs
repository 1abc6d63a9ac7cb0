//! Authentication against the hosted identity provider.
//!
//! The provider owns credentials and session tokens; this module owns the
//! client-side view of "who is signed in right now" and the user profile
//! documents that hang off it (role, timestamps) in the backend's `users`
//! collection.
//!
//! Sign-in state is observable: [`AuthService::subscribe`] hands out a
//! watch receiver that sees every signed-out/signed-in transition, which is
//! how the UI gates the cart and checkout surfaces. The cart itself never
//! consults identity.

mod error;

pub use error::AuthError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::watch;
use tracing::instrument;

use luxe_core::{Email, UserId, UserRole};

use crate::backend::{BackendError, DocumentClient};
use crate::config::BackendConfig;

/// Collection user profiles live in.
pub const USERS_COLLECTION: &str = "users";

/// Minimum password length accepted client-side.
const MIN_PASSWORD_LENGTH: usize = 8;

/// The signed-in identity, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Provider-assigned user ID.
    pub uid: UserId,
    /// Email the account was registered with.
    pub email: Email,
}

/// A user profile document from the `users` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Provider-assigned user ID (also the document key).
    pub uid: UserId,
    /// Account email.
    #[serde(default)]
    pub email: String,
    /// Access role. Missing on some legacy profiles; defaults to `user`.
    #[serde(default)]
    pub role: UserRole,
    /// When the profile document was created.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// When the profile document was last updated.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

// =============================================================================
// IdentityClient
// =============================================================================

/// Client for the hosted identity provider's credential endpoints.
///
/// Implements `Debug` manually to keep the API key out of logs.
#[derive(Clone)]
pub struct IdentityClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl IdentityClient {
    /// Create a new identity client for the configured backend.
    #[must_use]
    pub fn new(config: &BackendConfig) -> Self {
        use secrecy::ExposeSecret;
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.as_str().trim_end_matches('/').to_owned(),
            api_key: config.api_key.expose_secret().to_owned(),
        }
    }

    async fn credential_call(
        &self,
        endpoint: &str,
        email: &Email,
        password: &str,
    ) -> Result<reqwest::Response, AuthError> {
        let url = format!("{}/auth/{endpoint}", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(BackendError::from)?;
        Ok(response)
    }

    /// Create an account with the provider.
    async fn sign_up(&self, email: &Email, password: &str) -> Result<AuthUser, AuthError> {
        let response = self.credential_call("sign-up", email, password).await?;
        match response.status().as_u16() {
            409 => Err(AuthError::EmailTaken),
            _ => decode_user(response).await,
        }
    }

    /// Exchange credentials for the account identity.
    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthUser, AuthError> {
        let response = self.credential_call("sign-in", email, password).await?;
        match response.status().as_u16() {
            400 | 401 | 403 | 404 => Err(AuthError::InvalidCredentials),
            _ => decode_user(response).await,
        }
    }
}

async fn decode_user(response: reqwest::Response) -> Result<AuthUser, AuthError> {
    let status = response.status();
    let body = response.text().await.map_err(BackendError::from)?;
    if !status.is_success() {
        return Err(AuthError::Backend(BackendError::Status {
            status: status.as_u16(),
            body: body.chars().take(500).collect(),
        }));
    }
    let user = serde_json::from_str(&body).map_err(BackendError::from)?;
    Ok(user)
}

// =============================================================================
// AuthService
// =============================================================================

/// Client-side authentication state and profile bootstrap.
pub struct AuthService {
    identity: IdentityClient,
    documents: DocumentClient,
    state: watch::Sender<Option<AuthUser>>,
}

impl AuthService {
    /// Create a signed-out service.
    #[must_use]
    pub fn new(identity: IdentityClient, documents: DocumentClient) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            identity,
            documents,
            state,
        }
    }

    /// Register a new account, bootstrap its profile document, and sign in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`/`WeakPassword` for rejected input,
    /// `EmailTaken` if the provider already knows the email, and `Backend`
    /// for remote failures.
    #[instrument(skip_all)]
    pub async fn register(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        let user = self.identity.sign_up(&email, password).await?;
        self.ensure_profile(&user).await?;
        self.state.send_replace(Some(user.clone()));
        Ok(user)
    }

    /// Sign in with email and password.
    ///
    /// Creates the profile document if it is missing (accounts can predate
    /// the profile collection) and backfills a missing role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for a wrong email/password
    /// combination and `Backend` for remote failures.
    #[instrument(skip_all)]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let email = Email::parse(email)?;

        let user = self.identity.sign_in(&email, password).await?;
        self.ensure_profile(&user).await?;
        self.state.send_replace(Some(user.clone()));
        Ok(user)
    }

    /// Sign out. Local state only; the provider session simply stops being
    /// used.
    pub fn sign_out(&self) {
        self.state.send_replace(None);
    }

    /// The currently signed-in user, if any.
    #[must_use]
    pub fn current_user(&self) -> Option<AuthUser> {
        self.state.borrow().clone()
    }

    /// Observe sign-in state transitions. The receiver always starts with
    /// the current state and sees every later change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.state.subscribe()
    }

    /// Make sure a profile document exists for `user`, with a role.
    async fn ensure_profile(&self, user: &AuthUser) -> Result<(), AuthError> {
        match self.documents.get(USERS_COLLECTION, user.uid.as_str()).await {
            Ok(doc) => {
                // Backfill the role on profiles created before roles existed.
                let has_role = doc
                    .fields
                    .get("role")
                    .is_some_and(|role| !role.is_null());
                if !has_role {
                    self.documents
                        .update(
                            USERS_COLLECTION,
                            user.uid.as_str(),
                            &json!({ "role": UserRole::User, "updated_at": Utc::now() }),
                        )
                        .await?;
                }
                Ok(())
            }
            Err(BackendError::NotFound { .. }) => {
                let now = Utc::now();
                let profile = UserProfile {
                    uid: user.uid.clone(),
                    email: user.email.to_string(),
                    role: UserRole::User,
                    created_at: Some(now),
                    updated_at: Some(now),
                };
                let fields = serde_json::to_value(&profile).map_err(BackendError::from)?;
                self.documents
                    .upsert(USERS_COLLECTION, user.uid.as_str(), &fields)
                    .await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword { min: 8 })
        ));
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn test_profile_decodes_legacy_document_without_role() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"uid":"u-1","email":"u@example.com"}"#).unwrap();
        assert_eq!(profile.role, UserRole::User);
        assert_eq!(profile.created_at, None);
    }

    #[test]
    fn test_auth_user_decodes_provider_response() {
        let user: AuthUser =
            serde_json::from_str(r#"{"uid":"u-1","email":"u@example.com"}"#).unwrap();
        assert_eq!(user.uid, UserId::new("u-1"));
        assert_eq!(user.email.as_str(), "u@example.com");
    }

    #[tokio::test]
    async fn test_subscribe_sees_state_transitions() {
        let config = BackendConfig {
            base_url: url::Url::parse("https://api.luxe.test/v1").unwrap(),
            api_key: secrecy::SecretString::from("k".repeat(20)),
        };
        let documents = DocumentClient::new(&config);
        let service = AuthService::new(IdentityClient::new(&config), documents);

        let rx = service.subscribe();
        assert_eq!(*rx.borrow(), None);
        assert_eq!(service.current_user(), None);

        let user = AuthUser {
            uid: UserId::new("u-1"),
            email: Email::parse("u@example.com").unwrap(),
        };
        service.state.send_replace(Some(user.clone()));
        assert_eq!(service.current_user(), Some(user));
        assert!(rx.has_changed().unwrap());

        service.sign_out();
        assert_eq!(service.current_user(), None);
    }
}
