//! Unified error handling.
//!
//! Every module keeps its own error enum; `AppError` is the union the
//! embedding UI matches on. The split the UI cares about is local versus
//! remote: local errors (validation, storage, config) are fixed by the
//! user or the host, remote errors may simply be retried - see
//! [`AppError::is_retryable`].

use thiserror::Error;

use crate::admin::AdminError;
use crate::auth::AuthError;
use crate::backend::BackendError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::orders::OrderError;
use crate::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Durable local storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The hosted backend failed or rejected a call.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Authentication failed.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order operation failed.
    #[error("order error: {0}")]
    Order(#[from] OrderError),

    /// Checkout flow rejected or failed.
    #[error("checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Admin operation refused or failed.
    #[error("admin error: {0}")]
    Admin(#[from] AdminError),
}

impl AppError {
    /// Whether showing the user a "try again" affordance makes sense.
    ///
    /// True only for transient remote failures; validation and permission
    /// errors will fail the same way every time.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Backend(e) => e.is_retryable(),
            Self::Auth(e) => e.is_retryable(),
            Self::Order(e) => e.is_retryable(),
            Self::Checkout(e) => e.is_retryable(),
            Self::Admin(AdminError::Backend(e)) => e.is_retryable(),
            Self::Config(_) | Self::Storage(_) | Self::Admin(_) => false,
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
