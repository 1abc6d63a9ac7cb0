//! Authentication error types.

use thiserror::Error;

use crate::backend::BackendError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] luxe_core::EmailError),

    /// Password too short.
    #[error("password must be at least {min} characters")]
    WeakPassword {
        /// Minimum accepted length.
        min: usize,
    },

    /// An account with this email already exists.
    #[error("an account with this email already exists")]
    EmailTaken,

    /// Wrong email/password combination.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The operation requires a signed-in user.
    #[error("not signed in")]
    NotSignedIn,

    /// The identity provider or profile store could not be reached.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl AuthError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Backend(e) => e.is_retryable(),
            _ => false,
        }
    }
}
