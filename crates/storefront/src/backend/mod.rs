//! Hosted document database client.
//!
//! The backend stores every record as a JSON document inside a named
//! collection, keyed by an opaque string ID. This module exposes that
//! surface as plain CRUD plus a single-field equality query - the only
//! query shape the storefront needs. Services ([`crate::catalog`],
//! [`crate::orders`], [`crate::auth`], [`crate::admin`]) build their typed
//! APIs on top.
//!
//! Failures are never swallowed here: every remote error reaches the
//! calling service as a [`BackendError`], and the caller decides whether to
//! retry or surface it.

mod client;

pub use client::{Document, DocumentClient};

use thiserror::Error;

/// Errors that can occur when talking to the hosted backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP transport failed (connection, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("backend returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },

    /// Rate limited by the backend.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The requested document does not exist.
    #[error("document not found: {collection}/{id}")]
    NotFound {
        /// Collection the lookup ran against.
        collection: String,
        /// Document ID that was requested.
        id: String,
    },

    /// Response body was not the JSON shape we expect.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl BackendError {
    /// Whether retrying the same call may succeed.
    ///
    /// Transport failures, server-side errors, and rate limits are
    /// transient; missing documents and malformed payloads are not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::RateLimited(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::NotFound { .. } | Self::Parse(_) => false,
        }
    }
}
