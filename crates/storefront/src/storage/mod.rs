//! Durable local key-value storage.
//!
//! The cart persists itself through the [`LocalStore`] trait so the same
//! state machine can run over an in-memory map in tests and a real on-disk
//! store in the app. Implementations use interior mutability (`&self`
//! methods) so a store can be shared behind a plain reference or `Arc`.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::fmt::Debug;

use thiserror::Error;

/// Errors from local storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key contains characters the store cannot represent.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// A synchronous, device-local key-value store.
///
/// Keys are short well-known strings; values are opaque bytes chosen by the
/// caller. `get` on an unknown key returns `Ok(None)`, and `remove` of an
/// unknown key succeeds.
pub trait LocalStore: Send + Sync + Debug {
    /// Retrieve the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the underlying store cannot be read.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Insert or overwrite the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be written durably.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Remove the value under `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the underlying store cannot be modified.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
