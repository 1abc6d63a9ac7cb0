//! Integration tests for Luxe Store.
//!
//! # Test Categories
//!
//! - `cart_persistence` - cart snapshots surviving process restarts over
//!   the on-disk store, including corrupt-snapshot recovery
//! - `checkout_flow` - the place-order-then-clear-cart orchestration
//!   against order-gateway doubles
//!
//! Everything here runs against local doubles and a temp directory; no
//! network access or live backend is needed.

/// Create a unique scratch directory under the system temp dir.
///
/// Callers own cleanup; tests remove the directory when they pass.
#[must_use]
pub fn scratch_dir(tag: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("luxe-it-{tag}-{}", uuid::Uuid::new_v4()))
}

/// Install a fmt subscriber so `RUST_LOG=debug cargo test` shows the
/// storefront's tracing output. Safe to call from every test; only the
/// first call wins.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
