//! Luxe Core - Shared types library.
//!
//! This crate provides common types used across all Luxe Store components:
//! - `storefront` - the storefront client library (cart, catalog, checkout)
//! - `integration-tests` - cross-crate flow tests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no network access, no
//! storage. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails,
//!   ratings, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
