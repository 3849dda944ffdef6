//! # Catalog Validation
//!
//! Synchronous menu-item lookups performed while placing an order. Every lookup runs
//! through the `menu_service` circuit breaker; a slow or failing catalog degrades into
//! "validation skipped" rather than a failed order.

pub mod client;
pub mod validator;

pub use client::{CatalogClient, CatalogError, HttpCatalogClient, MenuItem};
pub use validator::{ItemCheck, MenuValidator};
