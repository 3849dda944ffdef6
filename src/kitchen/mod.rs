//! # Kitchen Materialization
//!
//! Local fulfillment queue fed by the `kitchen-group` consumer. Kitchen status changes are
//! made through [`KitchenService`] against this projection only.

pub mod pg_store;
pub mod projector;
pub mod service;
pub mod store;

pub use pg_store::PgKitchenStore;
pub use projector::KitchenOrderProjector;
pub use service::KitchenService;
pub use store::{InMemoryKitchenStore, KitchenStore};
