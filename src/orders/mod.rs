//! # Order Ingestion
//!
//! Owns the order lifecycle: placement, reads, status transitions and delivery of the
//! resulting events through the transactional outbox.

pub mod pg_store;
pub mod relay;
pub mod service;
pub mod store;

pub use pg_store::PgOrderStore;
pub use relay::{OutboxRelay, RelayReport};
pub use service::{OrderService, PlacedOrder};
pub use store::{InMemoryOrderStore, OrderStore};
