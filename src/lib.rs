#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Order Pipeline
//!
//! Order ingestion, catalog validation and kitchen fulfillment connected by a partitioned,
//! durable event log.
//!
//! ## Overview
//!
//! The order service accepts orders over HTTP, persists them together with an outbox row
//! and publishes `ORDER_PLACED` / `ORDER_STATUS_CHANGED` events keyed by order id. Catalog
//! lookups made during placement are guarded by a circuit breaker so a slow menu service
//! never blocks ordering. The kitchen service consumes the topic as the `kitchen-group`
//! consumer group and materializes an idempotent fulfillment queue.
//!
//! ## Module Organization
//!
//! - [`orders`] - Placement, reads, status transitions, outbox relay
//! - [`catalog`] - Menu-item lookups behind the `menu_service` breaker
//! - [`resilience`] - Circuit breaker
//! - [`messaging`] - Event bus contract, PostgreSQL and in-memory logs, consumer groups
//! - [`kitchen`] - Kitchen projection and its status machine
//! - [`web`] - axum routers for both services
//! - [`config`] - Layered TOML + environment configuration
//! - [`database`] - Pool construction and migrations
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use order_pipeline::catalog::MenuValidator;
//! use order_pipeline::messaging::InMemoryEventBus;
//! use order_pipeline::orders::{InMemoryOrderStore, OrderService};
//! use order_pipeline::resilience::{CircuitBreaker, CircuitBreakerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let breaker = Arc::new(CircuitBreaker::new("menu_service", CircuitBreakerConfig::default()));
//! let service = OrderService::new(
//!     Arc::new(InMemoryOrderStore::new()),
//!     Arc::new(InMemoryEventBus::new(3)),
//!     MenuValidator::disabled(breaker),
//!     "order-events",
//!     Duration::from_secs(2),
//! );
//! let orders = service.list_orders_for_user(42).await?;
//! assert!(orders.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! Every store and the event bus have in-memory implementations, so the whole pipeline
//! runs under `cargo test` without PostgreSQL.

pub mod catalog;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod kitchen;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod orders;
pub mod resilience;
pub mod state_machine;
pub mod web;

pub use config::{ConfigManager, PipelineConfig};
pub use error::{PipelineError, Result};
pub use models::{KitchenOrder, LineItem, Order, OrderEvent, OrderEventType};
pub use state_machine::{KitchenStatus, OrderStatus};
