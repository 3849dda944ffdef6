//! # Messaging Module
//!
//! Partitioned, durable event log with consumer groups. [`EventBus`] is the contract;
//! [`PgEventBus`] persists to PostgreSQL and [`InMemoryEventBus`] serves tests and
//! single-process runs. [`Subscription`] runs a handler over every partition of a topic.

pub mod consumer;
pub mod errors;
pub mod event_bus;
pub mod memory_bus;
pub mod message;
pub mod pg_event_bus;

pub use consumer::{ConsumerSettings, Subscription};
pub use errors::{MessagingError, MessagingResult};
pub use event_bus::{EventBus, EventHandler, HandlerError};
pub use memory_bus::InMemoryEventBus;
pub use message::{partition_for, BusMessage, DeadLetter, PublishReceipt};
pub use pg_event_bus::PgEventBus;
