//! # Data Models
//!
//! Orders owned by the ingestion service, the events describing them, the outbox rows that
//! carry those events to the bus, and the kitchen's read-only projection.

pub mod kitchen_order;
pub mod order;
pub mod order_event;
pub mod outbox;

pub use kitchen_order::{KitchenOrder, KitchenOrderFilter, NewKitchenOrder};
pub use order::{LineItem, LineItemRequest, NewOrder, Order, PlaceOrderRequest};
pub use order_event::{OrderEvent, OrderEventType, OrderPlacedPayload};
pub use outbox::{NewOutboxEntry, OutboxEntry};
