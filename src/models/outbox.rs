use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::order_event::{OrderEvent, OrderEventType};

/// Event row written in the same transaction as the order change it describes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: i64,
    pub order_id: i64,
    pub event_type: OrderEventType,
    pub partition_key: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub last_error: Option<String>,
}

impl OutboxEntry {
    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }
}

/// Outbox row before the store assigns its id
#[derive(Debug, Clone, PartialEq)]
pub struct NewOutboxEntry {
    pub order_id: i64,
    pub event_type: OrderEventType,
    pub partition_key: String,
    pub payload: serde_json::Value,
}

impl NewOutboxEntry {
    pub fn from_event(event: &OrderEvent) -> serde_json::Result<Self> {
        Ok(Self {
            order_id: event.order_id,
            event_type: event.event_type,
            partition_key: event.partition_key(),
            payload: event.to_payload()?,
        })
    }
}
