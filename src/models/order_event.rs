use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::order::{LineItem, Order};
use crate::state_machine::OrderStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEventType {
    OrderPlaced,
    OrderStatusChanged,
}

impl OrderEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderPlaced => "ORDER_PLACED",
            Self::OrderStatusChanged => "ORDER_STATUS_CHANGED",
        }
    }
}

impl fmt::Display for OrderEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ORDER_PLACED" => Ok(Self::OrderPlaced),
            "ORDER_STATUS_CHANGED" => Ok(Self::OrderStatusChanged),
            _ => Err(format!("Unknown order event type: {s}")),
        }
    }
}

/// Immutable fact about an order, as carried on the `order-events` topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub event_id: Uuid,
    pub event_type: OrderEventType,
    pub order_id: i64,
    pub restaurant_id: String,
    pub restaurant_name: String,
    pub user_id: i64,
    pub items: Vec<LineItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub delivery_address: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
}

impl OrderEvent {
    fn from_order(order: &Order, event_type: OrderEventType) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type,
            order_id: order.id,
            restaurant_id: order.restaurant_id.clone(),
            restaurant_name: order.restaurant_name.clone(),
            user_id: order.user_id,
            items: order.items.clone(),
            total_amount: order.total_amount,
            delivery_address: order.delivery_address.clone(),
            timestamp: Utc::now(),
            previous_status: None,
            status: None,
        }
    }

    pub fn placed(order: &Order) -> Self {
        let mut event = Self::from_order(order, OrderEventType::OrderPlaced);
        event.status = Some(order.status);
        event
    }

    pub fn status_changed(order: &Order, previous: OrderStatus) -> Self {
        let mut event = Self::from_order(order, OrderEventType::OrderStatusChanged);
        event.previous_status = Some(previous);
        event.status = Some(order.status);
        event
    }

    /// All events of one order share a partition
    pub fn partition_key(&self) -> String {
        self.order_id.to_string()
    }

    /// Identity consumers deduplicate on
    pub fn message_identity(&self) -> String {
        match (self.event_type, self.status) {
            (OrderEventType::OrderStatusChanged, Some(status)) => {
                format!("{}:{}:{}", self.order_id, self.event_type, status)
            }
            _ => format!("{}:{}", self.order_id, self.event_type),
        }
    }

    pub fn to_payload(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// The part of an `ORDER_PLACED` payload the kitchen projects.
///
/// Producers predating `eventId`, `status` and the rest of the current envelope are still
/// accepted; only the order identity, restaurant and items are required.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlacedPayload {
    #[serde(default)]
    pub event_id: Option<Uuid>,
    pub order_id: i64,
    pub restaurant_id: String,
    #[serde(default)]
    pub restaurant_name: Option<String>,
    pub items: Vec<LineItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> Order {
        Order {
            id: 42,
            user_id: 1,
            restaurant_id: "r1".into(),
            restaurant_name: "Diner".into(),
            items: vec![LineItem {
                id: "i1".into(),
                name: "Burger".into(),
                price: Decimal::new(1050, 2),
                quantity: 2,
            }],
            total_amount: Decimal::new(2100, 2),
            delivery_address: "X".into(),
            status: OrderStatus::Placed,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_placed_event_wire_shape() {
        let event = OrderEvent::placed(&sample_order());
        let payload = event.to_payload().unwrap();

        assert_eq!(payload["eventType"], "ORDER_PLACED");
        assert_eq!(payload["orderId"], 42);
        assert_eq!(payload["restaurantName"], "Diner");
        assert_eq!(payload["totalAmount"], 21.0);
        assert_eq!(payload["items"][0]["price"], 10.5);
        assert!(payload.get("previousStatus").is_none());
        assert_eq!(event.partition_key(), "42");
    }

    #[test]
    fn test_status_changed_identity_includes_status() {
        let mut order = sample_order();
        order.status = OrderStatus::Accepted;
        let event = OrderEvent::status_changed(&order, OrderStatus::Placed);

        assert_eq!(event.message_identity(), "42:ORDER_STATUS_CHANGED:ACCEPTED");
        assert_eq!(
            OrderEvent::placed(&sample_order()).message_identity(),
            "42:ORDER_PLACED"
        );
    }

    #[test]
    fn test_placed_payload_accepts_minimal_envelope() {
        let payload = serde_json::json!({
            "eventType": "ORDER_PLACED",
            "orderId": 7,
            "restaurantId": "r1",
            "restaurantName": "Luigi's",
            "userId": 1,
            "items": [{"id": "i1", "price": 10, "qty": 1}],
            "totalAmount": 10,
            "deliveryAddress": "X",
            "timestamp": "2026-01-01T12:00:00.000Z"
        });
        let placed: OrderPlacedPayload = serde_json::from_value(payload).unwrap();
        assert_eq!(placed.event_id, None);
        assert_eq!(placed.order_id, 7);
        assert_eq!(placed.items[0].quantity, 1);
        assert_eq!(placed.items[0].name, "");

        let full = OrderEvent::placed(&sample_order());
        let placed: OrderPlacedPayload =
            serde_json::from_value(full.to_payload().unwrap()).unwrap();
        assert_eq!(placed.event_id, Some(full.event_id));
        assert_eq!(placed.restaurant_name.as_deref(), Some("Diner"));
    }

    #[test]
    fn test_payload_parses_back() {
        let event = OrderEvent::placed(&sample_order());
        let parsed: OrderEvent = serde_json::from_value(event.to_payload().unwrap()).unwrap();
        assert_eq!(parsed.order_id, event.order_id);
        assert_eq!(parsed.items, event.items);
    }
}
