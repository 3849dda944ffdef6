use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::order::LineItem;
use super::order_event::OrderPlacedPayload;
use crate::constants::UNKNOWN_RESTAURANT_NAME;
use crate::state_machine::KitchenStatus;

/// Kitchen-side projection of a placed order, unique per `order_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitchenOrder {
    pub id: i64,
    pub order_id: i64,
    pub restaurant_id: String,
    pub restaurant_name: String,
    pub items: Vec<LineItem>,
    pub status: KitchenStatus,
    pub received_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewKitchenOrder {
    pub order_id: i64,
    pub restaurant_id: String,
    pub restaurant_name: String,
    pub items: Vec<LineItem>,
}

impl From<OrderPlacedPayload> for NewKitchenOrder {
    fn from(placed: OrderPlacedPayload) -> Self {
        Self {
            order_id: placed.order_id,
            restaurant_id: placed.restaurant_id,
            restaurant_name: placed
                .restaurant_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_RESTAURANT_NAME.to_string()),
            items: placed.items,
        }
    }
}

/// Filter for `GET /kitchen/orders`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitchenOrderFilter {
    pub status: Option<KitchenStatus>,
    pub restaurant_id: Option<String>,
}

impl KitchenOrderFilter {
    pub fn matches(&self, order: &KitchenOrder) -> bool {
        self.status.map_or(true, |status| order.status == status)
            && self
                .restaurant_id
                .as_deref()
                .map_or(true, |id| order.restaurant_id == id)
    }
}
