//! Shared state handed to the axum handlers of each service.

use std::sync::Arc;

use crate::kitchen::KitchenService;
use crate::orders::OrderService;

#[derive(Clone)]
pub struct OrderAppState {
    pub orders: Arc<OrderService>,
}

impl OrderAppState {
    pub fn new(orders: Arc<OrderService>) -> Self {
        Self { orders }
    }
}

#[derive(Clone)]
pub struct KitchenAppState {
    pub kitchen: Arc<KitchenService>,
    /// Reported by the health endpoint
    pub topic: String,
    pub consumer_group: String,
}

impl KitchenAppState {
    pub fn new(
        kitchen: Arc<KitchenService>,
        topic: impl Into<String>,
        consumer_group: impl Into<String>,
    ) -> Self {
        Self {
            kitchen,
            topic: topic.into(),
            consumer_group: consumer_group.into(),
        }
    }
}
