use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{PipelineError, Result};
use crate::models::{KitchenOrder, KitchenOrderFilter, NewKitchenOrder};
use crate::state_machine::KitchenStatus;

/// Persistence of the kitchen projection, keyed by `order_id`
#[async_trait]
pub trait KitchenStore: Send + Sync {
    /// Insert as `PENDING` unless a record for the order exists; true when inserted
    async fn insert_if_absent(&self, order: NewKitchenOrder) -> Result<bool>;

    /// Matching records, oldest received first
    async fn list(&self, filter: &KitchenOrderFilter) -> Result<Vec<KitchenOrder>>;

    async fn find_by_order_id(&self, order_id: i64) -> Result<Option<KitchenOrder>>;

    /// Compare-and-set on the current status; `None` when it no longer matches `expected`
    async fn transition_status(
        &self,
        order_id: i64,
        expected: KitchenStatus,
        next: KitchenStatus,
    ) -> Result<Option<KitchenOrder>>;

    async fn health_check(&self) -> Result<()>;
}

#[derive(Debug)]
pub struct InMemoryKitchenStore {
    orders: RwLock<BTreeMap<i64, KitchenOrder>>,
    available: AtomicBool,
}

impl InMemoryKitchenStore {
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate a database outage: every operation fails while unavailable
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.orders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.read().is_empty()
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(PipelineError::store("kitchen store is unavailable"))
        }
    }
}

impl Default for InMemoryKitchenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KitchenStore for InMemoryKitchenStore {
    async fn insert_if_absent(&self, order: NewKitchenOrder) -> Result<bool> {
        self.check_available()?;
        let mut orders = self.orders.write();
        if orders.contains_key(&order.order_id) {
            return Ok(false);
        }

        let now = Utc::now();
        let id = orders.values().map(|existing| existing.id).max().unwrap_or(0) + 1;
        orders.insert(
            order.order_id,
            KitchenOrder {
                id,
                order_id: order.order_id,
                restaurant_id: order.restaurant_id,
                restaurant_name: order.restaurant_name,
                items: order.items,
                status: KitchenStatus::Pending,
                received_at: now,
                updated_at: now,
            },
        );
        Ok(true)
    }

    async fn list(&self, filter: &KitchenOrderFilter) -> Result<Vec<KitchenOrder>> {
        self.check_available()?;
        let mut matching: Vec<KitchenOrder> = self
            .orders
            .read()
            .values()
            .filter(|order| filter.matches(order))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.received_at.cmp(&b.received_at).then(a.id.cmp(&b.id)));
        Ok(matching)
    }

    async fn find_by_order_id(&self, order_id: i64) -> Result<Option<KitchenOrder>> {
        self.check_available()?;
        Ok(self.orders.read().get(&order_id).cloned())
    }

    async fn transition_status(
        &self,
        order_id: i64,
        expected: KitchenStatus,
        next: KitchenStatus,
    ) -> Result<Option<KitchenOrder>> {
        self.check_available()?;
        let mut orders = self.orders.write();
        match orders.get_mut(&order_id) {
            Some(order) if order.status == expected => {
                order.status = next;
                order.updated_at = Utc::now();
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn health_check(&self) -> Result<()> {
        self.check_available()
    }
}
