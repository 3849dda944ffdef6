//! # Order Store
//!
//! Persistence contract of the ingestion service. Every operation that changes an order also
//! writes the outbox entry describing the change, inside the same atomic unit, so an order
//! can never exist without the event that announces it.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{PipelineError, Result};
use crate::models::{NewOrder, NewOutboxEntry, Order, OrderEvent, OutboxEntry};
use crate::state_machine::OrderStatus;

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert the order as `PLACED` together with its `ORDER_PLACED` outbox entry
    async fn create_order(&self, order: NewOrder) -> Result<(Order, OutboxEntry)>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Order>>;

    /// Orders of a user, newest first
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Order>>;

    /// Compare-and-set the status and write the `ORDER_STATUS_CHANGED` outbox entry.
    /// Returns `None` when the stored status is no longer `expected` (or the order vanished).
    async fn transition_status(
        &self,
        id: i64,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Option<(Order, OutboxEntry)>>;

    /// Unpublished outbox entries ordered by id
    async fn pending_outbox(&self, limit: i64) -> Result<Vec<OutboxEntry>>;

    async fn pending_outbox_for_order(&self, order_id: i64) -> Result<Vec<OutboxEntry>>;

    async fn mark_published(&self, outbox_id: i64) -> Result<()>;

    async fn record_publish_failure(&self, outbox_id: i64, error: &str) -> Result<()>;

    async fn health_check(&self) -> Result<()>;
}

#[derive(Debug, Default)]
struct MemoryState {
    orders: BTreeMap<i64, Order>,
    outbox: BTreeMap<i64, OutboxEntry>,
    next_order_id: i64,
    next_outbox_id: i64,
}

impl MemoryState {
    fn append_outbox(&mut self, event: &OrderEvent) -> Result<OutboxEntry> {
        let new_entry = NewOutboxEntry::from_event(event)?;
        self.next_outbox_id += 1;
        let entry = OutboxEntry {
            id: self.next_outbox_id,
            order_id: new_entry.order_id,
            event_type: new_entry.event_type,
            partition_key: new_entry.partition_key,
            payload: new_entry.payload,
            created_at: Utc::now(),
            published_at: None,
            attempts: 0,
            last_error: None,
        };
        self.outbox.insert(entry.id, entry.clone());
        Ok(entry)
    }
}

/// Order store held in process memory. One lock covers orders and outbox so each change
/// is atomic with its outbox entry.
#[derive(Debug)]
pub struct InMemoryOrderStore {
    state: Mutex<MemoryState>,
    available: AtomicBool,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate a database outage: every operation fails while unavailable
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// Every outbox entry, published or not
    pub fn outbox(&self) -> Vec<OutboxEntry> {
        self.state.lock().outbox.values().cloned().collect()
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(PipelineError::store("order store is unavailable"))
        }
    }
}

impl Default for InMemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create_order(&self, order: NewOrder) -> Result<(Order, OutboxEntry)> {
        self.check_available()?;
        let mut state = self.state.lock();

        let now = Utc::now();
        let record = Order {
            id: state.next_order_id + 1,
            user_id: order.user_id,
            restaurant_id: order.restaurant_id,
            restaurant_name: order.restaurant_name,
            items: order.items,
            total_amount: order.total_amount.round_dp(2),
            delivery_address: order.delivery_address,
            status: OrderStatus::Placed,
            created_at: now,
            updated_at: now,
        };

        // Serialize first so a failure leaves no partial write behind
        let entry = state.append_outbox(&OrderEvent::placed(&record))?;
        state.next_order_id = record.id;
        state.orders.insert(record.id, record.clone());
        Ok((record, entry))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Order>> {
        self.check_available()?;
        Ok(self.state.lock().orders.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Order>> {
        self.check_available()?;
        let mut orders: Vec<Order> = self
            .state
            .lock()
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn transition_status(
        &self,
        id: i64,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Option<(Order, OutboxEntry)>> {
        self.check_available()?;
        let mut state = self.state.lock();

        let Some(current) = state.orders.get(&id) else {
            return Ok(None);
        };
        if current.status != expected {
            return Ok(None);
        }

        let mut updated = current.clone();
        updated.status = next;
        updated.updated_at = Utc::now();

        let entry = state.append_outbox(&OrderEvent::status_changed(&updated, expected))?;
        state.orders.insert(id, updated.clone());
        Ok(Some((updated, entry)))
    }

    async fn pending_outbox(&self, limit: i64) -> Result<Vec<OutboxEntry>> {
        self.check_available()?;
        Ok(self
            .state
            .lock()
            .outbox
            .values()
            .filter(|entry| !entry.is_published())
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn pending_outbox_for_order(&self, order_id: i64) -> Result<Vec<OutboxEntry>> {
        self.check_available()?;
        Ok(self
            .state
            .lock()
            .outbox
            .values()
            .filter(|entry| entry.order_id == order_id && !entry.is_published())
            .cloned()
            .collect())
    }

    async fn mark_published(&self, outbox_id: i64) -> Result<()> {
        self.check_available()?;
        if let Some(entry) = self.state.lock().outbox.get_mut(&outbox_id) {
            entry.published_at.get_or_insert_with(Utc::now);
        }
        Ok(())
    }

    async fn record_publish_failure(&self, outbox_id: i64, error: &str) -> Result<()> {
        self.check_available()?;
        if let Some(entry) = self.state.lock().outbox.get_mut(&outbox_id) {
            entry.attempts += 1;
            entry.last_error = Some(error.to_string());
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        self.check_available()
    }
}
