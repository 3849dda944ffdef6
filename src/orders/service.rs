//! # Order Ingestion Service
//!
//! Validate, persist, then publish. The order and its outbox entry are committed together;
//! publishing happens after the commit and is bounded by `publish_timeout`. A failed or slow
//! publish never undoes the order: the entry stays pending and the [`OutboxRelay`] picks it
//! up later.
//!
//! [`OutboxRelay`]: super::relay::OutboxRelay

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::store::OrderStore;
use crate::catalog::MenuValidator;
use crate::error::{PipelineError, Result};
use crate::logging::{log_error, log_order_operation};
use crate::messaging::EventBus;
use crate::models::{Order, OutboxEntry, PlaceOrderRequest};
use crate::resilience::CircuitBreaker;
use crate::state_machine::{OrderStatus, TransitionTable};

/// Outcome of [`OrderService::place_order`]
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    pub order: Order,
    /// Whether the `ORDER_PLACED` event reached the bus before the call returned
    pub event_published: bool,
}

pub struct OrderService {
    store: Arc<dyn OrderStore>,
    bus: Arc<dyn EventBus>,
    validator: MenuValidator,
    topic: String,
    publish_timeout: Duration,
}

impl OrderService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        bus: Arc<dyn EventBus>,
        validator: MenuValidator,
        topic: impl Into<String>,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            store,
            bus,
            validator,
            topic: topic.into(),
            publish_timeout,
        }
    }

    pub fn store(&self) -> &Arc<dyn OrderStore> {
        &self.store
    }

    pub fn bus(&self) -> &Arc<dyn EventBus> {
        &self.bus
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Breaker guarding catalog lookups, exposed for health reporting
    pub fn menu_breaker(&self) -> &Arc<CircuitBreaker> {
        self.validator.breaker()
    }

    /// Validate the request, check items against the catalog, persist, then publish
    pub async fn place_order(&self, request: PlaceOrderRequest) -> Result<PlacedOrder> {
        let new_order = request.validate()?;

        // Catalog outcomes are advisory; availability of placement wins over strictness
        self.validator.check_items(&new_order.items).await;

        let (order, entry) = self.store.create_order(new_order).await?;
        log_order_operation(
            "place_order",
            Some(order.id),
            Some(order.user_id),
            order.status.as_str(),
            None,
        );
        debug!(order_id = order.id, outbox_id = entry.id, "Outbox entry written");

        let event_published = self.publish_pending_for(order.id).await;
        Ok(PlacedOrder {
            order,
            event_published,
        })
    }

    pub async fn get_order(&self, id: i64) -> Result<Order> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| PipelineError::not_found("Order", id))
    }

    pub async fn list_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>> {
        self.store.list_for_user(user_id).await
    }

    /// Move an order along its lifecycle and announce the change
    pub async fn update_status(&self, id: i64, next: OrderStatus) -> Result<Order> {
        let current = self.get_order(id).await?;
        current.status.ensure_transition(next)?;

        let Some((order, _entry)) = self
            .store
            .transition_status(id, current.status, next)
            .await?
        else {
            // Lost a race with a concurrent update
            let latest = self.get_order(id).await?;
            return Err(PipelineError::conflict(format!(
                "order {id} changed concurrently (now {})",
                latest.status
            )));
        };

        log_order_operation(
            "update_status",
            Some(order.id),
            Some(order.user_id),
            order.status.as_str(),
            Some(current.status.as_str()),
        );

        self.publish_pending_for(order.id).await;
        Ok(order)
    }

    /// Publish every pending outbox entry of one order, oldest first.
    /// Stops at the first failure so the order's events stay in sequence.
    pub async fn publish_pending_for(&self, order_id: i64) -> bool {
        let entries = match self.store.pending_outbox_for_order(order_id).await {
            Ok(entries) => entries,
            Err(e) => {
                log_error("order-service", "load_outbox", &e.to_string(), None);
                return false;
            }
        };

        for entry in entries {
            if let Err(e) = publish_entry(
                self.store.as_ref(),
                self.bus.as_ref(),
                &self.topic,
                &entry,
                self.publish_timeout,
            )
            .await
            {
                warn!(
                    order_id,
                    outbox_id = entry.id,
                    error = %e,
                    "📤 Event left in outbox for the relay"
                );
                return false;
            }
        }
        true
    }
}

/// Publish one outbox entry and record the outcome on it
pub(crate) async fn publish_entry(
    store: &dyn OrderStore,
    bus: &dyn EventBus,
    topic: &str,
    entry: &OutboxEntry,
    timeout: Duration,
) -> Result<()> {
    let outcome =
        tokio::time::timeout(timeout, bus.publish(topic, &entry.partition_key, &entry.payload))
            .await;

    let error = match outcome {
        Ok(Ok(receipt)) => {
            if let Err(e) = store.mark_published(entry.id).await {
                // Event is out; a later relay pass will publish a harmless duplicate
                warn!(outbox_id = entry.id, error = %e, "Failed to mark outbox entry published");
            }
            info!(
                order_id = entry.order_id,
                event_type = %entry.event_type,
                partition = receipt.partition,
                offset = receipt.offset,
                "📤 Event published"
            );
            return Ok(());
        }
        Ok(Err(e)) => PipelineError::from(e),
        Err(_) => PipelineError::Publish(format!(
            "publish timed out after {}ms",
            timeout.as_millis()
        )),
    };

    log_error(
        "order-service",
        "publish",
        &error.to_string(),
        Some(&format!("order {} outbox {}", entry.order_id, entry.id)),
    );
    if let Err(e) = store.record_publish_failure(entry.id, &error.to_string()).await {
        warn!(outbox_id = entry.id, error = %e, "Failed to record publish failure");
    }
    Err(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::InMemoryEventBus;
    use crate::models::LineItemRequest;
    use crate::orders::InMemoryOrderStore;
    use crate::resilience::CircuitBreakerConfig;
    use rust_decimal::Decimal;

    struct Fixture {
        store: Arc<InMemoryOrderStore>,
        bus: Arc<InMemoryEventBus>,
        service: OrderService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryOrderStore::new());
        let bus = Arc::new(InMemoryEventBus::new(3));
        let breaker = Arc::new(CircuitBreaker::new(
            "menu_service",
            CircuitBreakerConfig::default(),
        ));
        let service = OrderService::new(
            store.clone(),
            bus.clone(),
            MenuValidator::disabled(breaker),
            "order-events",
            Duration::from_millis(200),
        );
        Fixture {
            store,
            bus,
            service,
        }
    }

    fn request() -> PlaceOrderRequest {
        PlaceOrderRequest {
            user_id: Some(1),
            restaurant_id: Some("r1".to_string()),
            restaurant_name: None,
            items: Some(vec![LineItemRequest {
                id: Some("i1".to_string()),
                name: None,
                price: Some(Decimal::from(10)),
                quantity: Some(1),
            }]),
            total_amount: Some(Decimal::from(10)),
            delivery_address: Some("X".to_string()),
        }
    }

    #[tokio::test]
    async fn test_place_order_persists_and_publishes() {
        let f = fixture();
        let placed = f.service.place_order(request()).await.unwrap();

        assert!(placed.event_published);
        assert_eq!(placed.order.status, OrderStatus::Placed);
        assert_eq!(placed.order.restaurant_name, "Unknown");

        let fetched = f.service.get_order(placed.order.id).await.unwrap();
        assert_eq!(fetched, placed.order);

        let messages = f.bus.messages("order-events");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].key, placed.order.id.to_string());
        assert_eq!(messages[0].event_type(), Some("ORDER_PLACED"));
        assert!(f.store.pending_outbox(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_keeps_order_and_pending_entry() {
        let f = fixture();
        f.bus.set_available(false);

        let placed = f.service.place_order(request()).await.unwrap();
        assert!(!placed.event_published);
        assert!(f.service.get_order(placed.order.id).await.is_ok());

        let pending = f.store.pending_outbox(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempts, 1);
        assert!(pending[0].last_error.is_some());
    }

    #[tokio::test]
    async fn test_invalid_request_writes_nothing() {
        let f = fixture();
        let mut bad = request();
        bad.total_amount = Some(Decimal::from(11));

        let err = f.service.place_order(bad).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert!(f.store.outbox().is_empty());
        assert!(f.bus.messages("order-events").is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_store_error() {
        let f = fixture();
        f.store.set_available(false);
        let err = f.service.place_order(request()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Store(_)));
    }

    #[tokio::test]
    async fn test_update_status_enforces_whitelist_and_emits_event() {
        let f = fixture();
        let id = f.service.place_order(request()).await.unwrap().order.id;

        let err = f
            .service
            .update_status(id, OrderStatus::Delivered)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Conflict(_)));

        let accepted = f
            .service
            .update_status(id, OrderStatus::Accepted)
            .await
            .unwrap();
        assert_eq!(accepted.status, OrderStatus::Accepted);

        let messages = f.bus.messages("order-events");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].event_type(), Some("ORDER_STATUS_CHANGED"));
        assert_eq!(messages[1].payload["previousStatus"], "PLACED");
        assert_eq!(messages[1].payload["status"], "ACCEPTED");
    }

    #[tokio::test]
    async fn test_missing_order_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.service.get_order(999).await,
            Err(PipelineError::NotFound { .. })
        ));
        assert!(matches!(
            f.service.update_status(999, OrderStatus::Accepted).await,
            Err(PipelineError::NotFound { .. })
        ));
    }
}
