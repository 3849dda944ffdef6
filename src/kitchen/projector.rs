//! # Kitchen Projection Handler
//!
//! Consumes `order-events` in the kitchen consumer group and materializes each placed order
//! into the kitchen queue. Delivery is at-least-once, so the insert is keyed by `order_id`
//! and a redelivered `ORDER_PLACED` is a no-op.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::store::KitchenStore;
use crate::error::PipelineError;
use crate::logging::log_event_operation;
use crate::messaging::{BusMessage, EventHandler, HandlerError};
use crate::models::{NewKitchenOrder, OrderEventType, OrderPlacedPayload};

pub struct KitchenOrderProjector {
    store: Arc<dyn KitchenStore>,
}

impl KitchenOrderProjector {
    pub fn new(store: Arc<dyn KitchenStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EventHandler for KitchenOrderProjector {
    async fn handle(&self, message: &BusMessage) -> Result<(), HandlerError> {
        let Some(event_type) = message.event_type() else {
            return Err(HandlerError::permanent("payload carries no eventType"));
        };

        if event_type != OrderEventType::OrderPlaced.as_str() {
            debug!(
                event_type,
                offset = message.offset,
                "Ignoring event not relevant to the kitchen"
            );
            return Ok(());
        }

        let placed: OrderPlacedPayload = serde_json::from_value(message.payload.clone())
            .map_err(|e| HandlerError::permanent(format!("malformed ORDER_PLACED payload: {e}")))?;
        let order_id = placed.order_id;

        let inserted = self
            .store
            .insert_if_absent(NewKitchenOrder::from(placed))
            .await
            .map_err(|e| match e {
                // Rejected rows fail identically on redelivery
                PipelineError::InvalidData(_) => HandlerError::permanent(e.to_string()),
                _ => HandlerError::transient(e.to_string()),
            })?;

        if inserted {
            log_event_operation(
                "project",
                &message.topic,
                Some(event_type),
                Some(order_id),
                "PENDING",
                None,
            );
        } else {
            info!(
                order_id,
                offset = message.offset,
                "♻️ Duplicate ORDER_PLACED ignored"
            );
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "kitchen-order-projector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::kitchen::InMemoryKitchenStore;
    use crate::models::{KitchenOrder, KitchenOrderFilter};
    use crate::state_machine::KitchenStatus;
    use chrono::Utc;
    use serde_json::json;

    fn message(payload: serde_json::Value) -> BusMessage {
        BusMessage {
            topic: "order-events".to_string(),
            partition: 0,
            offset: 0,
            key: "1".to_string(),
            payload,
            published_at: Utc::now(),
        }
    }

    fn placed_payload(order_id: i64) -> serde_json::Value {
        json!({
            "eventId": "8f6f5a0c-3d1c-4a8e-9a57-4f1f3f0f7a10",
            "eventType": "ORDER_PLACED",
            "orderId": order_id,
            "restaurantId": "r1",
            "restaurantName": "Unknown",
            "userId": 1,
            "items": [{"id": "i1", "name": "i1", "price": 10.0, "quantity": 1}],
            "totalAmount": 10.0,
            "deliveryAddress": "X",
            "timestamp": "2026-01-01T12:00:00Z",
            "status": "PLACED"
        })
    }

    #[tokio::test]
    async fn test_redelivery_creates_exactly_one_record() {
        let store = Arc::new(InMemoryKitchenStore::new());
        let projector = KitchenOrderProjector::new(store.clone());

        let msg = message(placed_payload(1));
        projector.handle(&msg).await.unwrap();
        projector.handle(&msg).await.unwrap();

        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_other_event_types_are_acknowledged() {
        let store = Arc::new(InMemoryKitchenStore::new());
        let projector = KitchenOrderProjector::new(store.clone());

        let mut payload = placed_payload(1);
        payload["eventType"] = json!("ORDER_STATUS_CHANGED");
        assert!(projector.handle(&message(payload)).await.is_ok());
        assert!(projector
            .handle(&message(json!({"eventType": "SOMETHING_NEW"})))
            .await
            .is_ok());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payloads_are_permanent_failures() {
        let projector = KitchenOrderProjector::new(Arc::new(InMemoryKitchenStore::new()));

        let err = projector
            .handle(&message(json!({"orderId": 1})))
            .await
            .unwrap_err();
        assert!(err.is_permanent());

        let err = projector
            .handle(&message(json!({"eventType": "ORDER_PLACED", "orderId": "x"})))
            .await
            .unwrap_err();
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn test_store_outage_is_transient() {
        let store = Arc::new(InMemoryKitchenStore::new());
        store.set_available(false);
        let projector = KitchenOrderProjector::new(store.clone());

        let err = projector
            .handle(&message(placed_payload(1)))
            .await
            .unwrap_err();
        assert!(!err.is_permanent());
    }

    #[tokio::test]
    async fn test_minimal_order_placed_envelope_is_projected() {
        let store = Arc::new(InMemoryKitchenStore::new());
        let projector = KitchenOrderProjector::new(store.clone());

        let payload = json!({
            "eventType": "ORDER_PLACED",
            "orderId": 7,
            "restaurantId": "r1",
            "restaurantName": "Pasta Place",
            "userId": 3,
            "items": [{"id": "i1", "price": 12.5, "qty": 2}],
            "totalAmount": 25.0,
            "deliveryAddress": "1 Main St",
            "timestamp": "2026-01-01T12:00:00Z"
        });
        projector.handle(&message(payload)).await.unwrap();

        let record = store.find_by_order_id(7).await.unwrap().unwrap();
        assert_eq!(record.restaurant_name, "Pasta Place");
        assert_eq!(record.items.len(), 1);
        assert_eq!(record.status, KitchenStatus::Pending);
    }

    struct RejectingStore;

    #[async_trait]
    impl KitchenStore for RejectingStore {
        async fn insert_if_absent(&self, _order: NewKitchenOrder) -> Result<bool> {
            Err(PipelineError::InvalidData(
                "value too long for type character varying(128)".into(),
            ))
        }

        async fn list(&self, _filter: &KitchenOrderFilter) -> Result<Vec<KitchenOrder>> {
            Ok(Vec::new())
        }

        async fn find_by_order_id(&self, _order_id: i64) -> Result<Option<KitchenOrder>> {
            Ok(None)
        }

        async fn transition_status(
            &self,
            _order_id: i64,
            _expected: KitchenStatus,
            _next: KitchenStatus,
        ) -> Result<Option<KitchenOrder>> {
            Ok(None)
        }

        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_rows_rejected_by_the_store_are_permanent_failures() {
        let projector = KitchenOrderProjector::new(Arc::new(RejectingStore));

        let err = projector
            .handle(&message(placed_payload(1)))
            .await
            .unwrap_err();
        assert!(err.is_permanent());
    }
}
