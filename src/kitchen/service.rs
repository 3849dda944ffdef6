use std::sync::Arc;

use super::projector::KitchenOrderProjector;
use super::store::KitchenStore;
use crate::error::{PipelineError, Result};
use crate::logging::log_order_operation;
use crate::models::{KitchenOrder, KitchenOrderFilter};
use crate::state_machine::{KitchenStatus, TransitionTable};

/// Kitchen staff operations over the local projection. Never calls the order service.
pub struct KitchenService {
    store: Arc<dyn KitchenStore>,
}

impl KitchenService {
    pub fn new(store: Arc<dyn KitchenStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KitchenStore> {
        &self.store
    }

    /// Event handler feeding this service's store
    pub fn projector(&self) -> KitchenOrderProjector {
        KitchenOrderProjector::new(self.store.clone())
    }

    /// Queue view, oldest received first
    pub async fn list_orders(&self, filter: &KitchenOrderFilter) -> Result<Vec<KitchenOrder>> {
        self.store.list(filter).await
    }

    pub async fn get_order(&self, order_id: i64) -> Result<KitchenOrder> {
        self.store
            .find_by_order_id(order_id)
            .await?
            .ok_or_else(|| PipelineError::not_found("Kitchen order", order_id))
    }

    pub async fn update_status(&self, order_id: i64, next: KitchenStatus) -> Result<KitchenOrder> {
        let current = self.get_order(order_id).await?;
        current.status.ensure_transition(next)?;

        let updated = self
            .store
            .transition_status(order_id, current.status, next)
            .await?
            .ok_or_else(|| {
                PipelineError::conflict(format!("kitchen order {order_id} changed concurrently"))
            })?;

        log_order_operation(
            "kitchen_update_status",
            Some(order_id),
            None,
            updated.status.as_str(),
            Some(current.status.as_str()),
        );
        Ok(updated)
    }

    pub async fn health_check(&self) -> Result<()> {
        self.store.health_check().await
    }
}
