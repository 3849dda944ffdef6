//! # Outbox Relay
//!
//! Background loop that publishes outbox entries the request path could not deliver
//! (bus outage, publish timeout, crash between commit and publish).

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::service::publish_entry;
use super::store::OrderStore;
use crate::config::OutboxSettings;
use crate::error::Result;
use crate::messaging::EventBus;

/// Counts from one relay pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub published: usize,
    pub failed: usize,
    /// Entries held back because an earlier entry with the same key failed
    pub deferred: usize,
}

pub struct OutboxRelay {
    store: Arc<dyn OrderStore>,
    bus: Arc<dyn EventBus>,
    topic: String,
    settings: OutboxSettings,
    publish_timeout: Duration,
}

impl OutboxRelay {
    pub fn new(
        store: Arc<dyn OrderStore>,
        bus: Arc<dyn EventBus>,
        topic: impl Into<String>,
        settings: OutboxSettings,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            store,
            bus,
            topic: topic.into(),
            settings,
            publish_timeout,
        }
    }

    /// Publish one batch of pending entries, oldest first
    pub async fn relay_once(&self) -> Result<RelayReport> {
        let entries = self.store.pending_outbox(self.settings.batch_size).await?;
        let mut report = RelayReport::default();
        let mut blocked_keys: HashSet<String> = HashSet::new();

        for entry in entries {
            // Keep per-order ordering: nothing overtakes a failed predecessor
            if blocked_keys.contains(&entry.partition_key) {
                report.deferred += 1;
                continue;
            }

            match publish_entry(
                self.store.as_ref(),
                self.bus.as_ref(),
                &self.topic,
                &entry,
                self.publish_timeout,
            )
            .await
            {
                Ok(()) => report.published += 1,
                Err(_) => {
                    report.failed += 1;
                    blocked_keys.insert(entry.partition_key.clone());
                }
            }
        }

        if report != RelayReport::default() {
            info!(
                published = report.published,
                failed = report.failed,
                deferred = report.deferred,
                "🔄 Outbox relay pass complete"
            );
        }
        Ok(report)
    }

    /// Run passes every `relay_interval` until shutdown is signalled
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_ms = self.settings.relay_interval_ms,
            batch_size = self.settings.batch_size,
            "🚀 Outbox relay started"
        );

        let mut interval = tokio::time::interval(self.settings.relay_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.relay_once().await {
                        warn!(error = %e, "Outbox relay pass failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        debug!("Outbox relay stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::InMemoryEventBus;
    use crate::models::{LineItem, NewOrder};
    use crate::orders::InMemoryOrderStore;
    use crate::state_machine::OrderStatus;
    use rust_decimal::Decimal;

    fn new_order() -> NewOrder {
        NewOrder {
            user_id: 1,
            restaurant_id: "r1".to_string(),
            restaurant_name: "Unknown".to_string(),
            items: vec![LineItem {
                id: "i1".to_string(),
                name: "i1".to_string(),
                price: Decimal::from(10),
                quantity: 1,
            }],
            total_amount: Decimal::from(10),
            delivery_address: "X".to_string(),
        }
    }

    fn relay(store: Arc<InMemoryOrderStore>, bus: Arc<InMemoryEventBus>) -> OutboxRelay {
        OutboxRelay::new(
            store,
            bus,
            "order-events",
            OutboxSettings::default(),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn test_relay_publishes_pending_entries_in_order() {
        let store = Arc::new(InMemoryOrderStore::new());
        let bus = Arc::new(InMemoryEventBus::new(1));
        let (order, _) = store.create_order(new_order()).await.unwrap();
        store
            .transition_status(order.id, OrderStatus::Placed, OrderStatus::Accepted)
            .await
            .unwrap();

        let report = relay(store.clone(), bus.clone()).relay_once().await.unwrap();
        assert_eq!(report.published, 2);
        assert!(store.pending_outbox(10).await.unwrap().is_empty());

        let types: Vec<_> = bus
            .messages("order-events")
            .iter()
            .map(|m| m.event_type().unwrap_or_default().to_string())
            .collect();
        assert_eq!(types, vec!["ORDER_PLACED", "ORDER_STATUS_CHANGED"]);
    }

    #[tokio::test]
    async fn test_failure_defers_later_entries_of_same_order() {
        let store = Arc::new(InMemoryOrderStore::new());
        let bus = Arc::new(InMemoryEventBus::new(1));
        let (order, _) = store.create_order(new_order()).await.unwrap();
        store
            .transition_status(order.id, OrderStatus::Placed, OrderStatus::Accepted)
            .await
            .unwrap();
        bus.set_available(false);

        let relay = relay(store.clone(), bus.clone());
        let report = relay.relay_once().await.unwrap();
        assert_eq!(
            report,
            RelayReport {
                published: 0,
                failed: 1,
                deferred: 1
            }
        );

        bus.set_available(true);
        let report = relay.relay_once().await.unwrap();
        assert_eq!(report.published, 2);
        assert_eq!(bus.messages("order-events").len(), 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let store = Arc::new(InMemoryOrderStore::new());
        let bus = Arc::new(InMemoryEventBus::new(1));
        store.create_order(new_order()).await.unwrap();

        let (tx, rx) = watch::channel(false);
        let mut settings = OutboxSettings::default();
        settings.relay_interval_ms = 10;
        let relay = OutboxRelay::new(
            store.clone(),
            bus.clone(),
            "order-events",
            settings,
            Duration::from_millis(200),
        );
        let handle = tokio::spawn(relay.run(rx));

        for _ in 0..100 {
            if !bus.messages("order-events").is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(bus.messages("order-events").len(), 1);
    }
}
