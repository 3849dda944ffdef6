//! # Consumer Group Runner
//!
//! Drives an [`EventHandler`] over every partition of a topic for one consumer group. Each
//! partition gets its own task so handler execution is sequential within a partition and
//! concurrent across partitions. The committed offset only advances past a message after
//! the handler returned `Ok` (or after a permanent failure was dead-lettered), so transient
//! failures and crashes lead to redelivery, never to skipped messages.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::errors::MessagingResult;
use super::event_bus::{EventBus, EventHandler, HandlerError};
use super::message::{BusMessage, DeadLetter};
use crate::constants::dead_letter_topic;

/// Polling and retry behaviour of a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerSettings {
    pub poll_interval_ms: u64,
    pub batch_size: usize,
    pub retry_backoff_ms: u64,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            batch_size: 50,
            retry_backoff_ms: 1000,
        }
    }
}

impl ConsumerSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// A running consumer group member owning every partition of one topic
pub struct Subscription {
    topic: String,
    consumer_group: String,
    shutdown_tx: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

struct PartitionWorker {
    bus: Arc<dyn EventBus>,
    handler: Arc<dyn EventHandler>,
    topic: String,
    consumer_group: String,
    partition: u32,
    settings: ConsumerSettings,
    shutdown: watch::Receiver<bool>,
    detached: bool,
}

/// What the worker should do after one message
enum Disposition {
    Advance,
    Retry,
}

impl Subscription {
    /// Subscribe `handler` to `topic` under `consumer_group` and start one task per partition
    pub async fn start(
        bus: Arc<dyn EventBus>,
        topic: &str,
        consumer_group: &str,
        handler: Arc<dyn EventHandler>,
        settings: ConsumerSettings,
    ) -> MessagingResult<Self> {
        let partitions = bus.ensure_topic(topic).await?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            topic,
            consumer_group,
            partitions,
            handler = handler.name(),
            "🚀 Starting consumer group subscription"
        );

        let workers = (0..partitions)
            .map(|partition| {
                let worker = PartitionWorker {
                    bus: bus.clone(),
                    handler: handler.clone(),
                    topic: topic.to_string(),
                    consumer_group: consumer_group.to_string(),
                    partition,
                    settings: settings.clone(),
                    shutdown: shutdown_rx.clone(),
                    detached: false,
                };
                tokio::spawn(worker.run())
            })
            .collect();

        Ok(Self {
            topic: topic.to_string(),
            consumer_group: consumer_group.to_string(),
            shutdown_tx,
            workers,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn consumer_group(&self) -> &str {
        &self.consumer_group
    }

    pub fn is_running(&self) -> bool {
        self.workers.iter().any(|worker| !worker.is_finished())
    }

    /// Stop every partition worker after its in-flight message and wait for them to exit
    pub async fn shutdown(self) {
        info!(
            topic = %self.topic,
            consumer_group = %self.consumer_group,
            "🛑 Leaving consumer group"
        );
        let _ = self.shutdown_tx.send(true);
        for result in join_all(self.workers).await {
            if let Err(e) = result {
                error!(error = %e, "Partition worker terminated abnormally");
            }
        }
    }
}

impl PartitionWorker {
    async fn run(mut self) {
        debug!(
            topic = %self.topic,
            consumer_group = %self.consumer_group,
            partition = self.partition,
            "📥 Partition worker started"
        );

        'poll: while !self.shutdown_requested() {
            let batch = match self
                .bus
                .fetch(
                    &self.topic,
                    &self.consumer_group,
                    self.partition,
                    self.settings.batch_size,
                )
                .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(partition = self.partition, error = %e, "Fetch failed, backing off");
                    self.idle(self.settings.retry_backoff()).await;
                    continue;
                }
            };

            if batch.is_empty() {
                self.idle(self.settings.poll_interval()).await;
                continue;
            }

            for message in batch {
                if self.shutdown_requested() {
                    break 'poll;
                }
                match self.process(&message).await {
                    Disposition::Advance => {
                        if let Err(e) = self
                            .bus
                            .commit(
                                &self.topic,
                                &self.consumer_group,
                                self.partition,
                                message.offset + 1,
                            )
                            .await
                        {
                            // Uncommitted: the message will be redelivered
                            warn!(offset = message.offset, error = %e, "Offset commit failed");
                            self.idle(self.settings.retry_backoff()).await;
                            continue 'poll;
                        }
                    }
                    Disposition::Retry => {
                        self.idle(self.settings.retry_backoff()).await;
                        continue 'poll;
                    }
                }
            }
        }

        debug!(partition = self.partition, "Partition worker stopped");
    }

    async fn process(&self, message: &BusMessage) -> Disposition {
        match self.handler.handle(message).await {
            Ok(()) => Disposition::Advance,
            Err(HandlerError::Transient(reason)) => {
                warn!(
                    handler = self.handler.name(),
                    partition = message.partition,
                    offset = message.offset,
                    reason = %reason,
                    "🔁 Transient handler failure, message will be redelivered"
                );
                Disposition::Retry
            }
            Err(HandlerError::Permanent(reason)) => self.dead_letter(message, &reason).await,
        }
    }

    async fn dead_letter(&self, message: &BusMessage, reason: &str) -> Disposition {
        let envelope = DeadLetter::new(message, &self.consumer_group, reason);
        let payload = match serde_json::to_value(&envelope) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "Failed to serialize dead letter");
                return Disposition::Retry;
            }
        };

        let dlq = dead_letter_topic(&self.topic);
        match self.bus.publish(&dlq, &message.key, &payload).await {
            Ok(receipt) => {
                error!(
                    handler = self.handler.name(),
                    offset = message.offset,
                    dead_letter_topic = %dlq,
                    dead_letter_offset = receipt.offset,
                    reason,
                    "☠️ Message routed to dead-letter topic"
                );
                Disposition::Advance
            }
            Err(e) => {
                warn!(error = %e, "Dead-letter publish failed, message will be redelivered");
                Disposition::Retry
            }
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.detached || *self.shutdown.borrow()
    }

    /// Sleep for `duration` unless shutdown is signalled first
    async fn idle(&mut self, duration: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            changed = self.shutdown.changed() => {
                // Subscription dropped without an explicit shutdown
                if changed.is_err() {
                    self.detached = true;
                }
            }
        }
    }
}
