//! In-process implementation of [`EventBus`] for tests and single-process runs.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use super::errors::{MessagingError, MessagingResult};
use super::event_bus::EventBus;
use super::message::{partition_for, BusMessage, PublishReceipt};

type OffsetKey = (String, String, u32);

#[derive(Debug)]
pub struct InMemoryEventBus {
    default_partitions: u32,
    /// topic -> partitions -> messages, offset == index
    topics: RwLock<HashMap<String, Vec<Vec<BusMessage>>>>,
    /// (topic, group, partition) -> next offset to deliver
    offsets: DashMap<OffsetKey, i64>,
    available: AtomicBool,
}

impl InMemoryEventBus {
    pub fn new(default_partitions: u32) -> Self {
        Self {
            default_partitions: default_partitions.max(1),
            topics: RwLock::new(HashMap::new()),
            offsets: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate a broker outage: every operation fails while unavailable
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// All messages of a topic, partition by partition
    pub fn messages(&self, topic: &str) -> Vec<BusMessage> {
        self.topics
            .read()
            .get(topic)
            .map(|partitions| partitions.iter().flatten().cloned().collect())
            .unwrap_or_default()
    }

    fn check_available(&self) -> MessagingResult<()> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(MessagingError::unavailable("in-memory event bus is offline"))
        }
    }

    fn validate_topic(topic: &str) -> MessagingResult<()> {
        if topic.trim().is_empty() {
            return Err(MessagingError::invalid_topic_name(topic, "topic name is empty"));
        }
        Ok(())
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new(3)
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn ensure_topic(&self, topic: &str) -> MessagingResult<u32> {
        Self::validate_topic(topic)?;
        let mut topics = self.topics.write();
        let partitions = topics
            .entry(topic.to_string())
            .or_insert_with(|| vec![Vec::new(); self.default_partitions as usize]);
        Ok(partitions.len() as u32)
    }

    async fn publish(
        &self,
        topic: &str,
        partition_key: &str,
        payload: &serde_json::Value,
    ) -> MessagingResult<PublishReceipt> {
        self.check_available()?;
        self.ensure_topic(topic).await?;

        let mut topics = self.topics.write();
        let partitions = topics
            .get_mut(topic)
            .ok_or_else(|| MessagingError::topic_operation(topic, "publish", "topic vanished"))?;
        let partition = partition_for(partition_key, partitions.len() as u32);
        let log = &mut partitions[partition as usize];
        let offset = log.len() as i64;

        log.push(BusMessage {
            topic: topic.to_string(),
            partition,
            offset,
            key: partition_key.to_string(),
            payload: payload.clone(),
            published_at: Utc::now(),
        });

        debug!(topic, partition, offset, key = partition_key, "📤 Message appended");
        Ok(PublishReceipt { partition, offset })
    }

    async fn partition_count(&self, topic: &str) -> MessagingResult<u32> {
        self.ensure_topic(topic).await
    }

    async fn fetch(
        &self,
        topic: &str,
        consumer_group: &str,
        partition: u32,
        max_messages: usize,
    ) -> MessagingResult<Vec<BusMessage>> {
        self.check_available()?;
        let start = self.committed_offset(topic, consumer_group, partition).await?;

        let topics = self.topics.read();
        let Some(partitions) = topics.get(topic) else {
            return Ok(Vec::new());
        };
        let log = partitions
            .get(partition as usize)
            .ok_or_else(|| MessagingError::PartitionOutOfRange {
                topic: topic.to_string(),
                partition,
            })?;

        Ok(log
            .iter()
            .skip(start.max(0) as usize)
            .take(max_messages)
            .cloned()
            .collect())
    }

    async fn commit(
        &self,
        topic: &str,
        consumer_group: &str,
        partition: u32,
        next_offset: i64,
    ) -> MessagingResult<()> {
        self.check_available()?;
        let key = (topic.to_string(), consumer_group.to_string(), partition);
        let mut entry = self.offsets.entry(key).or_insert(0);
        // Offsets never move backwards
        if next_offset > *entry {
            *entry = next_offset;
        }
        Ok(())
    }

    async fn committed_offset(
        &self,
        topic: &str,
        consumer_group: &str,
        partition: u32,
    ) -> MessagingResult<i64> {
        let key = (topic.to_string(), consumer_group.to_string(), partition);
        Ok(self.offsets.get(&key).map(|offset| *offset).unwrap_or(0))
    }

    async fn health_check(&self) -> MessagingResult<()> {
        self.check_available()
    }
}
