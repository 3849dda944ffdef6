//! # Event Bus Contract
//!
//! A durable, partitioned, append-only log read by independent consumer groups. Producers
//! append with a partition key; every message with the same key lands in the same partition
//! and keeps publish order. Consumer groups track one committed offset per partition and
//! only advance it after their handler succeeded, which gives at-least-once delivery.

use async_trait::async_trait;
use thiserror::Error;

use super::errors::MessagingResult;
use super::message::{BusMessage, PublishReceipt};

#[async_trait]
pub trait EventBus: Send + Sync {
    /// Create the topic if missing and return its partition count
    async fn ensure_topic(&self, topic: &str) -> MessagingResult<u32>;

    /// Append a message; returns once the append is durable
    async fn publish(
        &self,
        topic: &str,
        partition_key: &str,
        payload: &serde_json::Value,
    ) -> MessagingResult<PublishReceipt>;

    async fn partition_count(&self, topic: &str) -> MessagingResult<u32>;

    /// Read up to `max_messages` starting at the group's committed offset
    async fn fetch(
        &self,
        topic: &str,
        consumer_group: &str,
        partition: u32,
        max_messages: usize,
    ) -> MessagingResult<Vec<BusMessage>>;

    /// Record that every offset below `next_offset` has been processed by the group
    async fn commit(
        &self,
        topic: &str,
        consumer_group: &str,
        partition: u32,
        next_offset: i64,
    ) -> MessagingResult<()>;

    async fn committed_offset(
        &self,
        topic: &str,
        consumer_group: &str,
        partition: u32,
    ) -> MessagingResult<i64>;

    async fn health_check(&self) -> MessagingResult<()>;
}

/// Handler failure classification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Retry by redelivery (store or network hiccup)
    #[error("transient handler failure: {0}")]
    Transient(String),

    /// Retrying can never succeed (malformed payload); route to the dead-letter topic
    #[error("permanent handler failure: {0}")]
    Permanent(String),
}

impl HandlerError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent(message.into())
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }
}

/// Per-message processing callback for a consumer group
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, message: &BusMessage) -> Result<(), HandlerError>;

    fn name(&self) -> &str;
}
