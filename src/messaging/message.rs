use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message as stored in a topic partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub topic: String,
    pub partition: u32,
    pub offset: i64,
    pub key: String,
    pub payload: serde_json::Value,
    pub published_at: DateTime<Utc>,
}

impl BusMessage {
    /// `eventType` field of the payload, if present
    pub fn event_type(&self) -> Option<&str> {
        self.payload.get("eventType").and_then(|value| value.as_str())
    }
}

/// Acknowledgement returned once an append is durable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub partition: u32,
    pub offset: i64,
}

/// Envelope appended to a dead-letter topic for a message a handler rejected permanently
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    pub original_topic: String,
    pub partition: u32,
    pub offset: i64,
    pub key: String,
    pub consumer_group: String,
    pub error: String,
    pub failed_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl DeadLetter {
    pub fn new(message: &BusMessage, consumer_group: &str, error: impl Into<String>) -> Self {
        Self {
            original_topic: message.topic.clone(),
            partition: message.partition,
            offset: message.offset,
            key: message.key.clone(),
            consumer_group: consumer_group.to_string(),
            error: error.into(),
            failed_at: Utc::now(),
            payload: message.payload.clone(),
        }
    }
}

/// FNV-1a over the key bytes; stable across processes so every producer agrees
pub fn partition_for(key: &str, partitions: u32) -> u32 {
    const FNV_OFFSET: u32 = 0x811c_9dc5;
    const FNV_PRIME: u32 = 0x0100_0193;

    let hash = key.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    });
    hash % partitions.max(1)
}
