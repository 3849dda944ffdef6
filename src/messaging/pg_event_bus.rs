//! # PostgreSQL Event Log
//!
//! Durable [`EventBus`] backed by four tables (see `migrations/0003_event_bus.sql`):
//! `event_topics`, `event_partitions` (per-partition offset sequence), `event_log` and
//! `consumer_offsets`. Offsets are assigned by a row-locking `UPDATE ... RETURNING` on the
//! partition row, so concurrent producers serialize per partition and never collide.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};

use super::errors::{MessagingError, MessagingResult};
use super::event_bus::EventBus;
use super::message::{partition_for, BusMessage, PublishReceipt};

#[derive(Debug, FromRow)]
struct EventLogRow {
    topic: String,
    partition_no: i32,
    log_offset: i64,
    partition_key: String,
    payload: serde_json::Value,
    published_at: DateTime<Utc>,
}

impl From<EventLogRow> for BusMessage {
    fn from(row: EventLogRow) -> Self {
        BusMessage {
            topic: row.topic,
            partition: row.partition_no as u32,
            offset: row.log_offset,
            key: row.partition_key,
            payload: row.payload,
            published_at: row.published_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgEventBus {
    pool: PgPool,
    default_partitions: u32,
    partition_counts: DashMap<String, u32>,
}

impl PgEventBus {
    pub fn new(pool: PgPool, default_partitions: u32) -> Self {
        info!(default_partitions, "🚀 PostgreSQL event log client created with shared pool");
        Self {
            pool,
            default_partitions: default_partitions.max(1),
            partition_counts: DashMap::new(),
        }
    }

    /// Get reference to underlying connection pool for advanced operations
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl EventBus for PgEventBus {
    async fn ensure_topic(&self, topic: &str) -> MessagingResult<u32> {
        if let Some(count) = self.partition_counts.get(topic) {
            return Ok(*count);
        }
        if topic.trim().is_empty() {
            return Err(MessagingError::invalid_topic_name(topic, "topic name is empty"));
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO event_topics (topic, partitions)
            VALUES ($1, $2)
            ON CONFLICT (topic) DO NOTHING
            "#,
        )
        .bind(topic)
        .bind(self.default_partitions as i32)
        .execute(&mut *tx)
        .await?;

        let partitions: i32 =
            sqlx::query_scalar("SELECT partitions FROM event_topics WHERE topic = $1")
                .bind(topic)
                .fetch_one(&mut *tx)
                .await?;

        sqlx::query(
            r#"
            INSERT INTO event_partitions (topic, partition_no, next_offset)
            SELECT $1, p, 0 FROM generate_series(0, $2 - 1) AS p
            ON CONFLICT (topic, partition_no) DO NOTHING
            "#,
        )
        .bind(topic)
        .bind(partitions)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let count = partitions as u32;
        self.partition_counts.insert(topic.to_string(), count);
        debug!(topic, partitions = count, "📋 Topic ready");
        Ok(count)
    }

    async fn publish(
        &self,
        topic: &str,
        partition_key: &str,
        payload: &serde_json::Value,
    ) -> MessagingResult<PublishReceipt> {
        let partitions = self.ensure_topic(topic).await?;
        let partition = partition_for(partition_key, partitions);

        let mut tx = self.pool.begin().await?;

        let offset: i64 = sqlx::query_scalar(
            r#"
            UPDATE event_partitions
            SET next_offset = next_offset + 1
            WHERE topic = $1 AND partition_no = $2
            RETURNING next_offset - 1
            "#,
        )
        .bind(topic)
        .bind(partition as i32)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| MessagingError::topic_operation(topic, "publish", e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO event_log (topic, partition_no, log_offset, partition_key, payload)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(topic)
        .bind(partition as i32)
        .bind(offset)
        .bind(partition_key)
        .bind(payload)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

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
        let rows = sqlx::query_as::<_, EventLogRow>(
            r#"
            SELECT topic, partition_no, log_offset, partition_key, payload, published_at
            FROM event_log
            WHERE topic = $1
              AND partition_no = $2
              AND log_offset >= COALESCE(
                  (SELECT next_offset FROM consumer_offsets
                   WHERE consumer_group = $3 AND topic = $1 AND partition_no = $2),
                  0)
            ORDER BY log_offset
            LIMIT $4
            "#,
        )
        .bind(topic)
        .bind(partition as i32)
        .bind(consumer_group)
        .bind(max_messages as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(BusMessage::from).collect())
    }

    async fn commit(
        &self,
        topic: &str,
        consumer_group: &str,
        partition: u32,
        next_offset: i64,
    ) -> MessagingResult<()> {
        sqlx::query(
            r#"
            INSERT INTO consumer_offsets (consumer_group, topic, partition_no, next_offset)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (consumer_group, topic, partition_no)
            DO UPDATE SET next_offset = GREATEST(consumer_offsets.next_offset, EXCLUDED.next_offset),
                          updated_at = NOW()
            "#,
        )
        .bind(consumer_group)
        .bind(topic)
        .bind(partition as i32)
        .bind(next_offset)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn committed_offset(
        &self,
        topic: &str,
        consumer_group: &str,
        partition: u32,
    ) -> MessagingResult<i64> {
        let offset: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT next_offset FROM consumer_offsets
            WHERE consumer_group = $1 AND topic = $2 AND partition_no = $3
            "#,
        )
        .bind(consumer_group)
        .bind(topic)
        .bind(partition as i32)
        .fetch_optional(&self.pool)
        .await?;

        Ok(offset.unwrap_or(0))
    }

    async fn health_check(&self) -> MessagingResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseMigrations;

    async fn test_bus() -> Option<PgEventBus> {
        // This test requires a PostgreSQL database; skip when none is configured
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            println!("Skipping event log test - no DATABASE_URL provided");
            return None;
        };
        let pool = PgPool::connect(&database_url)
            .await
            .expect("Failed to connect to test database");
        DatabaseMigrations::run_all(&pool)
            .await
            .expect("Failed to run migrations");
        Some(PgEventBus::new(pool, 2))
    }

    #[tokio::test]
    async fn test_publish_fetch_commit_round() {
        let Some(bus) = test_bus().await else { return };
        let topic = format!("test-topic-{}", uuid::Uuid::new_v4());
        let group = "test-group";

        let first = bus
            .publish(&topic, "7", &serde_json::json!({"seq": 1}))
            .await
            .unwrap();
        let second = bus
            .publish(&topic, "7", &serde_json::json!({"seq": 2}))
            .await
            .unwrap();
        assert_eq!(first.partition, second.partition);
        assert_eq!(second.offset, first.offset + 1);

        let messages = bus.fetch(&topic, group, first.partition, 10).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].payload["seq"], 1);

        bus.commit(&topic, group, first.partition, first.offset + 1)
            .await
            .unwrap();
        let remaining = bus.fetch(&topic, group, first.partition, 10).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].payload["seq"], 2);
    }
}
