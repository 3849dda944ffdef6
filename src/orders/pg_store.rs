//! PostgreSQL implementation of [`OrderStore`] over the `orders` and `orders_outbox` tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use super::store::OrderStore;
use crate::error::{PipelineError, Result};
use crate::models::{LineItem, NewOrder, NewOutboxEntry, Order, OrderEvent, OutboxEntry};
use crate::state_machine::OrderStatus;

const ORDER_COLUMNS: &str = "id, user_id, restaurant_id, restaurant_name, items, total_amount, \
                             delivery_address, status, created_at, updated_at";

const OUTBOX_COLUMNS: &str = "id, order_id, event_type, partition_key, payload, created_at, \
                              published_at, attempts, last_error";

#[derive(Debug, FromRow)]
struct OrderRow {
    id: i64,
    user_id: i64,
    restaurant_id: String,
    restaurant_name: String,
    items: Json<Vec<LineItem>>,
    total_amount: Decimal,
    delivery_address: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = PipelineError;

    fn try_from(row: OrderRow) -> Result<Self> {
        let status = row
            .status
            .parse::<OrderStatus>()
            .map_err(PipelineError::store)?;
        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            restaurant_id: row.restaurant_id,
            restaurant_name: row.restaurant_name,
            items: row.items.0,
            total_amount: row.total_amount,
            delivery_address: row.delivery_address,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct OutboxRow {
    id: i64,
    order_id: i64,
    event_type: String,
    partition_key: String,
    payload: serde_json::Value,
    created_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
    attempts: i32,
    last_error: Option<String>,
}

impl TryFrom<OutboxRow> for OutboxEntry {
    type Error = PipelineError;

    fn try_from(row: OutboxRow) -> Result<Self> {
        Ok(OutboxEntry {
            id: row.id,
            order_id: row.order_id,
            event_type: row.event_type.parse().map_err(PipelineError::store)?,
            partition_key: row.partition_key,
            payload: row.payload,
            created_at: row.created_at,
            published_at: row.published_at,
            attempts: row.attempts,
            last_error: row.last_error,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert_outbox(
        tx: &mut Transaction<'_, Postgres>,
        event: &OrderEvent,
    ) -> Result<OutboxEntry> {
        let entry = NewOutboxEntry::from_event(event)?;

        let row = sqlx::query_as::<_, OutboxRow>(&format!(
            r#"
            INSERT INTO orders_outbox (order_id, event_type, partition_key, payload)
            VALUES ($1, $2, $3, $4)
            RETURNING {OUTBOX_COLUMNS}
            "#
        ))
        .bind(entry.order_id)
        .bind(entry.event_type.as_str())
        .bind(&entry.partition_key)
        .bind(&entry.payload)
        .fetch_one(&mut **tx)
        .await?;

        row.try_into()
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create_order(&self, order: NewOrder) -> Result<(Order, OutboxEntry)> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO orders
                (user_id, restaurant_id, restaurant_name, items, total_amount, delivery_address, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order.user_id)
        .bind(&order.restaurant_id)
        .bind(&order.restaurant_name)
        .bind(Json(&order.items))
        .bind(order.total_amount)
        .bind(&order.delivery_address)
        .bind(OrderStatus::Placed.as_str())
        .fetch_one(&mut *tx)
        .await?;
        let created = Order::try_from(row)?;

        let entry = Self::insert_outbox(&mut tx, &OrderEvent::placed(&created)).await?;
        tx.commit().await?;

        Ok((created, entry))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn transition_status(
        &self,
        id: i64,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Option<(Order, OutboxEntry)>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            UPDATE orders
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(expected.as_str())
        .bind(next.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        let updated = Order::try_from(row)?;

        let entry =
            Self::insert_outbox(&mut tx, &OrderEvent::status_changed(&updated, expected)).await?;
        tx.commit().await?;

        Ok(Some((updated, entry)))
    }

    async fn pending_outbox(&self, limit: i64) -> Result<Vec<OutboxEntry>> {
        let rows = sqlx::query_as::<_, OutboxRow>(&format!(
            r#"
            SELECT {OUTBOX_COLUMNS} FROM orders_outbox
            WHERE published_at IS NULL
            ORDER BY id
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OutboxEntry::try_from).collect()
    }

    async fn pending_outbox_for_order(&self, order_id: i64) -> Result<Vec<OutboxEntry>> {
        let rows = sqlx::query_as::<_, OutboxRow>(&format!(
            r#"
            SELECT {OUTBOX_COLUMNS} FROM orders_outbox
            WHERE order_id = $1 AND published_at IS NULL
            ORDER BY id
            "#
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OutboxEntry::try_from).collect()
    }

    async fn mark_published(&self, outbox_id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE orders_outbox SET published_at = NOW() WHERE id = $1 AND published_at IS NULL",
        )
        .bind(outbox_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_publish_failure(&self, outbox_id: i64, error: &str) -> Result<()> {
        sqlx::query(
            "UPDATE orders_outbox SET attempts = attempts + 1, last_error = $2 WHERE id = $1",
        )
        .bind(outbox_id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
