use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use super::store::KitchenStore;
use crate::error::{PipelineError, Result};
use crate::models::{KitchenOrder, KitchenOrderFilter, LineItem, NewKitchenOrder};
use crate::state_machine::KitchenStatus;

const KITCHEN_COLUMNS: &str =
    "id, order_id, restaurant_id, restaurant_name, items, status, received_at, updated_at";

#[derive(Debug, FromRow)]
struct KitchenOrderRow {
    id: i64,
    order_id: i64,
    restaurant_id: String,
    restaurant_name: String,
    items: Json<Vec<LineItem>>,
    status: String,
    received_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<KitchenOrderRow> for KitchenOrder {
    type Error = PipelineError;

    fn try_from(row: KitchenOrderRow) -> Result<Self> {
        Ok(KitchenOrder {
            id: row.id,
            order_id: row.order_id,
            restaurant_id: row.restaurant_id,
            restaurant_name: row.restaurant_name,
            items: row.items.0,
            status: row.status.parse().map_err(PipelineError::store)?,
            received_at: row.received_at,
            updated_at: row.updated_at,
        })
    }
}

/// Kitchen projection stored in `kitchen_orders`
#[derive(Debug, Clone)]
pub struct PgKitchenStore {
    pool: PgPool,
}

impl PgKitchenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KitchenStore for PgKitchenStore {
    async fn insert_if_absent(&self, order: NewKitchenOrder) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO kitchen_orders (order_id, restaurant_id, restaurant_name, items, status)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (order_id) DO NOTHING
            "#,
        )
        .bind(order.order_id)
        .bind(&order.restaurant_id)
        .bind(&order.restaurant_name)
        .bind(Json(&order.items))
        .bind(KitchenStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list(&self, filter: &KitchenOrderFilter) -> Result<Vec<KitchenOrder>> {
        let rows = sqlx::query_as::<_, KitchenOrderRow>(&format!(
            r#"
            SELECT {KITCHEN_COLUMNS} FROM kitchen_orders
            WHERE ($1::VARCHAR IS NULL OR status = $1)
              AND ($2::VARCHAR IS NULL OR restaurant_id = $2)
            ORDER BY received_at ASC, id ASC
            "#
        ))
        .bind(filter.status.map(|status| status.as_str()))
        .bind(filter.restaurant_id.as_deref())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(KitchenOrder::try_from).collect()
    }

    async fn find_by_order_id(&self, order_id: i64) -> Result<Option<KitchenOrder>> {
        let row = sqlx::query_as::<_, KitchenOrderRow>(&format!(
            "SELECT {KITCHEN_COLUMNS} FROM kitchen_orders WHERE order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(KitchenOrder::try_from).transpose()
    }

    async fn transition_status(
        &self,
        order_id: i64,
        expected: KitchenStatus,
        next: KitchenStatus,
    ) -> Result<Option<KitchenOrder>> {
        let row = sqlx::query_as::<_, KitchenOrderRow>(&format!(
            r#"
            UPDATE kitchen_orders
            SET status = $3, updated_at = NOW()
            WHERE order_id = $1 AND status = $2
            RETURNING {KITCHEN_COLUMNS}
            "#
        ))
        .bind(order_id)
        .bind(expected.as_str())
        .bind(next.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(KitchenOrder::try_from).transpose()
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
