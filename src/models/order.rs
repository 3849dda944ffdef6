use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::UNKNOWN_RESTAURANT_NAME;
use crate::error::{PipelineError, Result};
use crate::state_machine::OrderStatus;

/// Exclusive upper bound of any amount, matching the `NUMERIC(12, 2)` columns
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

const MAX_RESTAURANT_ID_LEN: usize = 128;
const MAX_RESTAURANT_NAME_LEN: usize = 255;

/// One catalog item within an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(alias = "qty")]
    pub quantity: i32,
}

impl LineItem {
    /// `price * quantity`, `None` on overflow
    pub fn subtotal(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Order row owned by the ingestion service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub restaurant_id: String,
    pub restaurant_name: String,
    pub items: Vec<LineItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub delivery_address: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a new order; the store assigns id, status and timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: i64,
    pub restaurant_id: String,
    pub restaurant_name: String,
    pub items: Vec<LineItem>,
    pub total_amount: Decimal,
    pub delivery_address: String,
}

impl NewOrder {
    /// Sum of the line subtotals, `None` on overflow
    pub fn items_total(&self) -> Option<Decimal> {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.subtotal()?))
    }
}

/// Line item as received from clients, before validation
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    pub id: Option<String>,
    pub name: Option<String>,
    pub price: Option<Decimal>,
    #[serde(alias = "qty")]
    pub quantity: Option<i32>,
}

/// Body of `POST /orders`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub user_id: Option<i64>,
    pub restaurant_id: Option<String>,
    pub restaurant_name: Option<String>,
    pub items: Option<Vec<LineItemRequest>>,
    pub total_amount: Option<Decimal>,
    pub delivery_address: Option<String>,
}

fn required_text(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(PipelineError::validation(format!("missing required field: {field}"))),
    }
}

impl LineItemRequest {
    fn validate(self, index: usize) -> Result<LineItem> {
        let id = required_text(self.id, &format!("items[{index}].id"))?;
        let price = self.price.ok_or_else(|| {
            PipelineError::validation(format!("missing required field: items[{index}].price"))
        })?;
        let quantity = self.quantity.ok_or_else(|| {
            PipelineError::validation(format!("missing required field: items[{index}].quantity"))
        })?;

        if price.is_sign_negative() {
            return Err(PipelineError::validation(format!(
                "items[{index}].price must not be negative"
            )));
        }
        if quantity <= 0 {
            return Err(PipelineError::validation(format!(
                "items[{index}].quantity must be positive"
            )));
        }

        let item = LineItem {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            price,
            quantity,
        };
        match item.subtotal() {
            Some(subtotal) if subtotal < MAX_AMOUNT => Ok(item),
            _ => Err(PipelineError::validation(format!(
                "items[{index}] subtotal must be below {MAX_AMOUNT}"
            ))),
        }
    }
}

impl PlaceOrderRequest {
    /// Check required fields and the total-equals-subtotals invariant
    pub fn validate(self) -> Result<NewOrder> {
        let user_id = self
            .user_id
            .ok_or_else(|| PipelineError::validation("missing required field: userId"))?;
        let restaurant_id = required_text(self.restaurant_id, "restaurantId")?;
        if restaurant_id.chars().count() > MAX_RESTAURANT_ID_LEN {
            return Err(PipelineError::validation(format!(
                "restaurantId must be at most {MAX_RESTAURANT_ID_LEN} characters"
            )));
        }
        let delivery_address = required_text(self.delivery_address, "deliveryAddress")?;
        let total_amount = self
            .total_amount
            .ok_or_else(|| PipelineError::validation("missing required field: totalAmount"))?;

        let raw_items = self.items.unwrap_or_default();
        if raw_items.is_empty() {
            return Err(PipelineError::validation("missing required field: items"));
        }
        let items = raw_items
            .into_iter()
            .enumerate()
            .map(|(index, item)| item.validate(index))
            .collect::<Result<Vec<_>>>()?;

        let restaurant_name = self
            .restaurant_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_RESTAURANT_NAME.to_string());
        if restaurant_name.chars().count() > MAX_RESTAURANT_NAME_LEN {
            return Err(PipelineError::validation(format!(
                "restaurantName must be at most {MAX_RESTAURANT_NAME_LEN} characters"
            )));
        }

        let order = NewOrder {
            user_id,
            restaurant_id,
            restaurant_name,
            items,
            total_amount,
            delivery_address,
        };

        if total_amount.is_sign_negative() || total_amount >= MAX_AMOUNT {
            return Err(PipelineError::validation(format!(
                "totalAmount must be within [0, {MAX_AMOUNT})"
            )));
        }
        let expected = order
            .items_total()
            .filter(|sum| *sum < MAX_AMOUNT)
            .ok_or_else(|| {
                PipelineError::validation(format!("item subtotals must sum below {MAX_AMOUNT}"))
            })?
            .round_dp(2);
        if expected != total_amount.round_dp(2) {
            return Err(PipelineError::validation(format!(
                "totalAmount {total_amount} does not match item subtotals {expected}"
            )));
        }

        Ok(order)
    }
}
