//! # Order Handlers
//!
//! `POST /orders`, `GET /orders/{id}`, `GET /orders/user/{userId}` and
//! `PATCH /orders/{id}/status`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::parse_id;
use crate::models::{Order, PlaceOrderRequest};
use crate::state_machine::OrderStatus;
use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::OrderAppState;

/// Response for successful order placement
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreationResponse {
    pub id: i64,
    pub status: OrderStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub event_published: bool,
}

/// Body of the status update endpoints
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: Option<String>,
}

impl StatusUpdateRequest {
    pub(crate) fn required_status(&self) -> ApiResult<&str> {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|status| !status.is_empty())
            .ok_or_else(|| ApiError::bad_request("status is required"))
    }
}

/// Place an order: POST /orders
pub async fn create_order(
    State(state): State<OrderAppState>,
    payload: Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<OrderCreationResponse>)> {
    let Json(request) = payload?;
    debug!(user_id = ?request.user_id, "Placing order");

    let placed = state.orders.place_order(request).await?;
    info!(
        order_id = placed.order.id,
        event_published = placed.event_published,
        "✅ Order placed"
    );

    Ok((
        StatusCode::CREATED,
        Json(OrderCreationResponse {
            id: placed.order.id,
            status: placed.order.status,
            total_amount: placed.order.total_amount,
            created_at: placed.order.created_at,
            event_published: placed.event_published,
        }),
    ))
}

/// Fetch one order: GET /orders/{id}
pub async fn get_order(
    State(state): State<OrderAppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Order>> {
    let id = parse_id(&id, "id")?;
    Ok(Json(state.orders.get_order(id).await?))
}

/// Orders of a user, newest first: GET /orders/user/{userId}
pub async fn list_user_orders(
    State(state): State<OrderAppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Order>>> {
    let user_id = parse_id(&user_id, "userId")?;
    Ok(Json(state.orders.list_orders_for_user(user_id).await?))
}

/// Advance an order's lifecycle: PATCH /orders/{id}/status
pub async fn update_order_status(
    State(state): State<OrderAppState>,
    Path(id): Path<String>,
    payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> ApiResult<Json<Order>> {
    let id = parse_id(&id, "id")?;
    let Json(body) = payload?;
    let next = body
        .required_status()?
        .parse::<OrderStatus>()
        .map_err(ApiError::bad_request)?;

    Ok(Json(state.orders.update_status(id, next).await?))
}
