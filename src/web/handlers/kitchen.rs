//! # Kitchen Handlers
//!
//! Queue listing and status transitions for kitchen staff.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use super::orders::StatusUpdateRequest;
use super::parse_id;
use crate::models::{KitchenOrder, KitchenOrderFilter};
use crate::state_machine::KitchenStatus;
use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::KitchenAppState;

/// Raw query of `GET /kitchen/orders`; the status is validated by hand for a JSON error body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KitchenListQuery {
    pub status: Option<String>,
    pub restaurant_id: Option<String>,
}

impl KitchenListQuery {
    fn into_filter(self) -> ApiResult<KitchenOrderFilter> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<KitchenStatus>().map_err(ApiError::bad_request)?),
        };
        Ok(KitchenOrderFilter {
            status,
            restaurant_id: self.restaurant_id.filter(|id| !id.trim().is_empty()),
        })
    }
}

/// Kitchen queue: GET /kitchen/orders?status=&restaurantId=
pub async fn list_kitchen_orders(
    State(state): State<KitchenAppState>,
    query: Result<Query<KitchenListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<KitchenOrder>>> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    Ok(Json(state.kitchen.list_orders(&filter).await?))
}

/// Kitchen status transition: PATCH /kitchen/orders/{orderId}/status
pub async fn update_kitchen_status(
    State(state): State<KitchenAppState>,
    Path(order_id): Path<String>,
    payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> ApiResult<Json<KitchenOrder>> {
    let order_id = parse_id(&order_id, "orderId")?;
    let Json(body) = payload?;
    let next = body
        .required_status()?
        .parse::<KitchenStatus>()
        .map_err(ApiError::bad_request)?;

    Ok(Json(state.kitchen.update_status(order_id, next).await?))
}
