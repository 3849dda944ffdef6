//! # Health Check Handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::constants::services::{KITCHEN_SERVICE, ORDER_SERVICE};
use crate::web::state::{KitchenAppState, OrderAppState};

/// Order service health: GET /health
///
/// Reports the menu-service breaker state and counters. Unhealthy (503) only when the
/// order store is unreachable; an open breaker degrades validation, not placement.
pub async fn order_health(State(state): State<OrderAppState>) -> (StatusCode, Json<Value>) {
    debug!("Performing order service health check");

    if let Err(e) = state.orders.store().health_check().await {
        error!(error = %e, "Order store health check failed");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "service": ORDER_SERVICE,
                "error": e.to_string(),
            })),
        );
    }

    let breaker = state.orders.menu_breaker();
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": ORDER_SERVICE,
            "circuitBreaker": {
                "menuService": {
                    "state": breaker.state(),
                    "healthy": breaker.is_healthy(),
                    "stats": breaker.metrics(),
                }
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

/// Kitchen service health: GET /health
pub async fn kitchen_health(State(state): State<KitchenAppState>) -> (StatusCode, Json<Value>) {
    match state.kitchen.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "service": KITCHEN_SERVICE,
                "consumer": {
                    "group": state.consumer_group,
                    "topic": state.topic,
                },
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })),
        ),
        Err(e) => {
            error!(error = %e, "Kitchen store health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": KITCHEN_SERVICE,
                    "error": e.to_string(),
                })),
            )
        }
    }
}
