//! # Web API
//!
//! axum routers for the order service and the kitchen service.

pub mod errors;
pub mod handlers;
pub mod state;

use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use errors::{ApiError, ApiResult};
pub use state::{KitchenAppState, OrderAppState};

/// Routes of the order ingestion service
pub fn order_router(state: OrderAppState) -> Router {
    Router::new()
        .route("/orders", post(handlers::orders::create_order))
        .route("/orders/{id}", get(handlers::orders::get_order))
        .route(
            "/orders/user/{user_id}",
            get(handlers::orders::list_user_orders),
        )
        .route(
            "/orders/{id}/status",
            patch(handlers::orders::update_order_status),
        )
        .route("/health", get(handlers::health::order_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Routes of the kitchen service
pub fn kitchen_router(state: KitchenAppState) -> Router {
    Router::new()
        .route(
            "/kitchen/orders",
            get(handlers::kitchen::list_kitchen_orders),
        )
        .route(
            "/kitchen/orders/{order_id}/status",
            patch(handlers::kitchen::update_kitchen_status),
        )
        .route("/health", get(handlers::health::kitchen_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
