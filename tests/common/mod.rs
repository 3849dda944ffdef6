//! Shared harness for the integration tests: an order service and a kitchen service wired
//! to in-memory stores and a shared in-memory event bus.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use order_pipeline::catalog::{CatalogClient, CatalogError, MenuItem, MenuValidator};
use order_pipeline::config::OutboxSettings;
use order_pipeline::constants::{KITCHEN_CONSUMER_GROUP, MENU_SERVICE_BREAKER, ORDER_EVENTS_TOPIC};
use order_pipeline::kitchen::{InMemoryKitchenStore, KitchenService};
use order_pipeline::messaging::{ConsumerSettings, InMemoryEventBus, Subscription};
use order_pipeline::orders::{InMemoryOrderStore, OrderService, OutboxRelay};
use order_pipeline::resilience::{CircuitBreaker, CircuitBreakerConfig};
use order_pipeline::web::{kitchen_router, order_router, KitchenAppState, OrderAppState};

/// Catalog that knows every item
pub struct OpenCatalog;

#[async_trait]
impl CatalogClient for OpenCatalog {
    async fn lookup(&self, item_id: &str) -> Result<Option<MenuItem>, CatalogError> {
        Ok(Some(MenuItem {
            id: item_id.to_string(),
            name: None,
            available: true,
        }))
    }
}

/// Catalog that never answers within the breaker timeout
pub struct HangingCatalog;

#[async_trait]
impl CatalogClient for HangingCatalog {
    async fn lookup(&self, _item_id: &str) -> Result<Option<MenuItem>, CatalogError> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(None)
    }
}

pub fn fast_consumer() -> ConsumerSettings {
    ConsumerSettings {
        poll_interval_ms: 10,
        batch_size: 50,
        retry_backoff_ms: 20,
    }
}

pub struct Pipeline {
    pub bus: Arc<InMemoryEventBus>,
    pub order_store: Arc<InMemoryOrderStore>,
    pub kitchen_store: Arc<InMemoryKitchenStore>,
    pub orders: Arc<OrderService>,
    pub kitchen: Arc<KitchenService>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_catalog(Arc::new(OpenCatalog))
    }

    pub fn with_catalog(catalog: Arc<dyn CatalogClient>) -> Self {
        let bus = Arc::new(InMemoryEventBus::new(3));
        let order_store = Arc::new(InMemoryOrderStore::new());
        let kitchen_store = Arc::new(InMemoryKitchenStore::new());

        let breaker = Arc::new(CircuitBreaker::new(
            MENU_SERVICE_BREAKER,
            CircuitBreakerConfig {
                timeout: Duration::from_millis(50),
                reset_timeout: Duration::from_secs(60),
                ..CircuitBreakerConfig::default()
            },
        ));
        let orders = Arc::new(OrderService::new(
            order_store.clone(),
            bus.clone(),
            MenuValidator::new(catalog, breaker),
            ORDER_EVENTS_TOPIC,
            Duration::from_millis(500),
        ));
        let kitchen = Arc::new(KitchenService::new(kitchen_store.clone()));

        Self {
            bus,
            order_store,
            kitchen_store,
            orders,
            kitchen,
        }
    }

    pub fn order_app(&self) -> Router {
        order_router(OrderAppState::new(self.orders.clone()))
    }

    pub fn kitchen_app(&self) -> Router {
        kitchen_router(KitchenAppState::new(
            self.kitchen.clone(),
            ORDER_EVENTS_TOPIC,
            KITCHEN_CONSUMER_GROUP,
        ))
    }

    pub async fn start_kitchen_consumer(&self) -> Subscription {
        Subscription::start(
            self.bus.clone(),
            ORDER_EVENTS_TOPIC,
            KITCHEN_CONSUMER_GROUP,
            Arc::new(self.kitchen.projector()),
            fast_consumer(),
        )
        .await
        .expect("kitchen subscription should start")
    }

    pub fn relay(&self) -> OutboxRelay {
        OutboxRelay::new(
            self.order_store.clone(),
            self.bus.clone(),
            ORDER_EVENTS_TOPIC,
            OutboxSettings::default(),
            Duration::from_millis(500),
        )
    }

    /// Poll the kitchen store until it holds `expected` records or a second has passed
    pub async fn wait_for_kitchen_orders(&self, expected: usize) -> usize {
        for _ in 0..100 {
            if self.kitchen_store.len() >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.kitchen_store.len()
    }
}

/// The order body used throughout the scenarios
pub fn scenario_order() -> Value {
    json!({
        "userId": 1,
        "restaurantId": "r1",
        "items": [{"id": "i1", "price": 10, "qty": 1}],
        "totalAmount": 10,
        "deliveryAddress": "X"
    })
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body should be JSON")
    };
    (status, value)
}
