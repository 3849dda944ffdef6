//! # Web API Integration Tests
//!
//! Drives both routers in-process with `tower::ServiceExt::oneshot`.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;

use common::{scenario_order, send, HangingCatalog, Pipeline};

#[tokio::test]
async fn test_place_order_returns_created() {
    let pipeline = Pipeline::new();
    let app = pipeline.order_app();

    let (status, body) = send(&app, "POST", "/orders", Some(scenario_order())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "PLACED");
    assert_eq!(body["totalAmount"], 10.0);
    assert_eq!(body["eventPublished"], true);
    assert!(body["id"].as_i64().is_some());
    assert!(body["createdAt"].is_string());
}

#[tokio::test]
async fn test_get_order_round_trips_through_api() {
    let pipeline = Pipeline::new();
    let app = pipeline.order_app();
    let (_, created) = send(&app, "POST", "/orders", Some(scenario_order())).await;
    let id = created["id"].as_i64().unwrap();

    let (status, order) = send(&app, "GET", &format!("/orders/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "PLACED");
    assert_eq!(order["restaurant_id"], "r1");
    assert_eq!(order["items"][0]["quantity"], 1);

    let (status, missing) = send(&app, "GET", "/orders/4242", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_user_orders_are_newest_first() {
    let pipeline = Pipeline::new();
    let app = pipeline.order_app();
    let (_, first) = send(&app, "POST", "/orders", Some(scenario_order())).await;
    let (_, second) = send(&app, "POST", "/orders", Some(scenario_order())).await;

    let (status, orders) = send(&app, "GET", "/orders/user/1", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = orders
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![second["id"].as_i64().unwrap(), first["id"].as_i64().unwrap()]);

    let (status, none) = send(&app, "GET", "/orders/user/77", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(none, json!([]));
}

#[tokio::test]
async fn test_missing_field_is_bad_request() {
    let pipeline = Pipeline::new();
    let app = pipeline.order_app();
    let mut body = scenario_order();
    body.as_object_mut().unwrap().remove("deliveryAddress");

    let (status, error) = send(&app, "POST", "/orders", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "VALIDATION_ERROR");
    assert!(pipeline.order_store.outbox().is_empty());
}

#[tokio::test]
async fn test_total_mismatch_is_bad_request() {
    let pipeline = Pipeline::new();
    let app = pipeline.order_app();
    let mut body = scenario_order();
    body["totalAmount"] = json!(12.5);

    let (status, error) = send(&app, "POST", "/orders", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_oversized_amounts_are_bad_request() {
    let pipeline = Pipeline::new();
    let app = pipeline.order_app();

    let mut body = scenario_order();
    body["items"] = json!([{"id": "i1", "price": 1e28, "qty": 10}]);
    let (status, error) = send(&app, "POST", "/orders", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "VALIDATION_ERROR");

    let mut body = scenario_order();
    body["items"] = json!([{"id": "i1", "price": 1e12, "qty": 1}]);
    body["totalAmount"] = json!(1e12);
    let (status, _) = send(&app, "POST", "/orders", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The service keeps answering afterwards
    let (status, _) = send(&app, "POST", "/orders", Some(scenario_order())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(pipeline.bus.messages("order-events").len(), 1);
}

#[tokio::test]
async fn test_unknown_order_status_update_is_not_found() {
    let pipeline = Pipeline::new();
    let app = pipeline.order_app();

    let (status, error) = send(
        &app,
        "PATCH",
        "/orders/999/status",
        Some(json!({"status": "ACCEPTED"})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_status_transitions_follow_lifecycle() {
    let pipeline = Pipeline::new();
    let app = pipeline.order_app();
    let (_, created) = send(&app, "POST", "/orders", Some(scenario_order())).await;
    let uri = format!("/orders/{}/status", created["id"]);

    let (status, error) = send(&app, "PATCH", &uri, Some(json!({"status": "DELIVERED"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"]["code"], "CONFLICT");

    let (status, updated) = send(&app, "PATCH", &uri, Some(json!({"status": "ACCEPTED"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "ACCEPTED");

    let (status, _) = send(&app, "PATCH", &uri, Some(json!({"status": "accepted"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "PATCH", &uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_hanging_catalog_opens_breaker_but_order_is_placed() {
    let pipeline = Pipeline::with_catalog(Arc::new(HangingCatalog));
    let app = pipeline.order_app();

    let started = std::time::Instant::now();
    let (status, body) = send(&app, "POST", "/orders", Some(scenario_order())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "PLACED");
    assert!(started.elapsed() < std::time::Duration::from_secs(2));

    let (status, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["service"], "order-service");
    assert_eq!(health["circuitBreaker"]["menuService"]["state"], "OPEN");
    assert_eq!(health["circuitBreaker"]["menuService"]["stats"]["timeouts"], 1);

    // Open circuit answers with the fallback immediately
    let started = std::time::Instant::now();
    let (status, _) = send(&app, "POST", "/orders", Some(scenario_order())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(started.elapsed() < std::time::Duration::from_millis(500));
}

#[tokio::test]
async fn test_order_health_reports_unavailable_store() {
    let pipeline = Pipeline::new();
    let app = pipeline.order_app();

    let (status, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["circuitBreaker"]["menuService"]["state"], "CLOSED");

    pipeline.order_store.set_available(false);
    let (status, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_store_failure_is_internal_error() {
    let pipeline = Pipeline::new();
    let app = pipeline.order_app();
    pipeline.order_store.set_available(false);

    let (status, error) = send(&app, "POST", "/orders", Some(scenario_order())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error["error"]["code"], "DATABASE_ERROR");
}

#[tokio::test]
async fn test_kitchen_queue_listing_and_transitions() {
    let pipeline = Pipeline::new();
    let orders = pipeline.order_app();
    let kitchen = pipeline.kitchen_app();
    let subscription = pipeline.start_kitchen_consumer().await;

    let (_, created) = send(&orders, "POST", "/orders", Some(scenario_order())).await;
    let order_id = created["id"].as_i64().unwrap();
    assert_eq!(pipeline.wait_for_kitchen_orders(1).await, 1);

    let (status, queue) = send(&kitchen, "GET", "/kitchen/orders?status=PENDING", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue.as_array().unwrap().len(), 1);
    assert_eq!(queue[0]["order_id"], order_id);
    assert_eq!(queue[0]["status"], "PENDING");

    let (status, other) = send(&kitchen, "GET", "/kitchen/orders?restaurantId=r2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(other, json!([]));

    let (status, _) = send(&kitchen, "GET", "/kitchen/orders?status=BOGUS", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/kitchen/orders/{order_id}/status");
    let (status, accepted) =
        send(&kitchen, "PATCH", &uri, Some(json!({"status": "ACCEPTED"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "ACCEPTED");

    let (status, _) = send(&kitchen, "PATCH", &uri, Some(json!({"status": "PENDING"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &kitchen,
        "PATCH",
        "/kitchen/orders/999/status",
        Some(json!({"status": "ACCEPTED"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, health) = send(&kitchen, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["service"], "kitchen-service");
    assert_eq!(health["consumer"]["group"], "kitchen-group");
    assert_eq!(health["consumer"]["topic"], "order-events");

    subscription.shutdown().await;
}
