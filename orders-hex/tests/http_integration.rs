//! Integration tests for the HTTP adapter.
//!
//! These tests drive the full router (identity, rate limiting, handlers,
//! services) against an in-memory SQLite store.
//!
//! This test requires the `sqlite` feature flag.

#![cfg(feature = "sqlite")]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use orders_hex::{
    JsapiPayGateway, OrderService, SnowflakeGenerator, VoucherService,
    inbound::{AppState, HttpServer},
};
use orders_repo::SqliteRepo;
use orders_repo::security::sign_payload;
use orders_types::{ListingId, UserId};
use serde_json::{Value, json};
use tower::ServiceExt;

const NOTIFY_SECRET: &str = "notify-secret";

struct TestApp {
    app: Router,
    alice: UserId,
    bob: UserId,
    alice_listing: ListingId,
}

/// Helper to create a test app with two users and one listing.
async fn create_test_app(requests_per_minute: u32) -> TestApp {
    let repo = Arc::new(SqliteRepo::new("sqlite::memory:").await.unwrap());
    let alice = repo.insert_user("alice", 0).await.unwrap().id;
    let bob = repo.insert_user("bob", 1).await.unwrap().id;
    let alice_listing = repo.insert_listing(alice, "Line cook").await.unwrap().id;

    let state = AppState {
        orders: OrderService::new(repo.clone(), Arc::new(SnowflakeGenerator::new(1).unwrap())),
        vouchers: VoucherService::new(repo),
        gateway: Arc::new(JsapiPayGateway::new("wx_app", "merchant_key")),
        notify_secret: NOTIFY_SECRET.to_string(),
    };
    let server = HttpServer::with_rate_limit(state, requests_per_minute);

    TestApp {
        app: server.router(),
        alice,
        bob,
        alice_listing,
    }
}

fn get(uri: &str, user: Option<UserId>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(user) = user {
        builder = builder.header("X-User-Id", user.to_string());
    }
    builder.body(Body::empty()).unwrap()
}

fn post(uri: &str, user: UserId, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/json")
        .header("X-User-Id", user.to_string())
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn notify(body: &str, signature: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/pay/notify")
        .header("Content-Type", "application/json")
        .header("X-Pay-Signature", signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_is_public() {
    let t = create_test_app(100).await;

    let (status, body) = send(&t.app, get("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let t = create_test_app(100).await;

    let (status, body) = send(&t.app, get("/api-docs/openapi.json", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/pay"].is_object());
}

#[tokio::test]
async fn test_missing_user_header_is_rejected() {
    let t = create_test_app(100).await;

    let (status, body) = send(&t.app, get("/api/vouchers", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);
}

#[tokio::test]
async fn test_voucher_order_pay_and_summary() {
    let t = create_test_app(100).await;

    let (status, created) = send(
        &t.app,
        post(
            "/api/orders/contact-voucher",
            t.alice,
            json!({"price": 9.9, "contact_voucher_num": 10}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let order_no = created["order_no"].as_str().unwrap().to_string();
    assert_eq!(created["amount"], "9.90");
    assert_eq!(created["pay_params"]["signType"], "HMAC-SHA256");
    assert_eq!(created["pay_params"]["package"], format!("prepay_id={}", order_no));

    let (status, paid) = send(
        &t.app,
        post(
            "/api/pay",
            t.alice,
            json!({"order_no": order_no, "price": 9.9, "pay_trade_no": "T-1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "PAID");
    assert_eq!(paid["amount_paid"], "9.90");

    let (status, summary) = send(&t.app, get("/api/vouchers?page=1&page_size=10", Some(t.alice))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["contact_voucher_num"], 10);
    assert_eq!(summary["total"], 1);
    assert_eq!(summary["entries"][0]["change_num"], 10);
    assert_eq!(summary["entries"][0]["last_num"], 0);
    assert_eq!(summary["entries"][0]["next_num"], 10);
}

#[tokio::test]
async fn test_top_order_on_foreign_listing_is_forbidden() {
    let t = create_test_app(100).await;

    let (status, body) = send(
        &t.app,
        post(
            "/api/orders/top",
            t.bob,
            json!({"listing_id": t.alice_listing, "top_hours": 72, "price": 5.0}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 403);
}

#[tokio::test]
async fn test_amount_mismatch_is_bad_request() {
    let t = create_test_app(100).await;
    let (_, created) = send(
        &t.app,
        post(
            "/api/orders/top",
            t.alice,
            json!({"listing_id": t.alice_listing, "top_hours": 72, "price": 5.0}),
        ),
    )
    .await;
    let order_id = created["order_id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &t.app,
        post("/api/pay", t.alice, json!({"order_id": order_id, "price": 4.99})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    let (status, detail) = send(&t.app, get(&format!("/api/orders/{}", order_id), Some(t.alice))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["order"]["status"], "PENDING");
    assert_eq!(detail["items"][0]["top_hour"], 72);
}

#[tokio::test]
async fn test_order_detail_is_owner_only() {
    let t = create_test_app(100).await;
    let (_, created) = send(
        &t.app,
        post(
            "/api/orders/refresh",
            t.alice,
            json!({"listing_id": t.alice_listing, "price": 1.0}),
        ),
    )
    .await;
    let order_no = created["order_no"].as_str().unwrap().to_string();

    let (status, _) = send(&t.app, get(&format!("/api/orders/{}", order_no), Some(t.alice))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&t.app, get(&format!("/api/orders/{}", order_no), Some(t.bob))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&t.app, get("/api/orders/NOPE", Some(t.alice))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_notify_requires_valid_signature() {
    let t = create_test_app(100).await;
    let (_, created) = send(
        &t.app,
        post(
            "/api/orders/contact-voucher",
            t.alice,
            json!({"price": 9.9, "contact_voucher_num": 3}),
        ),
    )
    .await;
    let order_no = created["order_no"].as_str().unwrap().to_string();
    let body = json!({"order_no": order_no, "amount": 9.9, "trade_no": "N-1"}).to_string();

    let (status, _) = send(&t.app, notify(&body, "deadbeef")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let signature = sign_payload(body.as_bytes(), NOTIFY_SECRET);
    let (status, paid) = send(&t.app, notify(&body, &signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "PAID");
    assert_eq!(paid["pay_trade_no"], "N-1");

    // A replayed notify is a no-op.
    let (status, _) = send(&t.app, notify(&body, &signature)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, summary) = send(&t.app, get("/api/vouchers", Some(t.alice))).await;
    assert_eq!(summary["contact_voucher_num"], 3);
    assert_eq!(summary["total"], 1);
}

#[tokio::test]
async fn test_voucher_cost_and_reveals() {
    let t = create_test_app(100).await;

    let (status, body) = send(
        &t.app,
        post("/api/vouchers/cost", t.alice, json!({"purpose_id": 5, "purpose_type": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    let (status, body) = send(
        &t.app,
        post(
            "/api/vouchers/cost",
            t.bob,
            json!({"purpose_id": 5, "purpose_type": 1, "purpose_user_id": t.alice}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contact_voucher_num"], 0);

    let (status, reveals) = send(&t.app, get("/api/vouchers/reveals", Some(t.bob))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reveals.as_array().unwrap().len(), 1);
    assert_eq!(reveals[0]["purpose_id"], 5);

    let (_, reveals) = send(&t.app, get("/api/vouchers/reveals", Some(t.alice))).await;
    assert!(reveals.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_rate_limiting_returns_429_when_exceeded() {
    let t = create_test_app(3).await;

    for i in 1..=3 {
        let (status, _) = send(&t.app, get("/api/vouchers", Some(t.alice))).await;
        assert_ne!(
            status,
            StatusCode::TOO_MANY_REQUESTS,
            "Request {} should not be rate limited",
            i
        );
    }

    let (status, body) = send(&t.app, get("/api/vouchers", Some(t.alice))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], 429);

    // Quotas are per user.
    let (status, _) = send(&t.app, get("/api/vouchers", Some(t.bob))).await;
    assert_eq!(status, StatusCode::OK);

    // Health is never limited.
    let (status, _) = send(&t.app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
}
