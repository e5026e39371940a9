//! HTTP-level tests for the loyalty and checkout endpoints.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use farmstand_api::{router, AppState};
use farmstand_core::config::AppConfig;
use farmstand_core::loyalty::{PromoCodeDefinition, PromoDiscount};
use farmstand_loyalty::LoyaltyEngine;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn test_app() -> Router {
    let config = AppConfig {
        promo_codes: vec![PromoCodeDefinition {
            code: "FREESHIP".to_string(),
            discount: Some(PromoDiscount::Amount { amount_cents: 2_000 }),
            free_shipping: true,
            min_subtotal_cents: 0,
            expires_at: None,
        }],
        ..Default::default()
    };
    let engine = Arc::new(LoyaltyEngine::new(&config).unwrap());
    router(AppState::new(engine, "test-node".to_string()))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn order_event(order_id: &str, total: i64) -> Value {
    json!({
        "user_id": "farmer-1",
        "order_id": order_id,
        "order_total_cents": total,
        "status": "completed",
        "payment_status": "paid"
    })
}

#[tokio::test]
async fn test_order_award_is_idempotent_over_http() {
    let app = test_app();

    let (status, body) = send(
        &app,
        "POST",
        "/v1/loyalty/orders/completed",
        Some(order_event("ord-1", 1_600_000)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["disposition"], "awarded");
    assert_eq!(body["points_earned"], 160);
    assert_eq!(body["status"]["tier"], "seedling");

    let (_, body) = send(
        &app,
        "POST",
        "/v1/loyalty/orders/completed",
        Some(order_event("ord-1", 1_600_000)),
    )
    .await;
    assert_eq!(body["duplicate"], true);

    let (status, body) = send(&app, "GET", "/v1/loyalty/status/farmer-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["points"], 160);
    assert_eq!(body["purchase_count"], 1);
    assert_eq!(body["is_eligible"], true);
}

#[tokio::test]
async fn test_pending_order_is_skipped() {
    let app = test_app();
    let mut event = order_event("ord-1", 1_600_000);
    event["status"] = json!("confirmed");
    event["payment_status"] = json!("pending");

    let (status, body) = send(&app, "POST", "/v1/loyalty/orders/completed", Some(event)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["disposition"], "skipped");
}

#[tokio::test]
async fn test_negative_order_total_is_bad_request() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/v1/loyalty/orders/completed",
        Some(order_event("ord-1", -10)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_amount");
}

#[tokio::test]
async fn test_redeem_compose_confirm_flow() {
    let app = test_app();
    send(
        &app,
        "POST",
        "/v1/loyalty/orders/completed",
        Some(order_event("ord-1", 1_000_000)),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/v1/loyalty/redeem",
        Some(json!({"user_id": "farmer-1", "reward_name": "10% Off Order"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient_points");

    let (status, usable) = send(
        &app,
        "POST",
        "/v1/loyalty/redeem",
        Some(json!({"user_id": "farmer-1", "reward_name": "5% Off Order"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let reward_id = usable["id"].as_str().unwrap().to_string();

    let (_, usable_list) = send(&app, "GET", "/v1/loyalty/rewards/farmer-1/usable", None).await;
    assert_eq!(usable_list.as_array().unwrap().len(), 1);

    let compose = json!({
        "user_id": "farmer-1",
        "subtotal_cents": 50_010,
        "promo_code": "freeship",
        "reward_id": reward_id
    });
    let (status, discount) =
        send(&app, "POST", "/v1/checkout/discount", Some(compose.clone())).await;
    assert_eq!(status, StatusCode::OK);
    // 2_000 fixed + round(50_010 * 5 / 100) = 2_000 + 2_501
    assert_eq!(discount["discount_amount_cents"], 4_501);
    assert_eq!(discount["net_total_cents"], 45_509);
    assert_eq!(discount["free_shipping"], true);
    assert_eq!(discount["applied_promo_code"], "FREESHIP");

    let confirm = json!({"user_id": "farmer-1", "used_reward_id": reward_id});
    let (status, _) = send(&app, "POST", "/v1/checkout/confirm", Some(confirm.clone())).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "POST", "/v1/checkout/confirm", Some(confirm)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "reward_already_consumed");

    let (status, _) = send(&app, "POST", "/v1/checkout/discount", Some(compose)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_promo_reports_reason() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/v1/checkout/discount",
        Some(json!({"user_id": "farmer-1", "subtotal_cents": 1000, "promo_code": "BOGUS"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["discount_amount_cents"], 0);
    assert!(body["promo_rejection"].as_str().unwrap().contains("BOGUS"));
}

#[tokio::test]
async fn test_card_preview_then_issue() {
    let app = test_app();

    let (status, card) = send(&app, "GET", "/v1/loyalty/card/farmer-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(card["is_active"], false);
    assert!(card["card_id"].is_null());

    send(
        &app,
        "POST",
        "/v1/loyalty/orders/completed",
        Some(order_event("ord-1", 800_000)),
    )
    .await;

    let (_, first) = send(&app, "GET", "/v1/loyalty/card/farmer-1", None).await;
    let (_, second) = send(&app, "GET", "/v1/loyalty/card/farmer-1", None).await;
    assert_eq!(first["is_active"], true);
    assert_eq!(first["tier"], "sprout");
    assert!(first["card_id"].is_string());
    assert_eq!(first["card_id"], second["card_id"]);
}

#[tokio::test]
async fn test_available_rewards_and_catalog() {
    let app = test_app();
    send(
        &app,
        "POST",
        "/v1/loyalty/orders/completed",
        Some(order_event("ord-1", 600_000)),
    )
    .await;

    let (_, affordable) = send(&app, "GET", "/v1/loyalty/rewards/farmer-1/available", None).await;
    let affordable = affordable.as_array().unwrap();
    assert!(affordable.iter().all(|r| r["affordable"] == true));

    let (_, all) = send(
        &app,
        "GET",
        "/v1/loyalty/rewards/farmer-1/available?all=true",
        None,
    )
    .await;
    let (_, catalog) = send(&app, "GET", "/v1/loyalty/catalog", None).await;
    assert_eq!(
        all.as_array().unwrap().len(),
        catalog["rewards"].as_array().unwrap().len()
    );
    assert!(all.as_array().unwrap().len() > affordable.len());
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["node_id"], "test-node");

    let (status, _) = send(&app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", "/live", None).await;
    assert_eq!(status, StatusCode::OK);
}
