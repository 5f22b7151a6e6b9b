//! Integration tests for the identity provider webhook receiver.
//!
//! Only deliveries that are rejected or ignored are exercised here; user
//! upserts need a database and live in `api_catalog`.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use serde_json::json;

use showcase_integration_tests::{TestContext, body_json, test_config};

const URI: &str = "/api/webhooks/identity";

fn delivery(ctx: &TestContext, prefix: &str, timestamp: i64, body: &str) -> Request<Body> {
    let signature = ctx.webhook_signature("msg_2Lh9", timestamp, body.as_bytes());
    Request::builder()
        .method("POST")
        .uri(URI)
        .header(header::CONTENT_TYPE, "application/json")
        .header(format!("{prefix}-id"), "msg_2Lh9")
        .header(format!("{prefix}-timestamp"), timestamp.to_string())
        .header(format!("{prefix}-signature"), signature)
        .body(Body::from(body.to_owned()))
        .unwrap()
}

fn session_event() -> String {
    json!({ "type": "session.created", "data": { "id": "sess_1" } }).to_string()
}

#[tokio::test]
async fn test_missing_signing_headers() {
    let ctx = TestContext::new();
    let req = Request::builder()
        .method("POST")
        .uri(URI)
        .body(Body::from(session_event()))
        .unwrap();
    let resp = ctx.send(req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await,
        json!({ "error": "missing header: webhook-id" })
    );
}

#[tokio::test]
async fn test_ignored_event_accepted() {
    let ctx = TestContext::new();
    let now = Utc::now().timestamp();
    let resp = ctx
        .send(delivery(&ctx, "webhook", now, &session_event()))
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_svix_header_names_accepted() {
    let ctx = TestContext::new();
    let now = Utc::now().timestamp();
    let resp = ctx.send(delivery(&ctx, "svix", now, &session_event())).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_tampered_body_rejected() {
    let ctx = TestContext::new();
    let now = Utc::now().timestamp();
    let signed = session_event();
    let mut req = delivery(&ctx, "webhook", now, &signed);
    *req.body_mut() = Body::from(signed.replace("sess_1", "sess_2"));

    let resp = ctx.send(req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["error"], "signature mismatch");
}

#[tokio::test]
async fn test_stale_timestamp_rejected() {
    let ctx = TestContext::new();
    let stale = Utc::now().timestamp() - 3_600;
    let resp = ctx
        .send(delivery(&ctx, "webhook", stale, &session_event()))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signed_garbage_is_bad_request() {
    let ctx = TestContext::new();
    let now = Utc::now().timestamp();
    let resp = ctx.send(delivery(&ctx, "webhook", now, "not json")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_user_event_without_email_is_bad_request() {
    let ctx = TestContext::new();
    let now = Utc::now().timestamp();
    let body = json!({
        "type": "user.created",
        "data": { "id": "user_29w83sxmDNGwOuEthce5gg56FcC", "email_addresses": [] }
    })
    .to_string();
    let resp = ctx.send(delivery(&ctx, "webhook", now, &body)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unconfigured_receiver() {
    let mut config = test_config();
    config.identity_webhook_secret = None;
    let ctx = TestContext::with_config(config);
    let now = Utc::now().timestamp();

    let resp = ctx
        .send(delivery(&ctx, "webhook", now, &session_event()))
        .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
