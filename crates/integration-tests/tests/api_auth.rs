//! Integration tests for health checks, authentication and the middleware
//! stack. None of these reach the database.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::json;

use showcase_core::UserRole;
use showcase_integration_tests::{TestContext, body_json, get, json_request};

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new();
    let resp = ctx.send(get("/health")).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), 64).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn test_readiness_without_database() {
    if std::env::var("SHOWCASE_TEST_DATABASE_URL").is_ok() {
        return;
    }
    let ctx = TestContext::new();
    let resp = ctx.send(get("/health/ready")).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

// =============================================================================
// Middleware
// =============================================================================

#[tokio::test]
async fn test_security_headers() {
    let ctx = TestContext::new();
    let resp = ctx.send(get("/health")).await;
    let headers = resp.headers();

    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["referrer-policy"], "no-referrer");
    assert_eq!(headers["cache-control"], "no-store");
    assert!(headers.contains_key("content-security-policy"));
    assert!(headers.contains_key("strict-transport-security"));
}

#[tokio::test]
async fn test_request_id_generated_and_echoed() {
    let ctx = TestContext::new();

    let resp = ctx.send(get("/health")).await;
    let generated = resp.headers()["x-request-id"].to_str().unwrap();
    assert_eq!(generated.len(), 36, "expected a uuid, got {generated}");

    let req = Request::builder()
        .uri("/health")
        .header("x-request-id", "edge-abc.123")
        .body(Body::empty())
        .unwrap();
    let resp = ctx.send(req).await;
    assert_eq!(resp.headers()["x-request-id"], "edge-abc.123");

    let req = Request::builder()
        .uri("/health")
        .header("x-request-id", "has spaces")
        .body(Body::empty())
        .unwrap();
    let resp = ctx.send(req).await;
    assert_ne!(resp.headers()["x-request-id"], "has spaces");
}

#[tokio::test]
async fn test_cors_preflight_for_configured_origin() {
    let ctx = TestContext::new();
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/auth/me")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();
    let resp = ctx.send(req).await;

    assert_eq!(
        resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn test_cors_ignores_unknown_origin() {
    let ctx = TestContext::new();
    let req = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .unwrap();
    let resp = ctx.send(req).await;
    assert!(!resp.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_me_requires_authentication() {
    let ctx = TestContext::new();
    let resp = ctx.send(get("/api/auth/me")).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(resp).await,
        json!({ "error": "authentication required" })
    );
}

#[tokio::test]
async fn test_malformed_authorization_header() {
    let ctx = TestContext::new();
    let req = Request::builder()
        .uri("/api/stores")
        .header(header::AUTHORIZATION, "Token abc")
        .body(Body::empty())
        .unwrap();
    let resp = ctx.send(req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(resp).await["error"],
        "malformed authorization header"
    );
}

#[tokio::test]
async fn test_invalid_bearer_token() {
    let ctx = TestContext::new();
    let req = Request::builder()
        .uri("/api/stores")
        .header(header::AUTHORIZATION, "Bearer not.a.jwt")
        .body(Body::empty())
        .unwrap();
    let resp = ctx.send(req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_from_another_secret_rejected() {
    let mut config = showcase_integration_tests::test_config();
    config.jwt.secret = "a-completely-different-signing-value-42".to_string().into();
    let other = TestContext::with_config(config);
    let bearer = other.bearer_for(1, UserRole::Admin);

    let ctx = TestContext::new();
    let req = Request::builder()
        .uri("/api/users")
        .header(header::AUTHORIZATION, bearer)
        .body(Body::empty())
        .unwrap();
    let resp = ctx.send(req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_register_validation_details() {
    let ctx = TestContext::new();
    let req = json_request(
        "POST",
        "/api/auth/register",
        &json!({ "email": "nope", "password": "short" }),
        None,
    );
    let resp = ctx.send(req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "validation failed");
    assert!(body["details"]["email"].is_array());
    assert!(body["details"]["password"].is_array());
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let ctx = TestContext::new();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\":"))
        .unwrap();
    let resp = ctx.send(req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(resp).await["error"].is_string());
}
