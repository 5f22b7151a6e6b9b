//! Integration tests for guest consent, anonymous access, storefront
//! lookups and rate limiting. None of these reach the database.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::json;

use showcase_integration_tests::{TestContext, body_json, get, json_request, session_cookie};

// =============================================================================
// Cookie preferences
// =============================================================================

#[tokio::test]
async fn test_guest_preferences_default() {
    let ctx = TestContext::new();
    let resp = ctx.send(get("/api/cookie-preferences")).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["necessary"], true);
    assert_eq!(body["analytics"], false);
    assert_eq!(body["marketing"], false);
    assert_eq!(body["personalization"], false);
    assert!(body["updated_at"].is_null());
}

#[tokio::test]
async fn test_guest_preferences_persist_in_session() {
    let ctx = TestContext::new();

    let req = json_request(
        "PUT",
        "/api/cookie-preferences",
        &json!({ "necessary": false, "analytics": true }),
        None,
    );
    let resp = ctx.send(req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = session_cookie(&resp).expect("session cookie set");
    let saved = body_json(resp).await;
    assert_eq!(saved["necessary"], true);
    assert_eq!(saved["analytics"], true);
    assert!(saved["updated_at"].is_string());

    let req = Request::builder()
        .uri("/api/cookie-preferences")
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    let resp = ctx.send(req).await;
    let body = body_json(resp).await;
    assert_eq!(body["analytics"], true);
    assert_eq!(body["marketing"], false);
    assert_eq!(body["updated_at"], saved["updated_at"]);

    // A different visitor still sees the defaults.
    let body = body_json(ctx.send(get("/api/cookie-preferences")).await).await;
    assert_eq!(body["analytics"], false);
}

// =============================================================================
// Affiliate link preview
// =============================================================================

#[tokio::test]
async fn test_preview_requires_authentication() {
    let ctx = TestContext::new();
    let req = json_request(
        "POST",
        "/api/affiliate-links/preview",
        &json!({ "url": "https://www.amazon.com/dp/B000000001" }),
        None,
    );
    assert_eq!(ctx.send(req).await.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Storefront
// =============================================================================

#[tokio::test]
async fn test_invalid_storefront_slug_is_not_found() {
    let ctx = TestContext::new();
    let resp = ctx.send(get("/api/public/stores/Not_A_Slug")).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await, json!({ "error": "store not found" }));
}

// =============================================================================
// Rate limiting
// =============================================================================

#[tokio::test]
async fn test_auth_endpoints_rate_limited_per_client() {
    let ctx = TestContext::new();
    let attempt = || {
        Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap()
    };

    for _ in 0..5 {
        let resp = ctx.send(attempt()).await;
        assert_ne!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }
    let resp = ctx.send(attempt()).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    // Another client behind the proxy has its own budget.
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "198.51.100.20")
        .body(Body::from("{}"))
        .unwrap();
    assert_ne!(ctx.send(req).await.status(), StatusCode::TOO_MANY_REQUESTS);
}
