//! Integration tests that need a real database: the catalog, accounts,
//! orders, keys and anything else behind an authenticated request.
//!
//! These tests require:
//! - A running `PostgreSQL` database
//! - `SHOWCASE_TEST_DATABASE_URL` pointing at it
//!
//! Migrations are applied on first use. Run with:
//! `cargo test -p showcase-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use serde_json::{Value, json};

use showcase_core::{UserId, UserRole};
use showcase_server::config::ServerConfig;
use showcase_server::db::UserRepository;
use showcase_integration_tests::{
    TestContext, body_json, get, json_request, session_cookie, test_config,
};

/// Suffix that keeps emails and slugs unique across runs.
fn unique() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

async fn migrated_context() -> TestContext {
    migrated_context_with(test_config()).await
}

async fn migrated_context_with(config: ServerConfig) -> TestContext {
    let ctx = TestContext::with_config(config);
    sqlx::migrate!("../server/migrations")
        .run(ctx.state.pool())
        .await
        .expect("migrations should apply");
    ctx
}

/// Register an account and exchange its credentials for a bearer header.
async fn register_and_token(ctx: &TestContext, email: &str) -> String {
    let credentials = json!({ "email": email, "password": "integration-pass" });

    let resp = ctx
        .send(json_request("POST", "/api/auth/register", &credentials, None))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = ctx
        .send(json_request("POST", "/api/auth/token", &credentials, None))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let token = body_json(resp).await;
    assert_eq!(token["token_type"], "Bearer");
    format!("Bearer {}", token["access_token"].as_str().unwrap())
}

/// A bodiless request carrying `bearer`.
fn request_as(method: &str, uri: &str, bearer: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, bearer)
        .body(Body::empty())
        .unwrap()
}

async fn user_id(ctx: &TestContext, bearer: &str) -> i32 {
    let resp = ctx.send(request_as("GET", "/api/auth/me", bearer)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    i32::try_from(body_json(resp).await["id"].as_i64().unwrap()).unwrap()
}

async fn create_store(ctx: &TestContext, bearer: &str, body: &Value) -> Value {
    let resp = ctx
        .send(json_request("POST", "/api/stores", body, Some(bearer)))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_store_product_and_click_through() {
    let ctx = migrated_context().await;
    let n = unique();
    let owner = register_and_token(&ctx, &format!("owner{n}@example.com")).await;

    let resp = ctx
        .send(json_request(
            "PUT",
            "/api/affiliate-ids/amazon",
            &json!({ "tracking_id": "it-20" }),
            Some(&owner),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = ctx
        .send(json_request(
            "POST",
            "/api/stores",
            &json!({ "name": format!("Integration Desk {n}") }),
            Some(&owner),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let store: Value = body_json(resp).await;
    let slug = store["slug"].as_str().unwrap().to_owned();
    assert!(slug.starts_with("integration-desk-"));

    let resp = ctx
        .send(json_request(
            "POST",
            "/api/products",
            &json!({
                "store_id": store["id"],
                "url": "amazon.com/dp/B000000001?utm_source=mail#reviews",
                "title": "Desk Lamp",
                "price": "39.90",
                "tags": ["Lighting", "lighting ", "desk"],
            }),
            Some(&owner),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let product: Value = body_json(resp).await;
    assert_eq!(product["platform"], "amazon");
    assert_eq!(product["original_url"], "https://amazon.com/dp/B000000001");
    let affiliate_url = product["affiliate_url"].as_str().unwrap().to_owned();
    assert!(affiliate_url.contains("tag=it-20"), "{affiliate_url}");
    assert_eq!(product["tags"], json!(["lighting", "desk"]));

    let resp = ctx.send(get(&format!("/api/public/stores/{slug}"))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let storefront = body_json(resp).await;
    assert_eq!(storefront["products"].as_array().unwrap().len(), 1);

    let resp = ctx.send(get(&format!("/go/{}", product["id"]))).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(resp.headers()[header::LOCATION], affiliate_url.as_str());

    let resp = ctx.send(get(&format!("/api/public/stores/{slug}"))).await;
    let storefront = body_json(resp).await;
    assert_eq!(storefront["products"][0]["click_count"], 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_other_users_cannot_manage_products() {
    let ctx = migrated_context().await;
    let n = unique();
    let owner = register_and_token(&ctx, &format!("a{n}@example.com")).await;
    let intruder = register_and_token(&ctx, &format!("b{n}@example.com")).await;

    let resp = ctx
        .send(json_request(
            "POST",
            "/api/stores",
            &json!({ "name": format!("Private Shelf {n}"), "is_public": false }),
            Some(&owner),
        ))
        .await;
    let store = body_json(resp).await;

    let resp = ctx
        .send(json_request(
            "POST",
            "/api/products",
            &json!({
                "store_id": store["id"],
                "url": "https://www.etsy.com/listing/123/mug",
                "title": "Mug",
            }),
            Some(&owner),
        ))
        .await;
    let product = body_json(resp).await;

    let resp = ctx
        .send(json_request(
            "PUT",
            &format!("/api/products/{}", product["id"]),
            &json!({ "title": "Mine now" }),
            Some(&intruder),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Private stores are not public, and neither are their click-throughs.
    let resp = ctx
        .send(get(&format!("/api/public/stores/{}", store["slug"].as_str().unwrap())))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = ctx.send(get(&format!("/go/{}", product["id"]))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_session_login_and_logout() {
    let ctx = migrated_context().await;
    let email = format!("session{}@example.com", unique());
    let credentials = json!({ "email": email, "password": "integration-pass" });

    ctx.send(json_request("POST", "/api/auth/register", &credentials, None))
        .await;
    let resp = ctx
        .send(json_request("POST", "/api/auth/login", &credentials, None))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = session_cookie(&resp).unwrap();

    let me = |cookie: &str| {
        Request::builder()
            .uri("/api/auth/me")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    };
    let resp = ctx.send(me(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["email"], email);

    let logout = Request::builder()
        .method("POST")
        .uri("/api/auth/logout")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    assert_eq!(ctx.send(logout).await.status(), StatusCode::NO_CONTENT);

    assert_eq!(ctx.send(me(&cookie)).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_identity_webhook_creates_and_deletes_user() {
    let ctx = migrated_context().await;
    let n = unique();
    let external_id = format!("user_{n}");
    let now = Utc::now().timestamp();

    let send = |body: String| {
        let signature = ctx.webhook_signature("msg_it", now, body.as_bytes());
        Request::builder()
            .method("POST")
            .uri("/api/webhooks/identity")
            .header("webhook-id", "msg_it")
            .header("webhook-timestamp", now.to_string())
            .header("webhook-signature", signature)
            .body(Body::from(body))
            .unwrap()
    };

    let created = json!({
        "type": "user.created",
        "data": {
            "id": external_id,
            "first_name": "Ada",
            "last_name": "Lovelace",
            "primary_email_address_id": "idn_1",
            "email_addresses": [
                { "id": "idn_0", "email_address": format!("old{n}@example.com") },
                { "id": "idn_1", "email_address": format!("ada{n}@example.com") }
            ]
        }
    });
    let resp = ctx.send(send(created.to_string())).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let users = UserRepository::new(ctx.state.pool());
    let user = users.get_by_external_id(&external_id).await.unwrap().unwrap();
    assert_eq!(user.email.as_str(), format!("ada{n}@example.com"));
    assert_eq!(user.display_name.as_deref(), Some("Ada Lovelace"));

    let deleted = json!({ "type": "user.deleted", "data": { "id": external_id } });
    let resp = ctx.send(send(deleted.to_string())).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(users.get_by_external_id(&external_id).await.unwrap().is_none());
}

// =============================================================================
// Account lifecycle
// =============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_user_listing_requires_admin() {
    let ctx = migrated_context().await;
    let bearer = register_and_token(&ctx, &format!("plain{}@example.com", unique())).await;

    let resp = ctx.send(request_as("GET", "/api/users", &bearer)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(resp).await["error"], "admin access required");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_deleted_and_demoted_accounts_lose_access() {
    let ctx = migrated_context().await;
    let n = unique();
    let users = UserRepository::new(ctx.state.pool());

    let owner_email = format!("leaving{n}@example.com");
    let owner = register_and_token(&ctx, &owner_email).await;
    let resp = ctx
        .send(json_request(
            "POST",
            "/api/auth/login",
            &json!({ "email": owner_email, "password": "integration-pass" }),
            None,
        ))
        .await;
    let cookie = session_cookie(&resp).unwrap();
    let owner_id = user_id(&ctx, &owner).await;

    let store = create_store(&ctx, &owner, &json!({ "name": format!("Closing Down {n}") })).await;
    let resp = ctx
        .send(json_request(
            "POST",
            "/api/products",
            &json!({
                "store_id": store["id"],
                "url": "https://www.etsy.com/listing/9/vase",
                "title": "Vase",
            }),
            Some(&owner),
        ))
        .await;
    let product = body_json(resp).await;
    let go = format!("/go/{}", product["id"]);
    assert_eq!(ctx.send(get(&go)).await.status(), StatusCode::TEMPORARY_REDIRECT);

    let admin = register_and_token(&ctx, &format!("mod{n}@example.com")).await;
    let admin_id = user_id(&ctx, &admin).await;
    users
        .set_role(UserId::new(admin_id), UserRole::Admin)
        .await
        .unwrap();
    let resp = ctx
        .send(request_as("DELETE", &format!("/api/users/{owner_id}"), &admin))
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // Neither the old session nor the old token still works.
    let with_cookie = Request::builder()
        .method("POST")
        .uri("/api/stores")
        .header(header::COOKIE, &cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "name": "Ghost" }).to_string()))
        .unwrap();
    assert_eq!(ctx.send(with_cookie).await.status(), StatusCode::UNAUTHORIZED);
    let resp = ctx
        .send(json_request("POST", "/api/stores", &json!({ "name": "Ghost" }), Some(&owner)))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(ctx.send(get(&go)).await.status(), StatusCode::NOT_FOUND);

    // Demotion applies to the very next request.
    assert_eq!(
        ctx.send(request_as("GET", "/api/users", &admin)).await.status(),
        StatusCode::OK
    );
    users
        .set_role(UserId::new(admin_id), UserRole::User)
        .await
        .unwrap();
    assert_eq!(
        ctx.send(request_as("GET", "/api/users", &admin)).await.status(),
        StatusCode::FORBIDDEN
    );
}

// =============================================================================
// Stores
// =============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_slug_conflict_and_store_delete_cascade() {
    let ctx = migrated_context().await;
    let n = unique();
    let owner = register_and_token(&ctx, &format!("slugs{n}@example.com")).await;
    let slug = format!("corner-shop-{n}");

    let store = create_store(&ctx, &owner, &json!({ "name": "Corner Shop", "slug": slug })).await;
    let resp = ctx
        .send(json_request(
            "POST",
            "/api/stores",
            &json!({ "name": "Another Corner", "slug": slug }),
            Some(&owner),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = ctx
        .send(json_request(
            "POST",
            "/api/products",
            &json!({
                "store_id": store["id"],
                "url": "https://www.ebay.com/itm/1234567890",
                "title": "Radio",
            }),
            Some(&owner),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let product = body_json(resp).await;

    let resp = ctx
        .send(request_as("DELETE", &format!("/api/stores/{}", store["id"]), &owner))
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = ctx
        .send(request_as("GET", &format!("/api/products/{}", product["id"]), &owner))
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        ctx.send(get(&format!("/api/public/stores/{slug}"))).await.status(),
        StatusCode::NOT_FOUND
    );
}

// =============================================================================
// Price bounds
// =============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_oversized_amounts_are_validation_errors() {
    let ctx = migrated_context().await;
    let n = unique();
    let owner = register_and_token(&ctx, &format!("bigspender{n}@example.com")).await;
    let store = create_store(&ctx, &owner, &json!({ "name": format!("Yachts {n}") })).await;

    let resp = ctx
        .send(json_request(
            "POST",
            "/api/products",
            &json!({
                "store_id": store["id"],
                "url": "https://example.com/yacht",
                "title": "Yacht",
                "price": "100000000000",
            }),
            Some(&owner),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(resp).await["details"]["price"].is_array());

    let resp = ctx
        .send(json_request(
            "POST",
            "/api/orders",
            &json!({
                "platform": "amazon",
                "external_order_id": "111-0000000-0000001",
                "amount": "99999999999",
                "commission": "0",
            }),
            Some(&owner),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(resp).await["details"]["amount"].is_array());
}

// =============================================================================
// Orders
// =============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_order_lifecycle() {
    let ctx = migrated_context().await;
    let n = unique();
    let earner = register_and_token(&ctx, &format!("earner{n}@example.com")).await;
    let stranger = register_and_token(&ctx, &format!("stranger{n}@example.com")).await;

    let new_order = json!({
        "platform": "amazon",
        "external_order_id": "111-2222222-3333333",
        "amount": "49.99",
        "commission": "2.00",
    });
    let resp = ctx
        .send(json_request("POST", "/api/orders", &new_order, Some(&earner)))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order = body_json(resp).await;
    assert_eq!(order["status"], "pending");
    let uri = format!("/api/orders/{}", order["id"]);

    let resp = ctx
        .send(json_request("POST", "/api/orders", &new_order, Some(&earner)))
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // The same retailer order id is fine for someone else.
    let resp = ctx
        .send(json_request("POST", "/api/orders", &new_order, Some(&stranger)))
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    assert_eq!(
        ctx.send(request_as("GET", &uri, &stranger)).await.status(),
        StatusCode::FORBIDDEN
    );

    let resp = ctx
        .send(json_request("PUT", &uri, &json!({ "status": "paid" }), Some(&earner)))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "paid");

    let resp = ctx
        .send(json_request("PUT", &uri, &json!({ "commission": "3.00" }), Some(&earner)))
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = ctx.send(request_as("GET", "/api/orders?status=paid", &earner)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["data"].as_array().unwrap().len(), 1);

    let resp = ctx.send(request_as("GET", "/api/orders/summary", &earner)).await;
    let summary = body_json(resp).await;
    let paid = summary
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["status"] == "paid")
        .unwrap();
    assert_eq!(paid["count"], 1);

    assert_eq!(
        ctx.send(request_as("DELETE", &uri, &earner)).await.status(),
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        ctx.send(request_as("GET", &uri, &earner)).await.status(),
        StatusCode::NOT_FOUND
    );
}

// =============================================================================
// Affiliate ids, link previews and API keys
// =============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_affiliate_id_upsert_and_delete() {
    let ctx = migrated_context().await;
    let owner = register_and_token(&ctx, &format!("tags{}@example.com", unique())).await;

    for tag in ["first-20", "second-20"] {
        let resp = ctx
            .send(json_request(
                "PUT",
                "/api/affiliate-ids/amazon",
                &json!({ "tracking_id": tag }),
                Some(&owner),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
    let resp = ctx.send(request_as("GET", "/api/affiliate-ids", &owner)).await;
    let ids = body_json(resp).await;
    assert_eq!(ids.as_array().unwrap().len(), 1);
    assert_eq!(ids[0]["tracking_id"], "second-20");

    let resp = ctx
        .send(json_request(
            "PUT",
            "/api/affiliate-ids/other",
            &json!({ "tracking_id": "nope" }),
            Some(&owner),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = ctx
        .send(request_as("DELETE", "/api/affiliate-ids/amazon", &owner))
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = ctx.send(request_as("GET", "/api/affiliate-ids", &owner)).await;
    assert_eq!(body_json(resp).await, json!([]));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_preview_links() {
    let ctx = migrated_context().await;
    let bearer = register_and_token(&ctx, &format!("preview{}@example.com", unique())).await;
    let preview =
        |body: Value| json_request("POST", "/api/affiliate-links/preview", &body, Some(&bearer));

    let resp = ctx
        .send(preview(json!({
            "url": "https://www.amazon.com/dp/B000000001?tag=someone-20&th=1",
            "tracking_id": "desk-20",
        })))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["platform"], "amazon");
    assert_eq!(body["rewritten"], true);
    let url = body["url"].as_str().unwrap();
    assert!(url.contains("tag=desk-20"), "{url}");
    assert!(!url.contains("someone-20"), "{url}");

    let resp = ctx
        .send(preview(json!({
            "url": "https://www.amazon.com/dp/B000000001",
            "tracking_id": "has space",
        })))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(resp).await["details"]["tracking_id"].is_array());

    let resp = ctx
        .send(preview(json!({ "url": "ftp://amazon.com/file", "tracking_id": "desk-20" })))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_api_keys_never_echo_the_secret() {
    let ctx = migrated_context().await;
    let owner = register_and_token(&ctx, &format!("keys{}@example.com", unique())).await;
    let secret = "sk-integration-abcd1234";

    let resp = ctx
        .send(json_request(
            "PUT",
            "/api/api-keys/OpenAI",
            &json!({ "api_key": secret }),
            Some(&owner),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let stored = body_json(resp).await;
    assert_eq!(stored["provider"], "openai");
    assert_eq!(stored["hint"], "1234");
    assert!(!stored.to_string().contains(secret));

    let resp = ctx.send(request_as("GET", "/api/api-keys", &owner)).await;
    let listed = body_json(resp).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert!(!listed.to_string().contains(secret));

    let resp = ctx
        .send(request_as("DELETE", "/api/api-keys/openai", &owner))
        .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = ctx.send(request_as("GET", "/api/api-keys", &owner)).await;
    assert_eq!(body_json(resp).await, json!([]));
}

// =============================================================================
// Privacy
// =============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_privacy_export() {
    let ctx = migrated_context().await;
    let n = unique();
    let email = format!("export{n}@example.com");
    let owner = register_and_token(&ctx, &email).await;
    let secret = "sk-export-wxyz9876";

    create_store(&ctx, &owner, &json!({ "name": format!("Export Desk {n}") })).await;
    ctx.send(json_request(
        "PUT",
        "/api/api-keys/openai",
        &json!({ "api_key": secret }),
        Some(&owner),
    ))
    .await;
    ctx.send(json_request(
        "PUT",
        "/api/cookie-preferences",
        &json!({ "analytics": true }),
        Some(&owner),
    ))
    .await;

    let resp = ctx.send(request_as("GET", "/api/privacy/export", &owner)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let export = body_json(resp).await;
    assert_eq!(export["user"]["email"], email);
    assert_eq!(export["stores"].as_array().unwrap().len(), 1);
    assert_eq!(export["products"], json!([]));
    assert_eq!(export["orders"], json!([]));
    assert_eq!(export["cookie_preferences"]["analytics"], true);
    assert_eq!(export["api_keys"][0]["hint"], "9876");
    assert!(!export.to_string().contains(secret));
}

// =============================================================================
// Extraction budget
// =============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_extraction_budget_is_shared_with_import() {
    let mut config = test_config();
    config.extraction.rate_per_minute = 1;
    let ctx = migrated_context_with(config).await;
    let n = unique();
    let owner = register_and_token(&ctx, &format!("budget{n}@example.com")).await;
    let store = create_store(&ctx, &owner, &json!({ "name": format!("Budget {n}") })).await;

    // Spends the budget without fetching anything.
    let resp = ctx
        .send(json_request(
            "POST",
            "/api/extract",
            &json!({ "url": "ftp://example.com/file" }),
            Some(&owner),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = ctx
        .send(json_request(
            "POST",
            "/api/extract",
            &json!({ "url": "https://example.com/p" }),
            Some(&owner),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    let resp = ctx
        .send(json_request(
            "POST",
            "/api/products/import",
            &json!({ "store_id": store["id"], "urls": ["https://example.com/p"] }),
            Some(&owner),
        ))
        .await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}
