//! HTTP route handlers for the Showcase API.
//!
//! # Route Structure
//!
//! ```text
//! # Auth (per-IP auth limiter)
//! POST /api/auth/register              - Create a password account
//! POST /api/auth/login                 - Start a cookie session
//! POST /api/auth/logout                - End the cookie session
//! POST /api/auth/token                 - Exchange credentials for a bearer JWT
//! GET  /api/auth/me                    - Current user
//!
//! # Users
//! GET  /api/users                      - List users (admin)
//! GET|PUT|DELETE /api/users/{id}       - Profile (self or admin)
//!
//! # Catalog
//! GET|POST /api/stores                 - List / create stores
//! GET|PUT|DELETE /api/stores/{id}      - Store (owner or admin)
//! GET|POST /api/products               - List / create products
//! GET|PUT|DELETE /api/products/{id}    - Product (owner or admin)
//! POST /api/products/import            - Bulk import from URLs
//! POST /api/extract                    - Extract product data from a URL
//! POST /api/affiliate-links/preview    - Rewrite a link without saving
//!
//! # Affiliate accounts
//! GET  /api/affiliate-ids              - Tracking ids per platform
//! PUT|DELETE /api/affiliate-ids/{platform}
//! GET|POST /api/orders                 - Referred orders
//! GET  /api/orders/summary             - Totals per status
//! GET|PUT|DELETE /api/orders/{id}
//!
//! # Privacy and settings
//! GET|PUT /api/cookie-preferences      - Consent (session for guests)
//! GET  /api/api-keys                   - Stored provider keys (hint only)
//! PUT|DELETE /api/api-keys/{provider}
//! GET  /api/privacy/export             - Everything stored about the caller
//!
//! # Public
//! GET  /api/public/stores/{slug}       - Public storefront with products
//! GET  /go/{product_id}                - Count a click and redirect
//! POST /api/webhooks/identity          - Identity provider events
//! ```

pub mod affiliate;
pub mod api_keys;
pub mod auth;
pub mod consent;
pub mod extraction;
pub mod orders;
pub mod privacy;
pub mod products;
pub mod public;
pub mod stores;
pub mod users;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// Authenticated API routes sharing the general per-IP limiter.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(users::router())
        .merge(stores::router())
        .merge(products::router())
        .merge(extraction::router())
        .merge(affiliate::router())
        .merge(orders::router())
        .merge(consent::router())
        .merge(api_keys::router())
        .merge(privacy::router())
}
