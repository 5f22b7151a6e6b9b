//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transactions)
//! 2. `TraceLayer` (request span with method, uri, status, latency)
//! 3. Request ID (reuse or generate `x-request-id`)
//! 4. Security headers
//! 5. CORS
//! 6. Session layer (tower-sessions with `PostgreSQL` store)
//! 7. Rate limiting (governor, per route group)
//!
//! Authentication is done by extractors in [`auth`], not by a layer.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;
pub mod validation;

pub use auth::{OptionalUser, RequireAdmin, RequireUser, clear_current_user, set_current_user};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{create_session_layer, session_layer};
pub use validation::ValidatedJson;
