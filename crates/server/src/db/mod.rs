//! Database operations for the Showcase `PostgreSQL` schema.
//!
//! ## Tables (schema `showcase`)
//!
//! - `user` / `user_password` - Accounts and argon2 password hashes
//! - `store` - Public storefronts, unique slug among live rows
//! - `product` - Catalog entries with rewritten affiliate URLs
//! - `affiliate_id` - Per-platform tracking ids
//! - `"order"` - Referred orders and commissions
//! - `cookie_preferences` - Consent choices for signed-in users
//! - `api_key` - Encrypted third-party keys (envelope from the key vault)
//!
//! Every soft-deletable table carries `deleted_at`; reads filter on
//! `deleted_at IS NULL`.
//!
//! # Migrations
//!
//! Migrations live in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p showcase-cli -- migrate
//! ```

pub mod affiliate_ids;
pub mod api_keys;
pub mod cookie_preferences;
pub mod orders;
pub mod products;
pub mod stores;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use affiliate_ids::AffiliateIdRepository;
pub use api_keys::ApiKeyRepository;
pub use cookie_preferences::CookiePreferencesRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use stores::StoreRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map an insert/update failure onto the repository error taxonomy.
///
/// Unique violations become `Conflict(conflict)`; foreign-key violations mean
/// the referenced owner or store does not exist and become `NotFound`.
pub(crate) fn map_write_error(err: sqlx::Error, conflict: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(conflict.to_owned());
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::NotFound;
        }
    }
    RepositoryError::Database(err)
}

/// Build an `ILIKE` pattern that matches `needle` anywhere, escaping wildcards.
pub(crate) fn contains_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}
