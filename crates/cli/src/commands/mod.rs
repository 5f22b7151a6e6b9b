//! CLI command implementations.

pub mod keygen;
pub mod migrate;
pub mod seed;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;

/// Errors shared by the database-backed commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read the database URL the same way the server does.
fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("SHOWCASE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("SHOWCASE_DATABASE_URL"))
}

/// Connect using the server's pool settings.
async fn connect() -> Result<PgPool, CommandError> {
    let url = database_url()?;
    tracing::info!("Connecting to database...");
    Ok(showcase_server::db::create_pool(&url).await?)
}
