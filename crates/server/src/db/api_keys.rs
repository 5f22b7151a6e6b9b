//! Encrypted API key repository.
//!
//! Stores the key vault envelope verbatim; encryption happens in
//! `crate::services::key_vault` before anything reaches this layer.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use showcase_core::{ApiKeyId, UserId};

use super::{RepositoryError, map_write_error};
use crate::models::StoredApiKey;

const API_KEY_COLUMNS: &str = "id, user_id, provider, hint, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ApiKeyRow {
    id: i32,
    user_id: i32,
    provider: String,
    hint: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ApiKeyRow> for StoredApiKey {
    fn from(row: ApiKeyRow) -> Self {
        Self {
            id: ApiKeyId::new(row.id),
            user_id: UserId::new(row.user_id),
            provider: row.provider,
            hint: row.hint,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for stored third-party API keys.
pub struct ApiKeyRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ApiKeyRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Key metadata for a user (never the ciphertext).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<StoredApiKey>, RepositoryError> {
        let rows = sqlx::query_as::<_, ApiKeyRow>(&format!(
            "SELECT {API_KEY_COLUMNS} FROM showcase.api_key WHERE user_id = $1 ORDER BY provider"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The stored envelope for a provider, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_ciphertext(
        &self,
        user_id: UserId,
        provider: &str,
    ) -> Result<Option<String>, RepositoryError> {
        let ciphertext: Option<String> = sqlx::query_scalar(
            "SELECT ciphertext FROM showcase.api_key WHERE user_id = $1 AND provider = $2",
        )
        .bind(user_id)
        .bind(provider)
        .fetch_optional(self.pool)
        .await?;

        Ok(ciphertext)
    }

    /// Store or replace the envelope for a provider.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn upsert(
        &self,
        user_id: UserId,
        provider: &str,
        ciphertext: &str,
        hint: &str,
    ) -> Result<StoredApiKey, RepositoryError> {
        let row = sqlx::query_as::<_, ApiKeyRow>(&format!(
            "INSERT INTO showcase.api_key (user_id, provider, ciphertext, hint) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, provider) DO UPDATE SET \
                 ciphertext = EXCLUDED.ciphertext, \
                 hint = EXCLUDED.hint, \
                 updated_at = NOW() \
             RETURNING {API_KEY_COLUMNS}"
        ))
        .bind(user_id)
        .bind(provider)
        .bind(ciphertext)
        .bind(hint)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error(e, "api key conflict"))?;

        Ok(row.into())
    }

    /// Remove the key for a provider.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if none was stored.
    pub async fn delete(&self, user_id: UserId, provider: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM showcase.api_key WHERE user_id = $1 AND provider = $2")
            .bind(user_id)
            .bind(provider)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
