//! Cookie consent repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use showcase_core::UserId;

use super::{RepositoryError, map_write_error};
use crate::models::CookiePreferences;

#[derive(Debug, sqlx::FromRow)]
struct CookiePreferencesRow {
    analytics: bool,
    marketing: bool,
    personalization: bool,
    updated_at: DateTime<Utc>,
}

impl From<CookiePreferencesRow> for CookiePreferences {
    fn from(row: CookiePreferencesRow) -> Self {
        Self {
            necessary: true,
            analytics: row.analytics,
            marketing: row.marketing,
            personalization: row.personalization,
            updated_at: Some(row.updated_at),
        }
    }
}

/// Repository for signed-in users' consent choices.
pub struct CookiePreferencesRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CookiePreferencesRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Stored preferences, or `None` if the user never chose.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, user_id: UserId) -> Result<Option<CookiePreferences>, RepositoryError> {
        let row = sqlx::query_as::<_, CookiePreferencesRow>(
            "SELECT analytics, marketing, personalization, updated_at \
             FROM showcase.cookie_preferences WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Save preferences.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn upsert(
        &self,
        user_id: UserId,
        prefs: &CookiePreferences,
    ) -> Result<CookiePreferences, RepositoryError> {
        let row = sqlx::query_as::<_, CookiePreferencesRow>(
            "INSERT INTO showcase.cookie_preferences \
                 (user_id, analytics, marketing, personalization) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id) DO UPDATE SET \
                 analytics = EXCLUDED.analytics, \
                 marketing = EXCLUDED.marketing, \
                 personalization = EXCLUDED.personalization, \
                 updated_at = NOW() \
             RETURNING analytics, marketing, personalization, updated_at",
        )
        .bind(user_id)
        .bind(prefs.analytics)
        .bind(prefs.marketing)
        .bind(prefs.personalization)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error(e, "preferences conflict"))?;

        Ok(row.into())
    }
}
