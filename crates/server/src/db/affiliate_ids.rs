//! Affiliate tracking id repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use showcase_core::{AffiliateIdId, AffiliatePlatform, UserId};

use super::{RepositoryError, map_write_error};
use crate::models::AffiliateId;

const AFFILIATE_ID_COLUMNS: &str = "id, user_id, platform, tracking_id, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct AffiliateIdRow {
    id: i32,
    user_id: i32,
    platform: AffiliatePlatform,
    tracking_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AffiliateIdRow> for AffiliateId {
    fn from(row: AffiliateIdRow) -> Self {
        Self {
            id: AffiliateIdId::new(row.id),
            user_id: UserId::new(row.user_id),
            platform: row.platform,
            tracking_id: row.tracking_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for affiliate tracking ids.
pub struct AffiliateIdRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AffiliateIdRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All of a user's tracking ids, ordered by platform.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<AffiliateId>, RepositoryError> {
        let rows = sqlx::query_as::<_, AffiliateIdRow>(&format!(
            "SELECT {AFFILIATE_ID_COLUMNS} FROM showcase.affiliate_id \
             WHERE user_id = $1 ORDER BY platform"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The user's tracking id for one platform.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_platform(
        &self,
        user_id: UserId,
        platform: AffiliatePlatform,
    ) -> Result<Option<AffiliateId>, RepositoryError> {
        let row = sqlx::query_as::<_, AffiliateIdRow>(&format!(
            "SELECT {AFFILIATE_ID_COLUMNS} FROM showcase.affiliate_id \
             WHERE user_id = $1 AND platform = $2"
        ))
        .bind(user_id)
        .bind(platform)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Set the tracking id for a platform, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn upsert(
        &self,
        user_id: UserId,
        platform: AffiliatePlatform,
        tracking_id: &str,
    ) -> Result<AffiliateId, RepositoryError> {
        let row = sqlx::query_as::<_, AffiliateIdRow>(&format!(
            "INSERT INTO showcase.affiliate_id (user_id, platform, tracking_id) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, platform) \
             DO UPDATE SET tracking_id = EXCLUDED.tracking_id, updated_at = NOW() \
             RETURNING {AFFILIATE_ID_COLUMNS}"
        ))
        .bind(user_id)
        .bind(platform)
        .bind(tracking_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error(e, "tracking id already set"))?;

        Ok(row.into())
    }

    /// Remove the tracking id for a platform.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if none was set.
    pub async fn delete(
        &self,
        user_id: UserId,
        platform: AffiliatePlatform,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM showcase.affiliate_id WHERE user_id = $1 AND platform = $2")
                .bind(user_id)
                .bind(platform)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
