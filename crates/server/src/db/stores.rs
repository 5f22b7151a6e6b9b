//! Store repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use showcase_core::{Slug, StoreId, UserId};

use super::{RepositoryError, map_write_error};
use crate::models::{NewStore, PageRequest, Store, StoreUpdate};

const STORE_COLUMNS: &str =
    "id, owner_id, slug, name, description, is_public, created_at, updated_at";

const SLUG_TAKEN: &str = "slug already taken";

#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: i32,
    owner_id: i32,
    slug: String,
    name: String,
    description: Option<String>,
    is_public: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<StoreRow> for Store {
    type Error = RepositoryError;

    fn try_from(row: StoreRow) -> Result<Self, Self::Error> {
        let slug = Slug::parse(&row.slug).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid slug in database: {e}"))
        })?;

        Ok(Self {
            id: StoreId::new(row.id),
            owner_id: UserId::new(row.owner_id),
            slug,
            name: row.name,
            description: row.description,
            is_public: row.is_public,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for store database operations.
pub struct StoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List an owner's live stores, newest first. `None` lists every store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_owner(
        &self,
        owner_id: Option<UserId>,
        page: PageRequest,
    ) -> Result<(Vec<Store>, i64), RepositoryError> {
        let rows = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM showcase.store \
             WHERE deleted_at IS NULL AND ($1::int IS NULL OR owner_id = $1) \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(owner_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM showcase.store \
             WHERE deleted_at IS NULL AND ($1::int IS NULL OR owner_id = $1)",
        )
        .bind(owner_id)
        .fetch_one(self.pool)
        .await?;

        let stores = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<Store>, _>>()?;
        Ok((stores, total))
    }

    /// Get a live store by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM showcase.store WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a live, public store by slug. Stores owned by deleted users are hidden.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_public_by_slug(&self, slug: &Slug) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(
            "SELECT s.id, s.owner_id, s.slug, s.name, s.description, s.is_public, \
                    s.created_at, s.updated_at \
             FROM showcase.store s \
             JOIN showcase.user u ON u.id = s.owner_id AND u.deleted_at IS NULL \
             WHERE s.slug = $1 AND s.is_public AND s.deleted_at IS NULL",
        )
        .bind(slug.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken and
    /// `RepositoryError::NotFound` if the owner does not exist.
    pub async fn create(&self, store: &NewStore) -> Result<Store, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "INSERT INTO showcase.store (owner_id, slug, name, description, is_public) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {STORE_COLUMNS}"
        ))
        .bind(store.owner_id)
        .bind(store.slug.as_str())
        .bind(&store.name)
        .bind(store.description.as_deref())
        .bind(store.is_public)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error(e, SLUG_TAKEN))?;

        row.try_into()
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store does not exist and
    /// `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(&self, id: StoreId, update: &StoreUpdate) -> Result<Store, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "UPDATE showcase.store SET \
                 slug = COALESCE($2, slug), \
                 name = COALESCE($3, name), \
                 description = NULLIF(COALESCE($4, description), ''), \
                 is_public = COALESCE($5, is_public), \
                 updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {STORE_COLUMNS}"
        ))
        .bind(id)
        .bind(update.slug.as_ref().map(Slug::as_str))
        .bind(update.name.as_deref())
        .bind(update.description.as_deref())
        .bind(update.is_public)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_write_error(e, SLUG_TAKEN))?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Soft-delete a store and its products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store does not exist.
    pub async fn soft_delete(&self, id: StoreId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE showcase.store SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            "UPDATE showcase.product SET deleted_at = NOW(), updated_at = NOW() \
             WHERE store_id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
