//! User repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use showcase_core::{Email, UserId, UserRole};

use super::{RepositoryError, map_write_error};
use crate::models::{ExternalProfile, PageRequest, ProfileUpdate, User};

const USER_COLUMNS: &str = "id, email, display_name, bio, avatar_url, role, external_id, \
                            created_at, updated_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    display_name: Option<String>,
    bio: Option<String>,
    avatar_url: Option<String>,
    role: UserRole,
    external_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            display_name: row.display_name,
            bio: row.bio,
            avatar_url: row.avatar_url,
            role: row.role,
            external_id: row.external_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a live user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM showcase.user WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a live user by email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM showcase.user WHERE email = $1 AND deleted_at IS NULL"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a live user by identity provider subject.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM showcase.user \
             WHERE external_id = $1 AND deleted_at IS NULL"
        ))
        .bind(external_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// List live users, oldest first, with the total count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, page: PageRequest) -> Result<(Vec<User>, i64), RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM showcase.user WHERE deleted_at IS NULL \
             ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM showcase.user WHERE deleted_at IS NULL")
                .fetch_one(self.pool)
                .await?;

        let users = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<User>, _>>()?;
        Ok((users, total))
    }

    /// Create a new user with a password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_with_password(
        &self,
        email: &Email,
        display_name: Option<&str>,
        role: UserRole,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO showcase.user (email, display_name, role) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(display_name)
        .bind(role)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "email already exists"))?;

        sqlx::query("INSERT INTO showcase.user_password (user_id, password_hash) VALUES ($1, $2)")
            .bind(row.id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        row.try_into()
    }

    /// Get a live user together with their password hash.
    ///
    /// Returns `None` when the user does not exist or has no password
    /// (identity-provider accounts).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHashRow>(
            r"
            SELECT u.id, u.email, u.display_name, u.bio, u.avatar_url, u.role, u.external_id,
                   u.created_at, u.updated_at, p.password_hash
            FROM showcase.user u
            JOIN showcase.user_password p ON p.user_id = u.id
            WHERE u.email = $1 AND u.deleted_at IS NULL
            ",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((r.user.try_into()?, r.password_hash))),
            None => Ok(None),
        }
    }

    /// Update profile fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE showcase.user SET \
                 display_name = NULLIF(COALESCE($2, display_name), ''), \
                 bio = NULLIF(COALESCE($3, bio), ''), \
                 avatar_url = NULLIF(COALESCE($4, avatar_url), ''), \
                 updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.display_name.as_deref())
        .bind(update.bio.as_deref())
        .bind(update.avatar_url.as_deref())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Create or refresh an account from identity provider data.
    ///
    /// Matches on `external_id` first, then links an existing password
    /// account with the same email. Otherwise inserts a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email belongs to a different
    /// linked account.
    pub async fn upsert_external(
        &self,
        profile: &ExternalProfile,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE showcase.user SET \
                 external_id = $1, \
                 email = $2, \
                 display_name = COALESCE($3, display_name), \
                 avatar_url = COALESCE($4, avatar_url), \
                 updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM showcase.user \
                 WHERE deleted_at IS NULL \
                   AND (external_id = $1 OR (external_id IS NULL AND email = $2)) \
                 ORDER BY (external_id = $1) DESC NULLS LAST \
                 LIMIT 1 \
             ) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&profile.external_id)
        .bind(&profile.email)
        .bind(profile.display_name.as_deref())
        .bind(profile.avatar_url.as_deref())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "email already linked to another account"))?;

        let row = match updated {
            Some(row) => row,
            None => sqlx::query_as::<_, UserRow>(&format!(
                "INSERT INTO showcase.user (email, display_name, avatar_url, external_id) \
                 VALUES ($2, $3, $4, $1) \
                 RETURNING {USER_COLUMNS}"
            ))
            .bind(&profile.external_id)
            .bind(&profile.email)
            .bind(profile.display_name.as_deref())
            .bind(profile.avatar_url.as_deref())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_write_error(e, "email already linked to another account"))?,
        };

        tx.commit().await?;

        row.try_into()
    }

    /// Soft-delete a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no live user has this ID.
    pub async fn soft_delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE showcase.user SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Soft-delete the user linked to an identity provider subject.
    ///
    /// Returns `false` when no live user is linked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn soft_delete_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE showcase.user SET deleted_at = NOW(), updated_at = NOW() \
             WHERE external_id = $1 AND deleted_at IS NULL",
        )
        .bind(external_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_role(&self, id: UserId, role: UserRole) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE showcase.user SET role = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }
}
