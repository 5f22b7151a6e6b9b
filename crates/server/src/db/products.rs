//! Product repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use showcase_core::{AffiliatePlatform, CurrencyCode, ProductId, StoreId, UserId};

use super::{RepositoryError, contains_pattern, map_write_error};
use crate::models::{NewProduct, PageRequest, Product, ProductFilter, ProductUpdate};

const PRODUCT_COLUMNS: &str = "id, store_id, owner_id, title, description, image_url, \
                               original_url, affiliate_url, platform, price, currency_code, \
                               category, tags, is_featured, click_count, created_at, updated_at";

// Shared WHERE clause for `list`; parameters $1..$4 are the filter fields.
const LIST_FILTER: &str = "deleted_at IS NULL \
    AND ($1::int IS NULL OR owner_id = $1) \
    AND ($2::int IS NULL OR store_id = $2) \
    AND ($3::text IS NULL OR title ILIKE $3 OR description ILIKE $3) \
    AND ($4::text IS NULL OR category = $4)";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    store_id: i32,
    owner_id: i32,
    title: String,
    description: Option<String>,
    image_url: Option<String>,
    original_url: String,
    affiliate_url: String,
    platform: AffiliatePlatform,
    price: Option<Decimal>,
    currency_code: String,
    category: Option<String>,
    tags: Vec<String>,
    is_featured: bool,
    click_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let currency_code = row
            .currency_code
            .parse::<CurrencyCode>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: ProductId::new(row.id),
            store_id: StoreId::new(row.store_id),
            owner_id: UserId::new(row.owner_id),
            title: row.title,
            description: row.description,
            image_url: row.image_url,
            original_url: row.original_url,
            affiliate_url: row.affiliate_url,
            platform: row.platform,
            price: row.price,
            currency_code,
            category: row.category,
            tags: row.tags,
            is_featured: row.is_featured,
            click_count: row.click_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn collect(rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
    rows.into_iter().map(TryInto::try_into).collect()
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List live products matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(contains_pattern);

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM showcase.product WHERE {LIST_FILTER} \
             ORDER BY created_at DESC, id DESC LIMIT $5 OFFSET $6"
        ))
        .bind(filter.owner_id)
        .bind(filter.store_id)
        .bind(search.as_deref())
        .bind(filter.category.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM showcase.product WHERE {LIST_FILTER}"
        ))
        .bind(filter.owner_id)
        .bind(filter.store_id)
        .bind(search.as_deref())
        .bind(filter.category.as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok((collect(rows)?, total))
    }

    /// All live products in a store, featured first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_public_for_store(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM showcase.product \
             WHERE store_id = $1 AND deleted_at IS NULL \
             ORDER BY is_featured DESC, created_at DESC, id DESC"
        ))
        .bind(store_id)
        .fetch_all(self.pool)
        .await?;

        collect(rows)
    }

    /// Get a live product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM showcase.product WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store or owner does not exist.
    pub async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO showcase.product \
                 (store_id, owner_id, title, description, image_url, original_url, \
                  affiliate_url, platform, price, currency_code, category, tags, is_featured) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(product.store_id)
        .bind(product.owner_id)
        .bind(&product.title)
        .bind(product.description.as_deref())
        .bind(product.image_url.as_deref())
        .bind(&product.original_url)
        .bind(&product.affiliate_url)
        .bind(product.platform)
        .bind(product.price)
        .bind(product.currency_code.as_str())
        .bind(product.category.as_deref())
        .bind(&product.tags)
        .bind(product.is_featured)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error(e, "product already exists"))?;

        row.try_into()
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn update(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE showcase.product SET \
                 title = COALESCE($2, title), \
                 description = NULLIF(COALESCE($3, description), ''), \
                 image_url = NULLIF(COALESCE($4, image_url), ''), \
                 original_url = COALESCE($5, original_url), \
                 affiliate_url = COALESCE($6, affiliate_url), \
                 platform = COALESCE($7, platform), \
                 price = COALESCE($8, price), \
                 currency_code = COALESCE($9, currency_code), \
                 category = NULLIF(COALESCE($10, category), ''), \
                 tags = COALESCE($11, tags), \
                 is_featured = COALESCE($12, is_featured), \
                 updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(update.title.as_deref())
        .bind(update.description.as_deref())
        .bind(update.image_url.as_deref())
        .bind(update.original_url.as_deref())
        .bind(update.affiliate_url.as_deref())
        .bind(update.platform)
        .bind(update.price)
        .bind(update.currency_code.map(CurrencyCode::as_str))
        .bind(update.category.as_deref())
        .bind(update.tags.as_deref())
        .bind(update.is_featured)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Soft-delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn soft_delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE showcase.product SET deleted_at = NOW(), updated_at = NOW() \
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

    /// Count a click and return the affiliate URL to redirect to.
    ///
    /// Only products in a live, public store of a live owner are reachable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_click(&self, id: ProductId) -> Result<Option<String>, RepositoryError> {
        let url: Option<String> = sqlx::query_scalar(
            "UPDATE showcase.product p SET click_count = p.click_count + 1 \
             FROM showcase.store s, showcase.user u \
             WHERE p.id = $1 AND p.deleted_at IS NULL \
               AND s.id = p.store_id AND s.deleted_at IS NULL AND s.is_public \
               AND u.id = p.owner_id AND u.deleted_at IS NULL \
             RETURNING p.affiliate_url",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(url)
    }
}
