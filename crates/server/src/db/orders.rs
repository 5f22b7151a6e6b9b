//! Referred-order repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use showcase_core::{AffiliatePlatform, CurrencyCode, OrderId, OrderStatus, ProductId, UserId};

use super::{RepositoryError, map_write_error};
use crate::models::{NewOrder, Order, OrderFilter, OrderSummary, OrderUpdate, PageRequest};

const ORDER_COLUMNS: &str = "id, user_id, product_id, platform, external_order_id, amount, \
                             commission, currency_code, status, ordered_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    product_id: Option<i32>,
    platform: AffiliatePlatform,
    external_order_id: String,
    amount: Decimal,
    commission: Decimal,
    currency_code: String,
    status: OrderStatus,
    ordered_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let currency_code = row
            .currency_code
            .parse::<CurrencyCode>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            product_id: row.product_id.map(ProductId::new),
            platform: row.platform,
            external_order_id: row.external_order_id,
            amount: row.amount,
            commission: row.commission,
            currency_code,
            status: row.status,
            ordered_at: row.ordered_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    status: OrderStatus,
    count: i64,
    amount: Decimal,
    commission: Decimal,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a user's orders, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        filter: OrderFilter,
        page: PageRequest,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM showcase.\"order\" \
             WHERE user_id = $1 AND ($2::showcase.order_status IS NULL OR status = $2) \
             ORDER BY ordered_at DESC, id DESC LIMIT $3 OFFSET $4"
        ))
        .bind(user_id)
        .bind(filter.status)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM showcase.\"order\" \
             WHERE user_id = $1 AND ($2::showcase.order_status IS NULL OR status = $2)",
        )
        .bind(user_id)
        .bind(filter.status)
        .fetch_one(self.pool)
        .await?;

        let orders = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<Order>, _>>()?;
        Ok((orders, total))
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM showcase.\"order\" WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Record an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the retailer order id was already
    /// recorded for this user and platform.
    pub async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO showcase.\"order\" \
                 (user_id, product_id, platform, external_order_id, amount, commission, \
                  currency_code, status, ordered_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.user_id)
        .bind(order.product_id)
        .bind(order.platform)
        .bind(&order.external_order_id)
        .bind(order.amount)
        .bind(order.commission)
        .bind(order.currency_code.as_str())
        .bind(order.status)
        .bind(order.ordered_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error(e, "order already recorded"))?;

        row.try_into()
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn update(&self, id: OrderId, update: &OrderUpdate) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE showcase.\"order\" SET \
                 amount = COALESCE($2, amount), \
                 commission = COALESCE($3, commission), \
                 status = COALESCE($4, status), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.amount)
        .bind(update.commission)
        .bind(update.status)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Delete an order. Orders are bookkeeping rows and are removed outright.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM showcase.\"order\" WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Count, amount and commission per status. Statuses without orders are
    /// reported with zeros so the result always has one entry per status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary(&self, user_id: UserId) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            "SELECT status, COUNT(*) AS count, \
                    COALESCE(SUM(amount), 0) AS amount, \
                    COALESCE(SUM(commission), 0) AS commission \
             FROM showcase.\"order\" WHERE user_id = $1 GROUP BY status",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(OrderStatus::ALL
            .into_iter()
            .map(|status| {
                rows.iter().find(|r| r.status == status).map_or(
                    OrderSummary {
                        status,
                        count: 0,
                        amount: Decimal::ZERO,
                        commission: Decimal::ZERO,
                    },
                    |r| OrderSummary {
                        status,
                        count: r.count,
                        amount: r.amount,
                        commission: r.commission,
                    },
                )
            })
            .collect())
    }
}
