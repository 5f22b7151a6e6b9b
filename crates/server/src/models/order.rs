//! Referred-order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use showcase_core::{AffiliatePlatform, CurrencyCode, OrderId, OrderStatus, ProductId, UserId};

/// An order placed through one of the user's affiliate links.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub product_id: Option<ProductId>,
    pub platform: AffiliatePlatform,
    /// The retailer's order reference.
    pub external_order_id: String,
    pub amount: Decimal,
    pub commission: Decimal,
    pub currency_code: CurrencyCode,
    pub status: OrderStatus,
    pub ordered_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for recording an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub product_id: Option<ProductId>,
    pub platform: AffiliatePlatform,
    pub external_order_id: String,
    pub amount: Decimal,
    pub commission: Decimal,
    pub currency_code: CurrencyCode,
    pub status: OrderStatus,
    pub ordered_at: DateTime<Utc>,
}

/// Partial order update.
#[derive(Debug, Clone, Default)]
pub struct OrderUpdate {
    pub amount: Option<Decimal>,
    pub commission: Option<Decimal>,
    pub status: Option<OrderStatus>,
}

/// Order list filters.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
}

/// Totals for one status bucket.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub status: OrderStatus,
    pub count: i64,
    pub amount: Decimal,
    pub commission: Decimal,
}
