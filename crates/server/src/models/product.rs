//! Product domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use showcase_core::{AffiliatePlatform, CurrencyCode, ProductId, StoreId, UserId};

/// A catalog entry pointing at a retailer page.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub store_id: StoreId,
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// The URL as submitted, after normalization.
    pub original_url: String,
    /// The URL visitors are redirected to, carrying the owner's tracking id.
    pub affiliate_url: String,
    pub platform: AffiliatePlatform,
    pub price: Option<Decimal>,
    pub currency_code: CurrencyCode,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub is_featured: bool,
    pub click_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub store_id: StoreId,
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub original_url: String,
    pub affiliate_url: String,
    pub platform: AffiliatePlatform,
    pub price: Option<Decimal>,
    pub currency_code: CurrencyCode,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub is_featured: bool,
}

/// Partial product update. `None` leaves a field unchanged.
///
/// When `original_url` changes the caller must also supply the recomputed
/// `affiliate_url` and `platform`.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub original_url: Option<String>,
    pub affiliate_url: Option<String>,
    pub platform: Option<AffiliatePlatform>,
    pub price: Option<Decimal>,
    pub currency_code: Option<CurrencyCode>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_featured: Option<bool>,
}

/// List filters. Every field is optional and combined with AND.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub owner_id: Option<UserId>,
    pub store_id: Option<StoreId>,
    /// Case-insensitive match on title or description.
    pub search: Option<String>,
    pub category: Option<String>,
}
