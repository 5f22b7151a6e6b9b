//! Storefront domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use showcase_core::{Slug, StoreId, UserId};

/// A creator's storefront.
#[derive(Debug, Clone, Serialize)]
pub struct Store {
    pub id: StoreId,
    pub owner_id: UserId,
    pub slug: Slug,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a store.
#[derive(Debug, Clone)]
pub struct NewStore {
    pub owner_id: UserId,
    pub slug: Slug,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
}

/// Partial store update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct StoreUpdate {
    pub slug: Option<Slug>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
}
