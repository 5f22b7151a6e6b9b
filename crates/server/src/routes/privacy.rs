//! Personal data export.

use axum::{Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::{
    AffiliateIdRepository, ApiKeyRepository, CookiePreferencesRepository, OrderRepository,
    ProductRepository, StoreRepository, UserRepository,
};
use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::models::{
    AffiliateId, CookiePreferences, Order, OrderFilter, PageRequest, Product, ProductFilter,
    Store, StoredApiKey, User,
};
use crate::services::AuthError;
use crate::state::AppState;

/// Single page large enough to hold any one account's rows.
const EXPORT_PAGE: PageRequest = PageRequest {
    page: 1,
    per_page: 100_000,
};

/// Build the privacy router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/privacy/export", get(export))
}

/// Everything stored about one account. API keys appear as provider and hint
/// only.
#[derive(Debug, Serialize)]
pub struct DataExport {
    pub exported_at: DateTime<Utc>,
    pub user: User,
    pub stores: Vec<Store>,
    pub products: Vec<Product>,
    pub affiliate_ids: Vec<AffiliateId>,
    pub orders: Vec<Order>,
    pub cookie_preferences: Option<CookiePreferences>,
    pub api_keys: Vec<StoredApiKey>,
}

async fn export(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<Json<DataExport>, AppError> {
    let pool = state.pool();
    let user = UserRepository::new(pool)
        .get_by_id(current.id)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    let (stores, _) = StoreRepository::new(pool)
        .list_for_owner(Some(current.id), EXPORT_PAGE)
        .await?;
    let product_filter = ProductFilter {
        owner_id: Some(current.id),
        ..ProductFilter::default()
    };
    let (products, _) = ProductRepository::new(pool)
        .list(&product_filter, EXPORT_PAGE)
        .await?;
    let (orders, _) = OrderRepository::new(pool)
        .list_for_user(current.id, OrderFilter::default(), EXPORT_PAGE)
        .await?;

    let export = DataExport {
        exported_at: Utc::now(),
        user,
        stores,
        products,
        affiliate_ids: AffiliateIdRepository::new(pool)
            .list_for_user(current.id)
            .await?,
        orders,
        cookie_preferences: CookiePreferencesRepository::new(pool).get(current.id).await?,
        api_keys: ApiKeyRepository::new(pool).list_for_user(current.id).await?,
    };

    tracing::info!(user_id = %current.id, "personal data exported");
    Ok(Json(export))
}
