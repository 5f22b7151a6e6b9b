//! Product handlers, including bulk import.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use showcase_core::{CurrencyCode, Price, ProductId, StoreId, UserId};

use super::extraction::{check_extraction_budget, resolve_api_key};
use super::stores::load_managed;
use super::users::validate_optional_url;
use crate::db::{AffiliateIdRepository, ProductRepository};
use crate::error::{AppError, field_error};
use crate::middleware::{RequireUser, ValidatedJson};
use crate::models::{
    CurrentUser, NewProduct, PageParams, Paginated, Product, ProductFilter, ProductUpdate,
};
use crate::services::extraction::url_parsing;
use crate::services::{AffiliateLink, ImportOutcome, ProductImporter, affiliate_url};
use crate::state::AppState;

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_products).post(create_product))
        .route("/api/products/import", post(import_products))
        .route(
            "/api/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    pub store_id: StoreId,
    #[validate(length(min = 1, max = 2048, message = "is required"))]
    pub url: String,
    #[validate(length(min = 1, max = 300, message = "must be 1 to 300 characters"))]
    pub title: String,
    #[validate(length(max = 5000, message = "must be at most 5000 characters"))]
    pub description: Option<String>,
    #[validate(custom(function = "validate_optional_url"))]
    pub image_url: Option<String>,
    #[validate(custom(function = "validate_amount"))]
    pub price: Option<Decimal>,
    #[validate(custom(function = "validate_currency"))]
    pub currency_code: Option<String>,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub category: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20, message = "at most 20 tags"))]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_featured: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 2048, message = "must not be empty"))]
    pub url: Option<String>,
    #[validate(length(min = 1, max = 300, message = "must be 1 to 300 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 5000, message = "must be at most 5000 characters"))]
    pub description: Option<String>,
    #[validate(custom(function = "validate_optional_url"))]
    pub image_url: Option<String>,
    #[validate(custom(function = "validate_amount"))]
    pub price: Option<Decimal>,
    #[validate(custom(function = "validate_currency"))]
    pub currency_code: Option<String>,
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub category: Option<String>,
    #[validate(length(max = 20, message = "at most 20 tags"))]
    pub tags: Option<Vec<String>>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ImportRequest {
    pub store_id: StoreId,
    #[validate(length(min = 1, max = 25, message = "must contain 1 to 25 URLs"))]
    pub urls: Vec<String>,
}

/// Product list filters. `all=true` is honored for admins only.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub store_id: Option<StoreId>,
    pub search: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub created: usize,
    pub failed: usize,
    pub results: Vec<ImportOutcome>,
}

/// Non-negative and below 10,000,000,000.
pub(crate) fn validate_amount(value: &Decimal) -> Result<(), ValidationError> {
    if Price::is_storable(*value) {
        Ok(())
    } else {
        Err(ValidationError::new("range")
            .with_message("must be between 0 and 9999999999.99".into()))
    }
}

pub(crate) fn validate_currency(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<CurrencyCode>()
        .map(|_| ())
        .map_err(|e| ValidationError::new("currency").with_message(e.into()))
}

fn parse_currency(raw: Option<&str>) -> Option<CurrencyCode> {
    raw.and_then(|s| s.parse().ok())
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Normalize `raw` and rewrite it with the owner's tracking id. Returns the
/// normalized URL alongside the link.
async fn affiliate_link(
    state: &AppState,
    owner_id: UserId,
    raw: &str,
) -> Result<(String, AffiliateLink), AppError> {
    let url = url_parsing::normalize(raw).map_err(|e| field_error("url", e.to_string()))?;
    let ids = AffiliateIdRepository::new(state.pool())
        .list_for_user(owner_id)
        .await?;
    let link = affiliate_url::rewrite_for_user(url.as_str(), &ids)?;
    Ok((url.into(), link))
}

async fn load_managed_product(
    state: &AppState,
    current: &CurrentUser,
    id: ProductId,
) -> Result<Product, AppError> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("product".to_string()))?;

    if !current.can_manage(product.owner_id) {
        return Err(AppError::Forbidden("not your product".to_string()));
    }
    Ok(product)
}

// =============================================================================
// Handlers
// =============================================================================

async fn list_products(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Query(params): Query<PageParams>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<Paginated<Product>>, AppError> {
    let page = params.validate()?;
    let filter = ProductFilter {
        owner_id: (!(query.all && current.role.is_admin())).then_some(current.id),
        store_id: query.store_id,
        search: query.search,
        category: query.category,
    };

    let (products, total) = ProductRepository::new(state.pool())
        .list(&filter, page)
        .await?;
    Ok(Json(Paginated::new(products, page, total)))
}

async fn create_product(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    ValidatedJson(body): ValidatedJson<CreateProductRequest>,
) -> Result<impl IntoResponse, AppError> {
    let store = load_managed(&state, &current, body.store_id).await?;
    let (original_url, link) = affiliate_link(&state, store.owner_id, &body.url).await?;

    let product = ProductRepository::new(state.pool())
        .create(&NewProduct {
            store_id: store.id,
            owner_id: store.owner_id,
            title: body.title.trim().to_string(),
            description: body.description,
            image_url: body.image_url.filter(|s| !s.is_empty()),
            original_url,
            affiliate_url: link.url,
            platform: link.platform,
            price: body.price,
            currency_code: parse_currency(body.currency_code.as_deref()).unwrap_or_default(),
            category: body.category,
            tags: normalize_tags(body.tags),
            is_featured: body.is_featured,
        })
        .await?;

    tracing::info!(product_id = %product.id, platform = %product.platform, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

async fn get_product(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(load_managed_product(&state, &current, id).await?))
}

/// Partial update. A new URL is re-normalized and re-rewritten with the
/// owner's tracking id.
async fn update_product(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<ProductId>,
    ValidatedJson(body): ValidatedJson<UpdateProductRequest>,
) -> Result<Json<Product>, AppError> {
    let product = load_managed_product(&state, &current, id).await?;

    let mut update = ProductUpdate {
        title: body.title.map(|t| t.trim().to_string()),
        description: body.description,
        image_url: body.image_url,
        price: body.price,
        currency_code: parse_currency(body.currency_code.as_deref()),
        category: body.category,
        tags: body.tags.map(normalize_tags),
        is_featured: body.is_featured,
        ..ProductUpdate::default()
    };

    if let Some(raw) = body.url.as_deref() {
        let (original, link) = affiliate_link(&state, product.owner_id, raw).await?;
        update.original_url = Some(original);
        update.affiliate_url = Some(link.url);
        update.platform = Some(link.platform);
    }

    let product = ProductRepository::new(state.pool())
        .update(id, &update)
        .await?;
    Ok(Json(product))
}

async fn delete_product(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, AppError> {
    load_managed_product(&state, &current, id).await?;
    ProductRepository::new(state.pool()).soft_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Extract and create products for each URL, one at a time.
///
/// Counts once against the caller's extraction budget.
async fn import_products(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    ValidatedJson(body): ValidatedJson<ImportRequest>,
) -> Result<Json<ImportResponse>, AppError> {
    let store = load_managed(&state, &current, body.store_id).await?;
    check_extraction_budget(&state, current.id)?;

    let api_key = resolve_api_key(&state, current.id).await?;
    let affiliate_ids = AffiliateIdRepository::new(state.pool())
        .list_for_user(store.owner_id)
        .await?;

    let results = ProductImporter::new(state.pool(), state.extractor())
        .import(
            store.owner_id,
            store.id,
            &body.urls,
            api_key.as_deref(),
            &affiliate_ids,
        )
        .await?;

    let created = results.iter().filter(|r| r.is_created()).count();
    Ok(Json(ImportResponse {
        created,
        failed: results.len() - created,
        results,
    }))
}
