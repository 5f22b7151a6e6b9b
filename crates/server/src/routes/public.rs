//! Unauthenticated storefront pages and click-through redirects.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::Redirect,
    routing::get,
};
use serde::Serialize;

use showcase_core::{ProductId, Slug};

use crate::db::{ProductRepository, StoreRepository};
use crate::error::AppError;
use crate::models::{Product, Store};
use crate::state::AppState;

/// Build the public router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/public/stores/{slug}", get(storefront))
        .route("/go/{product_id}", get(go))
}

/// A public store with its products, featured first.
#[derive(Debug, Serialize)]
pub struct Storefront {
    pub store: Store,
    pub products: Vec<Product>,
}

async fn storefront(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Storefront>, AppError> {
    let not_found = || AppError::NotFound("store".to_string());
    let slug = Slug::parse(&slug).map_err(|_| not_found())?;

    let store = StoreRepository::new(state.pool())
        .get_public_by_slug(&slug)
        .await?
        .ok_or_else(not_found)?;
    let products = ProductRepository::new(state.pool())
        .list_public_for_store(store.id)
        .await?;

    Ok(Json(Storefront { store, products }))
}

/// Count the click and send the visitor to the affiliate URL.
async fn go(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<Redirect, AppError> {
    let url = ProductRepository::new(state.pool())
        .record_click(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("product".to_string()))?;

    tracing::debug!(product_id = %product_id, "affiliate click");
    Ok(Redirect::temporary(&url))
}
