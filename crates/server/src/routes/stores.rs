//! Store handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use showcase_core::{Slug, StoreId};

use crate::db::StoreRepository;
use crate::error::{AppError, field_error};
use crate::middleware::{RequireUser, ValidatedJson};
use crate::models::{CurrentUser, NewStore, PageParams, Paginated, Store, StoreUpdate};
use crate::state::AppState;

/// Build the stores router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/stores", get(list_stores).post(create_store))
        .route(
            "/api/stores/{id}",
            get(get_store).put(update_store).delete(delete_store),
        )
}

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateStoreRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub name: String,
    /// Derived from `name` when omitted.
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStoreRequest {
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,
    pub is_public: Option<bool>,
}

/// `?all=true` lists every store; honored for admins only.
#[derive(Debug, Default, Deserialize)]
pub struct StoreListQuery {
    #[serde(default)]
    pub all: bool,
}

const fn default_public() -> bool {
    true
}

fn validate_slug(value: &str) -> Result<(), ValidationError> {
    Slug::parse(value)
        .map(|_| ())
        .map_err(|e| ValidationError::new("slug").with_message(e.to_string().into()))
}

/// Load a live store the caller may manage.
pub(crate) async fn load_managed(
    state: &AppState,
    current: &CurrentUser,
    id: StoreId,
) -> Result<Store, AppError> {
    let store = StoreRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("store".to_string()))?;

    if !current.can_manage(store.owner_id) {
        return Err(AppError::Forbidden("not your store".to_string()));
    }
    Ok(store)
}

// =============================================================================
// Handlers
// =============================================================================

async fn list_stores(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Query(params): Query<PageParams>,
    Query(query): Query<StoreListQuery>,
) -> Result<Json<Paginated<Store>>, AppError> {
    let page = params.validate()?;
    let owner = if query.all && current.role.is_admin() {
        None
    } else {
        Some(current.id)
    };

    let (stores, total) = StoreRepository::new(state.pool())
        .list_for_owner(owner, page)
        .await?;
    Ok(Json(Paginated::new(stores, page, total)))
}

async fn create_store(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    ValidatedJson(body): ValidatedJson<CreateStoreRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = body.name.trim().to_string();
    let slug = match body.slug.as_deref() {
        Some(raw) => Slug::parse(raw),
        None => Slug::from_name(&name),
    }
    .map_err(|e| field_error("slug", e.to_string()))?;

    let store = StoreRepository::new(state.pool())
        .create(&NewStore {
            owner_id: current.id,
            slug,
            name,
            description: body.description,
            is_public: body.is_public,
        })
        .await?;

    tracing::info!(store_id = %store.id, slug = %store.slug, "store created");
    Ok((StatusCode::CREATED, Json(store)))
}

async fn get_store(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<StoreId>,
) -> Result<Json<Store>, AppError> {
    Ok(Json(load_managed(&state, &current, id).await?))
}

async fn update_store(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<StoreId>,
    ValidatedJson(body): ValidatedJson<UpdateStoreRequest>,
) -> Result<Json<Store>, AppError> {
    load_managed(&state, &current, id).await?;

    let slug = body
        .slug
        .as_deref()
        .map(Slug::parse)
        .transpose()
        .map_err(|e| field_error("slug", e.to_string()))?;

    let store = StoreRepository::new(state.pool())
        .update(
            id,
            &StoreUpdate {
                slug,
                name: body.name.map(|n| n.trim().to_string()),
                description: body.description,
                is_public: body.is_public,
            },
        )
        .await?;
    Ok(Json(store))
}

/// Soft-delete a store and its products.
async fn delete_store(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<StoreId>,
) -> Result<StatusCode, AppError> {
    load_managed(&state, &current, id).await?;
    StoreRepository::new(state.pool()).soft_delete(id).await?;
    tracing::info!(store_id = %id, "store deleted");
    Ok(StatusCode::NO_CONTENT)
}
