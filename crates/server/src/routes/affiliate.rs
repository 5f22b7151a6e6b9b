//! Affiliate tracking ids and link previews.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use showcase_core::AffiliatePlatform;

use crate::db::AffiliateIdRepository;
use crate::error::AppError;
use crate::middleware::{RequireUser, ValidatedJson};
use crate::models::AffiliateId;
use crate::services::{AffiliateLink, affiliate_url};
use crate::state::AppState;

/// Build the affiliate router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/affiliate-links/preview", post(preview))
        .route("/api/affiliate-ids", get(list_ids))
        .route(
            "/api/affiliate-ids/{platform}",
            put(set_id).delete(delete_id),
        )
}

#[derive(Debug, Deserialize, Validate)]
pub struct PreviewRequest {
    #[validate(length(min = 1, max = 2048, message = "is required"))]
    pub url: String,
    /// Overrides the stored id for this preview only.
    #[validate(custom(function = "validate_tracking_id"))]
    pub tracking_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetTrackingIdRequest {
    #[validate(custom(function = "validate_tracking_id"))]
    pub tracking_id: String,
}

/// 1 to 100 characters of `[A-Za-z0-9._-]`.
fn validate_tracking_id(value: &str) -> Result<(), ValidationError> {
    let ok = (1..=100).contains(&value.len())
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new("tracking_id")
            .with_message("must be 1 to 100 letters, digits, '.', '-' or '_'".into()))
    }
}

/// Parse a path platform. `other` has no tracking parameter and is refused.
fn parse_platform(raw: &str) -> Result<AffiliatePlatform, AppError> {
    match raw.parse::<AffiliatePlatform>() {
        Ok(AffiliatePlatform::Other) | Err(_) => {
            Err(AppError::BadRequest(format!("unsupported platform: {raw}")))
        }
        Ok(platform) => Ok(platform),
    }
}

/// Show how a link would be rewritten without saving anything.
async fn preview(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    ValidatedJson(body): ValidatedJson<PreviewRequest>,
) -> Result<Json<AffiliateLink>, AppError> {
    let link = match body.tracking_id.as_deref() {
        Some(tracking_id) => affiliate_url::rewrite(&body.url, tracking_id)?,
        None => {
            let ids = AffiliateIdRepository::new(state.pool())
                .list_for_user(current.id)
                .await?;
            affiliate_url::rewrite_for_user(&body.url, &ids)?
        }
    };
    Ok(Json(link))
}

async fn list_ids(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<Json<Vec<AffiliateId>>, AppError> {
    let ids = AffiliateIdRepository::new(state.pool())
        .list_for_user(current.id)
        .await?;
    Ok(Json(ids))
}

async fn set_id(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(platform): Path<String>,
    ValidatedJson(body): ValidatedJson<SetTrackingIdRequest>,
) -> Result<Json<AffiliateId>, AppError> {
    let platform = parse_platform(&platform)?;
    let id = AffiliateIdRepository::new(state.pool())
        .upsert(current.id, platform, &body.tracking_id)
        .await?;
    tracing::info!(user_id = %current.id, platform = %platform, "tracking id set");
    Ok(Json(id))
}

async fn delete_id(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(platform): Path<String>,
) -> Result<StatusCode, AppError> {
    let platform = parse_platform(&platform)?;
    AffiliateIdRepository::new(state.pool())
        .delete(current.id, platform)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
