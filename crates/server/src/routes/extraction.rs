//! Product extraction endpoint.

use axum::{Json, Router, extract::State, routing::post};
use secrecy::ExposeSecret;
use serde::Deserialize;
use validator::Validate;

use showcase_core::UserId;

use crate::db::ApiKeyRepository;
use crate::error::AppError;
use crate::middleware::{RequireUser, ValidatedJson};
use crate::services::ExtractedProduct;
use crate::state::AppState;

/// Provider name under which users store their LLM key.
pub const LLM_PROVIDER: &str = "openai";

/// Build the extraction router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/extract", post(extract))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ExtractRequest {
    #[validate(length(min = 1, max = 2048, message = "is required"))]
    pub url: String,
}

/// Take one unit of the caller's extraction budget.
pub(crate) fn check_extraction_budget(state: &AppState, user_id: UserId) -> Result<(), AppError> {
    if state.extraction_limiter().check(user_id) {
        Ok(())
    } else {
        Err(AppError::RateLimited)
    }
}

/// The LLM key to use for `user_id`: their own stored key if it decrypts,
/// otherwise the server-wide key, otherwise none (metadata only).
pub(crate) async fn resolve_api_key(
    state: &AppState,
    user_id: UserId,
) -> Result<Option<String>, AppError> {
    let stored = ApiKeyRepository::new(state.pool())
        .get_ciphertext(user_id, LLM_PROVIDER)
        .await?
        .map(|envelope| state.vault().decrypt_or_empty(&envelope))
        .filter(|key| !key.is_empty());

    Ok(stored.or_else(|| {
        state
            .config()
            .extraction
            .openai_api_key
            .as_ref()
            .map(|key| key.expose_secret().to_string())
    }))
}

/// Fetch a retailer page and return what could be recovered from it.
async fn extract(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    ValidatedJson(body): ValidatedJson<ExtractRequest>,
) -> Result<Json<ExtractedProduct>, AppError> {
    check_extraction_budget(&state, current.id)?;
    let api_key = resolve_api_key(&state, current.id).await?;

    let product = state
        .extractor()
        .extract(&body.url, api_key.as_deref())
        .await?;
    Ok(Json(product))
}
