//! Stored third-party API keys.
//!
//! Keys are encrypted with the server's vault before they reach the
//! database. Responses only ever include the provider and a four-character
//! hint.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::Deserialize;
use validator::Validate;

use crate::db::ApiKeyRepository;
use crate::error::AppError;
use crate::middleware::{RequireUser, ValidatedJson};
use crate::models::StoredApiKey;
use crate::services::key_vault;
use crate::state::AppState;

/// Build the API keys router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/api-keys", get(list_keys))
        .route("/api/api-keys/{provider}", put(store_key).delete(delete_key))
}

#[derive(Debug, Deserialize, Validate)]
pub struct StoreKeyRequest {
    #[validate(length(min = 8, max = 512, message = "must be 8 to 512 characters"))]
    pub api_key: String,
}

/// Provider names are short lowercase identifiers such as `openai`.
fn parse_provider(raw: &str) -> Result<String, AppError> {
    let provider = raw.trim().to_ascii_lowercase();
    let ok = (1..=32).contains(&provider.len())
        && provider
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'-' | b'_'));
    if ok {
        Ok(provider)
    } else {
        Err(AppError::BadRequest(format!("invalid provider: {raw}")))
    }
}

async fn list_keys(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<Json<Vec<StoredApiKey>>, AppError> {
    let keys = ApiKeyRepository::new(state.pool())
        .list_for_user(current.id)
        .await?;
    Ok(Json(keys))
}

async fn store_key(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(provider): Path<String>,
    ValidatedJson(body): ValidatedJson<StoreKeyRequest>,
) -> Result<Json<StoredApiKey>, AppError> {
    let provider = parse_provider(&provider)?;
    let plaintext = body.api_key.trim();
    let envelope = state.vault().encrypt(plaintext)?;

    let stored = ApiKeyRepository::new(state.pool())
        .upsert(current.id, &provider, &envelope, &key_vault::hint(plaintext))
        .await?;
    tracing::info!(user_id = %current.id, provider = %provider, "api key stored");
    Ok(Json(stored))
}

async fn delete_key(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(provider): Path<String>,
) -> Result<StatusCode, AppError> {
    let provider = parse_provider(&provider)?;
    ApiKeyRepository::new(state.pool())
        .delete(current.id, &provider)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn provider_names() {
        assert_eq!(parse_provider("OpenAI").unwrap(), "openai");
        assert_eq!(parse_provider("my_llm-2").unwrap(), "my_llm-2");
        assert!(parse_provider("").is_err());
        assert!(parse_provider("open ai").is_err());
        assert!(parse_provider(&"a".repeat(33)).is_err());
    }
}
