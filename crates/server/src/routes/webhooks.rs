//! Identity provider webhook receiver.
//!
//! Deliveries are verified against the raw body before anything is parsed.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};

use crate::db::UserRepository;
use crate::error::AppError;
use crate::services::webhook::{self, WebhookHeaders};
use crate::services::{IdentityEvent, WebhookError};
use crate::state::AppState;

/// Build the webhooks router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/webhooks/identity", post(identity))
}

async fn identity(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let verifier = state.webhook().ok_or(WebhookError::NotConfigured)?;
    let delivery = WebhookHeaders::from_headers(&headers)?;
    verifier.verify(&delivery, &body)?;

    let users = UserRepository::new(state.pool());
    match webhook::parse_event(&body)? {
        IdentityEvent::Upsert(profile) => {
            let user = users.upsert_external(&profile).await?;
            tracing::info!(
                user_id = %user.id,
                external_id = %profile.external_id,
                webhook_id = %delivery.id,
                "identity user synced"
            );
        }
        IdentityEvent::Deleted { external_id } => {
            let deleted = users.soft_delete_by_external_id(&external_id).await?;
            tracing::info!(external_id = %external_id, deleted, "identity user deleted");
        }
        IdentityEvent::Ignored { event_type } => {
            tracing::debug!(event_type = %event_type, "identity event ignored");
        }
    }

    Ok(StatusCode::NO_CONTENT)
}
