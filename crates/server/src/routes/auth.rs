//! Authentication route handlers.
//!
//! Browser clients log in with a cookie session; API clients exchange the
//! same credentials for a bearer token at `/api/auth/token`.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use validator::Validate;

use crate::db::UserRepository;
use crate::error::AppError;
use crate::middleware::{RequireUser, ValidatedJson, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::IssuedToken;
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/token", post(token))
        .route("/api/auth/me", get(me))
}

// =============================================================================
// Request Types
// =============================================================================

/// Registration body.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "must be between 8 and 128 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub display_name: Option<String>,
}

/// Login and token exchange body.
#[derive(Debug, Deserialize, Validate)]
pub struct CredentialsRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a password account.
async fn register(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = AuthService::new(state.pool())
        .register_with_password(&body.email, &body.password, body.display_name.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Verify credentials and start a session.
async fn login(
    State(state): State<AppState>,
    session: Session,
    ValidatedJson(body): ValidatedJson<CredentialsRequest>,
) -> Result<Json<User>, AppError> {
    let user = AuthService::new(state.pool())
        .login_with_password(&body.email, &body.password)
        .await?;

    set_current_user(&session, &CurrentUser::from(&user)).await?;
    tracing::info!(user_id = %user.id, "session started");

    Ok(Json(user))
}

/// End the session. Succeeds even when nobody was logged in.
async fn logout(session: Session) -> Result<StatusCode, AppError> {
    clear_current_user(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Verify credentials and issue a bearer token.
async fn token(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<CredentialsRequest>,
) -> Result<Json<IssuedToken>, AppError> {
    let user = AuthService::new(state.pool())
        .login_with_password(&body.email, &body.password)
        .await?;

    Ok(Json(state.jwt().issue(&user)?))
}

/// The authenticated user's account.
async fn me(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<Json<User>, AppError> {
    let user = UserRepository::new(state.pool())
        .get_by_id(current.id)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    Ok(Json(user))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn register_request_rules() {
        let ok = RegisterRequest {
            email: "maker@example.com".to_string(),
            password: "long enough".to_string(),
            display_name: Some("Maker".to_string()),
        };
        assert!(ok.validate().is_ok());

        let bad = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            display_name: Some(String::new()),
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("display_name"));
    }

    #[test]
    fn credentials_require_both_fields() {
        let req = CredentialsRequest {
            email: String::new(),
            password: "x".to_string(),
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
        assert!(!errors.field_errors().contains_key("password"));
    }
}
