//! Authentication extractors.
//!
//! A request is authenticated by either an `Authorization: Bearer` JWT or the
//! session cookie. The bearer header is checked first; a header that is
//! present but invalid rejects the request rather than falling back to the
//! session.
//!
//! Either way the identity is re-read from `showcase.user`, so deleted
//! accounts lose access and role changes apply on the next request.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tower_sessions::Session;
use tracing::Span;

use showcase_core::UserId;

use crate::db::UserRepository;
use crate::error::{AppError, set_sentry_user};
use crate::models::{CurrentUser, session_keys};
use crate::services::auth::extract_bearer;
use crate::state::AppState;

/// Extractor that requires an authenticated user.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     Json(user)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

/// Extractor that requires an admin.
pub struct RequireAdmin(pub CurrentUser);

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireUser`, anonymous requests are accepted. An invalid bearer
/// token is still rejected.
pub struct OptionalUser(pub Option<CurrentUser>);

async fn resolve(parts: &Parts, state: &AppState) -> Result<Option<CurrentUser>, AppError> {
    if let Some(header) = parts.headers.get(AUTHORIZATION) {
        let token = header
            .to_str()
            .ok()
            .and_then(extract_bearer)
            .ok_or_else(|| AppError::Unauthorized("malformed authorization header".to_string()))?;
        let claims = state.jwt().verify(token)?;
        let user = load_live(state, claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("account is no longer active".to_string()))?;
        return Ok(Some(user));
    }

    let Some(session) = parts.extensions.get::<Session>() else {
        return Ok(None);
    };

    let Some(stored) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
    else {
        return Ok(None);
    };

    let live = load_live(state, stored.id).await?;
    if live.is_none() {
        // Deleted while signed in; the session no longer identifies anyone.
        session.flush().await?;
    }
    Ok(live)
}

/// The live account behind `id`, or `None` if it was deleted.
async fn load_live(state: &AppState, id: UserId) -> Result<Option<CurrentUser>, AppError> {
    Ok(UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .map(|user| CurrentUser::from(&user)))
}

fn record_user(user: &CurrentUser) {
    Span::current().record("user_id", user.id.as_i32());
    set_sentry_user(user.id.as_i32(), Some(user.email.as_str()));
}

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = resolve(parts, state)
            .await?
            .ok_or_else(|| AppError::Unauthorized("authentication required".to_string()))?;
        record_user(&user);
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;
        if !user.role.is_admin() {
            return Err(AppError::Forbidden("admin access required".to_string()));
        }
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = resolve(parts, state).await?;
        if let Some(user) = &user {
            record_user(user);
        }
        Ok(Self(user))
    }
}

/// Helper to set the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
