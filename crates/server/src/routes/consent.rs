//! Cookie consent handlers.
//!
//! Signed-in users' choices are stored in the database; guests' choices live
//! in their session until they sign in.

use axum::{Json, Router, extract::State, routing::get};
use chrono::Utc;
use tower_sessions::Session;

use crate::db::CookiePreferencesRepository;
use crate::error::AppError;
use crate::middleware::{OptionalUser, ValidatedJson};
use crate::models::{CookiePreferences, session_keys};
use crate::state::AppState;

/// Build the consent router.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/cookie-preferences",
        get(get_preferences).put(save_preferences),
    )
}

/// Current choices, or the defaults if none were made.
async fn get_preferences(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    session: Session,
) -> Result<Json<CookiePreferences>, AppError> {
    let prefs = match user {
        Some(user) => {
            CookiePreferencesRepository::new(state.pool())
                .get(user.id)
                .await?
        }
        None => session
            .get::<CookiePreferences>(session_keys::COOKIE_PREFERENCES)
            .await?,
    };
    Ok(Json(prefs.unwrap_or_default()))
}

async fn save_preferences(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    session: Session,
    ValidatedJson(mut prefs): ValidatedJson<CookiePreferences>,
) -> Result<Json<CookiePreferences>, AppError> {
    let saved = match user {
        Some(user) => {
            CookiePreferencesRepository::new(state.pool())
                .upsert(user.id, &prefs)
                .await?
        }
        None => {
            prefs.updated_at = Some(Utc::now());
            session
                .insert(session_keys::COOKIE_PREFERENCES, prefs)
                .await?;
            prefs
        }
    };
    tracing::debug!(
        analytics = saved.analytics,
        marketing = saved.marketing,
        personalization = saved.personalization,
        "cookie preferences saved"
    );
    Ok(Json(saved))
}
