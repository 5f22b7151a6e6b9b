//! User account handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use tower_sessions::Session;
use validator::Validate;

use showcase_core::{UserId, UserRole};

use crate::db::UserRepository;
use crate::error::AppError;
use crate::middleware::{RequireAdmin, RequireUser, ValidatedJson, clear_current_user};
use crate::models::{CurrentUser, PageParams, Paginated, ProfileUpdate, User};
use crate::state::AppState;

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users))
        .route(
            "/api/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
}

/// Profile update body. Omitted fields are left alone; an empty string
/// clears an optional field.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(max = 100, message = "must be at most 100 characters"))]
    pub display_name: Option<String>,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub bio: Option<String>,
    #[validate(custom(function = "validate_optional_url"))]
    pub avatar_url: Option<String>,
    /// Only admins may change roles.
    pub role: Option<UserRole>,
}

/// Accepts empty (clear) or an absolute http(s) URL.
pub(crate) fn validate_optional_url(value: &str) -> Result<(), validator::ValidationError> {
    if value.is_empty() {
        return Ok(());
    }
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(validator::ValidationError::new("url")
            .with_message("must be an http(s) URL".into())),
    }
}

fn ensure_self_or_admin(current: &CurrentUser, id: UserId) -> Result<(), AppError> {
    if current.can_manage(id) {
        Ok(())
    } else {
        Err(AppError::Forbidden("not your account".to_string()))
    }
}

/// List every live account.
async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<PageParams>,
) -> Result<Json<Paginated<User>>, AppError> {
    let page = params.validate()?;
    let (users, total) = UserRepository::new(state.pool()).list(page).await?;
    Ok(Json(Paginated::new(users, page, total)))
}

async fn get_user(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<UserId>,
) -> Result<Json<User>, AppError> {
    ensure_self_or_admin(&current, id)?;
    let user = UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("user".to_string()))?;
    Ok(Json(user))
}

async fn update_user(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<UserId>,
    ValidatedJson(body): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    ensure_self_or_admin(&current, id)?;
    if body.role.is_some() && !current.role.is_admin() {
        return Err(AppError::Forbidden("only admins can change roles".to_string()));
    }

    let users = UserRepository::new(state.pool());
    let update = ProfileUpdate {
        display_name: body.display_name.map(|s| s.trim().to_string()),
        bio: body.bio,
        avatar_url: body.avatar_url,
    };
    let mut user = users.update_profile(id, &update).await?;

    if let Some(role) = body.role
        && role != user.role
    {
        user = users.set_role(id, role).await?;
        tracing::info!(user_id = %id, role = %role, changed_by = %current.id, "role changed");
    }

    Ok(Json(user))
}

/// Soft-delete an account. Deleting yourself also ends your session.
async fn delete_user(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    session: Session,
    Path(id): Path<UserId>,
) -> Result<StatusCode, AppError> {
    ensure_self_or_admin(&current, id)?;
    UserRepository::new(state.pool()).soft_delete(id).await?;
    tracing::info!(user_id = %id, deleted_by = %current.id, "user deleted");

    if current.id == id {
        clear_current_user(&session).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}
