//! Unified error handling for the API.
//!
//! Every handler returns `Result<_, AppError>`. Responses carry a JSON body
//! `{"error": "..."}`; validation failures add a `details` map of field to
//! messages. Server-side failures are logged and sent to Sentry, and their
//! internals are replaced with a generic message.

use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::pagination::PageError;
use crate::services::{
    AffiliateUrlError, AuthError, ExtractionError, VaultError, WebhookError,
};

/// Field name to validation messages.
pub type ValidationDetails = BTreeMap<String, Vec<String>>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Product extraction failed.
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Stored key could not be encrypted or decrypted.
    #[error("Key vault error: {0}")]
    Vault(#[from] VaultError),

    /// Webhook delivery rejected.
    #[error("Webhook error: {0}")]
    Webhook(#[from] WebhookError),

    /// Link could not be rewritten.
    #[error("Affiliate link error: {0}")]
    AffiliateUrl(#[from] AffiliateUrlError),

    /// Request body or query failed validation.
    #[error("Validation failed")]
    Validation(ValidationDetails),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with existing data.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Per-user budget exhausted.
    #[error("Too many requests")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

const INTERNAL: &str = "internal server error";

impl AppError {
    /// Status code and client-facing message.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Database(e) => repository_status(e),
            Self::Auth(e) => match e {
                AuthError::InvalidEmail(_) | AuthError::WeakPassword(_) => {
                    (StatusCode::BAD_REQUEST, e.to_string())
                }
                AuthError::InvalidCredentials
                | AuthError::TokenExpired
                | AuthError::InvalidToken
                | AuthError::UserNotFound => (StatusCode::UNAUTHORIZED, e.to_string()),
                AuthError::UserAlreadyExists => (StatusCode::CONFLICT, e.to_string()),
                AuthError::Repository(inner) => repository_status(inner),
                AuthError::TokenSigning(_) | AuthError::PasswordHash => {
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
                }
            },
            Self::Extraction(e) => match e {
                ExtractionError::InvalidUrl(_) | ExtractionError::BatchSize { .. } => {
                    (StatusCode::BAD_REQUEST, e.to_string())
                }
                _ => (StatusCode::BAD_GATEWAY, e.to_string()),
            },
            Self::Vault(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string()),
            Self::Webhook(e) => match e {
                _ if e.is_unauthorized() => (StatusCode::UNAUTHORIZED, e.to_string()),
                WebhookError::MissingHeader(_) | WebhookError::InvalidPayload(_) => {
                    (StatusCode::BAD_REQUEST, e.to_string())
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string()),
            },
            Self::AffiliateUrl(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "validation failed".to_string()),
            Self::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "too many requests".to_string()),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string()),
        }
    }

    /// Status code this error renders with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status_and_message().0
    }
}

fn repository_status(err: &RepositoryError) -> (StatusCode, String) {
    match err {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
        RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status == StatusCode::BAD_GATEWAY {
            tracing::warn!(error = %self, "Upstream error");
        } else if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = match self {
            Self::Validation(details) => json!({ "error": message, "details": details }),
            _ => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map_or_else(|| e.code.to_string(), ToString::to_string)
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        Self::Validation(details)
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session: {err}"))
    }
}

impl From<PageError> for AppError {
    fn from(err: PageError) -> Self {
        let field = match err {
            PageError::Page => "page",
            PageError::PerPage => "per_page",
        };
        Self::Validation(BTreeMap::from([(field.to_string(), vec![err.to_string()])]))
    }
}

/// Single-field validation failure.
#[must_use]
pub fn field_error(field: &str, message: impl Into<String>) -> AppError {
    AppError::Validation(BTreeMap::from([(field.to_string(), vec![message.into()])]))
}

/// Set the Sentry user context for the current request.
pub fn set_sentry_user(user_id: i32, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use validator::Validate;

    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::Database(RepositoryError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Database(RepositoryError::Conflict("slug already taken".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Auth(AuthError::UserAlreadyExists).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Auth(AuthError::TokenExpired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Extraction(ExtractionError::UpstreamStatus(503)).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Extraction(ExtractionError::InvalidUrl("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Webhook(WebhookError::InvalidSignature).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            AppError::Forbidden("nope".into()).status(),
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, body) = body_json(AppError::Database(RepositoryError::DataCorruption(
            "bad currency in row 7".into(),
        )))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "internal server error" }));
    }

    #[derive(Validate)]
    struct NameField {
        #[validate(length(min = 3, message = "name too short"))]
        name: String,
    }

    #[tokio::test]
    async fn test_validation_details_rendered() {
        let err: AppError = NameField { name: "ab".into() }.validate().unwrap_err().into();
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation failed");
        assert_eq!(body["details"]["name"], json!(["name too short"]));
    }

    #[tokio::test]
    async fn test_page_error_becomes_field_detail() {
        let (_, body) = body_json(PageError::PerPage.into()).await;
        assert_eq!(body["details"]["per_page"][0], "per_page must be between 1 and 100");
    }
}
