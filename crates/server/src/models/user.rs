//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use showcase_core::{Email, UserId, UserRole};

/// A Showcase account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    /// Identity provider subject, when the account was created by webhook.
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable profile fields. `None` leaves a field unchanged; an empty string
/// clears it.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

/// Profile data pushed by the identity provider.
#[derive(Debug, Clone)]
pub struct ExternalProfile {
    pub external_id: String,
    pub email: Email,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}
