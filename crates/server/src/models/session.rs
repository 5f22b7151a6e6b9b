//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use showcase_core::{Email, UserId, UserRole};

use super::user::User;

/// Session-stored (or token-derived) user identity.
///
/// What the session or token carries. The auth extractors replace it with
/// the live row before handlers see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Role; current as of the request once it has passed an extractor.
    pub role: UserRole,
}

impl CurrentUser {
    /// Whether this user may act on a row owned by `owner`.
    #[must_use]
    pub fn can_manage(&self, owner: UserId) -> bool {
        self.id == owner || self.role.is_admin()
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for a guest's cookie consent choices.
    pub const COOKIE_PREFERENCES: &str = "cookie_preferences";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(id: i32, role: UserRole) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            email: Email::parse("someone@example.com").unwrap(),
            role,
        }
    }

    #[test]
    fn owners_and_admins_can_manage() {
        let owner = UserId::new(1);
        assert!(user(1, UserRole::User).can_manage(owner));
        assert!(user(2, UserRole::Admin).can_manage(owner));
        assert!(!user(2, UserRole::User).can_manage(owner));
    }
}
