//! Cookie consent preferences.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Consent choices per cookie category.
///
/// Strictly necessary cookies cannot be refused, so `necessary` is always
/// `true` on the way out and ignored on the way in. `updated_at` is always
/// overwritten on save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CookiePreferences {
    #[serde(default = "always_true", skip_deserializing)]
    pub necessary: bool,
    #[serde(default)]
    pub analytics: bool,
    #[serde(default)]
    pub marketing: bool,
    #[serde(default)]
    pub personalization: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

const fn always_true() -> bool {
    true
}

impl Default for CookiePreferences {
    fn default() -> Self {
        Self {
            necessary: true,
            analytics: false,
            marketing: false,
            personalization: false,
            updated_at: None,
        }
    }
}
