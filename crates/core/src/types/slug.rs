//! URL slug type for public storefront addresses.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Slug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// Shorter than [`Slug::MIN_LENGTH`].
    #[error("slug must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// Longer than [`Slug::MAX_LENGTH`].
    #[error("slug must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// Contains something other than lowercase ASCII letters, digits, or hyphens.
    #[error("slug may only contain lowercase letters, digits, and hyphens")]
    InvalidCharacter,
    /// Starts or ends with a hyphen, or contains `--`.
    #[error("slug cannot start or end with a hyphen or contain consecutive hyphens")]
    MisplacedHyphen,
}

/// A storefront slug, e.g. `jane-does-desk-setup`.
///
/// Slugs appear in public URLs (`/api/public/stores/{slug}`) and are unique
/// among live stores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Minimum slug length.
    pub const MIN_LENGTH: usize = 3;
    /// Maximum slug length.
    pub const MAX_LENGTH: usize = 64;

    /// Parse a slug, rejecting anything that is not already canonical.
    ///
    /// # Errors
    ///
    /// Returns a [`SlugError`] describing the first violated constraint.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.len() < Self::MIN_LENGTH {
            return Err(SlugError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(SlugError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        {
            return Err(SlugError::InvalidCharacter);
        }
        if s.starts_with('-') || s.ends_with('-') || s.contains("--") {
            return Err(SlugError::MisplacedHyphen);
        }
        Ok(Self(s.to_owned()))
    }

    /// Derive a slug from a free-form display name.
    ///
    /// Non-alphanumeric runs collapse into a single hyphen and the result is
    /// truncated to [`Slug::MAX_LENGTH`].
    ///
    /// # Errors
    ///
    /// Returns [`SlugError::TooShort`] when the name has fewer than three
    /// usable characters.
    ///
    /// ```
    /// use showcase_core::Slug;
    ///
    /// let slug = Slug::from_name("Jane's Desk Setup (2026)!").unwrap();
    /// assert_eq!(slug.as_str(), "jane-s-desk-setup-2026");
    /// ```
    pub fn from_name(name: &str) -> Result<Self, SlugError> {
        let mut out = String::with_capacity(name.len());
        for c in name.chars() {
            if c.is_ascii_alphanumeric() {
                out.push(c.to_ascii_lowercase());
            } else if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
        }
        out.truncate(Self::MAX_LENGTH);
        while out.ends_with('-') {
            out.pop();
        }
        Self::parse(&out)
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_canonical_slugs() {
        assert!(Slug::parse("abc").is_ok());
        assert!(Slug::parse("my-store-2026").is_ok());
    }

    #[test]
    fn parse_rejects_non_canonical_input() {
        assert_eq!(Slug::parse("ab"), Err(SlugError::TooShort { min: 3 }));
        assert_eq!(Slug::parse("My-Store"), Err(SlugError::InvalidCharacter));
        assert_eq!(Slug::parse("my store"), Err(SlugError::InvalidCharacter));
        assert_eq!(Slug::parse("-store"), Err(SlugError::MisplacedHyphen));
        assert_eq!(Slug::parse("store-"), Err(SlugError::MisplacedHyphen));
        assert_eq!(Slug::parse("my--store"), Err(SlugError::MisplacedHyphen));
        assert_eq!(
            Slug::parse(&"a".repeat(65)),
            Err(SlugError::TooLong { max: 64 })
        );
    }

    #[test]
    fn from_name_collapses_punctuation() {
        assert_eq!(
            Slug::from_name("  Best Picks -- Kitchen  ").unwrap().as_str(),
            "best-picks-kitchen"
        );
    }

    #[test]
    fn from_name_truncates_without_trailing_hyphen() {
        let name = format!("{} tail", "x".repeat(63));
        let slug = Slug::from_name(&name).unwrap();
        assert_eq!(slug.as_str().len(), 63);
        assert!(!slug.as_str().ends_with('-'));
    }

    #[test]
    fn from_name_rejects_names_without_enough_letters() {
        assert!(Slug::from_name("!!").is_err());
        assert!(Slug::from_name("é").is_err());
    }
}
