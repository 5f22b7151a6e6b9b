//! Affiliate platforms recognised by the link rewriter.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A retailer with an affiliate programme.
///
/// `Other` covers every host the rewriter does not know; links on those hosts
/// are stored as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "showcase.affiliate_platform", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AffiliatePlatform {
    Amazon,
    Ebay,
    Walmart,
    Target,
    Etsy,
    Aliexpress,
    Bestbuy,
    Other,
}

/// Hostname needles, checked in order. The first match wins.
const HOST_NEEDLES: &[(&str, AffiliatePlatform)] = &[
    ("amazon.", AffiliatePlatform::Amazon),
    ("amzn.", AffiliatePlatform::Amazon),
    ("ebay.", AffiliatePlatform::Ebay),
    ("walmart.", AffiliatePlatform::Walmart),
    ("target.com", AffiliatePlatform::Target),
    ("etsy.com", AffiliatePlatform::Etsy),
    ("aliexpress.", AffiliatePlatform::Aliexpress),
    ("bestbuy.", AffiliatePlatform::Bestbuy),
];

impl AffiliatePlatform {
    /// Every platform that can carry a tracking id (excludes `Other`).
    pub const TRACKABLE: [Self; 7] = [
        Self::Amazon,
        Self::Ebay,
        Self::Walmart,
        Self::Target,
        Self::Etsy,
        Self::Aliexpress,
        Self::Bestbuy,
    ];

    /// Detect the platform from a hostname by substring match.
    ///
    /// ```
    /// use showcase_core::AffiliatePlatform;
    ///
    /// assert_eq!(AffiliatePlatform::detect("www.amazon.co.uk"), AffiliatePlatform::Amazon);
    /// assert_eq!(AffiliatePlatform::detect("amzn.to"), AffiliatePlatform::Amazon);
    /// assert_eq!(AffiliatePlatform::detect("example.com"), AffiliatePlatform::Other);
    /// ```
    #[must_use]
    pub fn detect(host: &str) -> Self {
        let host = host.to_ascii_lowercase();
        HOST_NEEDLES
            .iter()
            .find(|(needle, _)| host.contains(needle))
            .map_or(Self::Other, |(_, platform)| *platform)
    }

    /// Snake-case identifier used in URLs and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Amazon => "amazon",
            Self::Ebay => "ebay",
            Self::Walmart => "walmart",
            Self::Target => "target",
            Self::Etsy => "etsy",
            Self::Aliexpress => "aliexpress",
            Self::Bestbuy => "bestbuy",
            Self::Other => "other",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Amazon => "Amazon",
            Self::Ebay => "eBay",
            Self::Walmart => "Walmart",
            Self::Target => "Target",
            Self::Etsy => "Etsy",
            Self::Aliexpress => "AliExpress",
            Self::Bestbuy => "Best Buy",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for AffiliatePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a platform name is not recognised.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown affiliate platform: {0}")]
pub struct ParsePlatformError(pub String);

impl FromStr for AffiliatePlatform {
    type Err = ParsePlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "amazon" => Ok(Self::Amazon),
            "ebay" => Ok(Self::Ebay),
            "walmart" => Ok(Self::Walmart),
            "target" => Ok(Self::Target),
            "etsy" => Ok(Self::Etsy),
            "aliexpress" => Ok(Self::Aliexpress),
            "bestbuy" | "best_buy" => Ok(Self::Bestbuy),
            "other" => Ok(Self::Other),
            other => Err(ParsePlatformError(other.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn detect_matches_regional_hosts() {
        assert_eq!(AffiliatePlatform::detect("smile.amazon.de"), AffiliatePlatform::Amazon);
        assert_eq!(AffiliatePlatform::detect("www.ebay.com.au"), AffiliatePlatform::Ebay);
        assert_eq!(AffiliatePlatform::detect("WWW.WALMART.CA"), AffiliatePlatform::Walmart);
        assert_eq!(AffiliatePlatform::detect("www.target.com"), AffiliatePlatform::Target);
        assert_eq!(AffiliatePlatform::detect("www.etsy.com"), AffiliatePlatform::Etsy);
        assert_eq!(
            AffiliatePlatform::detect("m.aliexpress.us"),
            AffiliatePlatform::Aliexpress
        );
        assert_eq!(AffiliatePlatform::detect("www.bestbuy.com"), AffiliatePlatform::Bestbuy);
    }

    #[test]
    fn detect_falls_back_to_other() {
        assert_eq!(AffiliatePlatform::detect("shop.example.org"), AffiliatePlatform::Other);
        assert_eq!(AffiliatePlatform::detect(""), AffiliatePlatform::Other);
    }

    #[test]
    fn round_trips_through_str() {
        for platform in AffiliatePlatform::TRACKABLE {
            assert_eq!(platform.as_str().parse::<AffiliatePlatform>().unwrap(), platform);
        }
        assert!("myspace".parse::<AffiliatePlatform>().is_err());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&AffiliatePlatform::Aliexpress).unwrap();
        assert_eq!(json, "\"aliexpress\"");
    }
}
