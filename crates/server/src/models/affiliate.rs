//! Affiliate tracking id domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use showcase_core::{AffiliateIdId, AffiliatePlatform, UserId};

/// A user's tracking id on one platform (e.g. an Amazon Associates tag).
#[derive(Debug, Clone, Serialize)]
pub struct AffiliateId {
    pub id: AffiliateIdId,
    pub user_id: UserId,
    pub platform: AffiliatePlatform,
    pub tracking_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
