//! Stored third-party API key metadata.

use chrono::{DateTime, Utc};
use serde::Serialize;

use showcase_core::{ApiKeyId, UserId};

/// A stored key as shown to its owner. The ciphertext never leaves the
/// repository layer except for decryption.
#[derive(Debug, Clone, Serialize)]
pub struct StoredApiKey {
    pub id: ApiKeyId,
    pub user_id: UserId,
    /// Provider name, e.g. `openai`.
    pub provider: String,
    /// Last four characters of the plaintext.
    pub hint: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
