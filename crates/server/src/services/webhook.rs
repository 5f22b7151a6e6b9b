//! Identity provider webhooks.
//!
//! Payloads are signed with the Standard Webhooks scheme (as used by svix):
//! `base64(HMAC-SHA256(secret, "{id}.{timestamp}.{body}"))`, delivered as a
//! space-separated list of `v1,<signature>` entries. Both the `webhook-*` and
//! `svix-*` header names are accepted.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::HeaderMap;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use showcase_core::Email;

use crate::models::ExternalProfile;

/// Replay window in seconds.
pub const TOLERANCE_SECS: i64 = 300;

const SECRET_PREFIX: &str = "whsec_";

/// Errors from webhook verification and parsing.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook secret is not configured")]
    NotConfigured,
    #[error("webhook secret is malformed")]
    InvalidSecret,
    #[error("missing header: {0}")]
    MissingHeader(&'static str),
    #[error("invalid timestamp")]
    InvalidTimestamp,
    #[error("timestamp outside tolerance")]
    Expired,
    #[error("signature mismatch")]
    InvalidSignature,
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl WebhookError {
    /// Whether the failure means the sender could not be authenticated.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature | Self::Expired | Self::InvalidTimestamp
        )
    }
}

/// The three signing headers of a delivery.
#[derive(Debug, Clone)]
pub struct WebhookHeaders {
    pub id: String,
    pub timestamp: String,
    pub signature: String,
}

impl WebhookHeaders {
    /// Read signing headers, preferring `webhook-*` over `svix-*`.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::MissingHeader` naming the first absent header.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, WebhookError> {
        let get = |primary: &'static str, fallback: &'static str| {
            headers
                .get(primary)
                .or_else(|| headers.get(fallback))
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
                .ok_or(WebhookError::MissingHeader(primary))
        };

        Ok(Self {
            id: get("webhook-id", "svix-id")?,
            timestamp: get("webhook-timestamp", "svix-timestamp")?,
            signature: get("webhook-signature", "svix-signature")?,
        })
    }
}

/// Verifies deliveries against the shared `whsec_` secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    key: Vec<u8>,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WebhookVerifier([REDACTED])")
    }
}

impl WebhookVerifier {
    /// Decode a `whsec_<base64>` secret.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::InvalidSecret` if the secret is not valid base64.
    pub fn new(secret: &SecretString) -> Result<Self, WebhookError> {
        let raw = secret.expose_secret();
        let encoded = raw.strip_prefix(SECRET_PREFIX).unwrap_or(raw);
        let key = STANDARD
            .decode(encoded)
            .map_err(|_| WebhookError::InvalidSecret)?;
        if key.is_empty() {
            return Err(WebhookError::InvalidSecret);
        }
        Ok(Self { key })
    }

    /// Verify a delivery against the current time.
    ///
    /// # Errors
    ///
    /// See [`Self::verify_at`].
    pub fn verify(&self, headers: &WebhookHeaders, body: &[u8]) -> Result<(), WebhookError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| WebhookError::InvalidTimestamp)?
            .as_secs();
        self.verify_at(headers, body, i64::try_from(now).unwrap_or(i64::MAX))
    }

    /// Verify a delivery as of `now` (unix seconds).
    ///
    /// # Errors
    ///
    /// Returns `InvalidTimestamp` or `Expired` for a bad or stale timestamp and
    /// `InvalidSignature` when no `v1` signature matches.
    pub fn verify_at(
        &self,
        headers: &WebhookHeaders,
        body: &[u8],
        now: i64,
    ) -> Result<(), WebhookError> {
        let ts: i64 = headers
            .timestamp
            .trim()
            .parse()
            .map_err(|_| WebhookError::InvalidTimestamp)?;

        if now.abs_diff(ts) > TOLERANCE_SECS.unsigned_abs() {
            return Err(WebhookError::Expired);
        }

        let expected = self.sign(&headers.id, &headers.timestamp, body)?;

        let matched = headers
            .signature
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == "v1")
            .any(|(_, sig)| constant_time_compare(sig, &expected));

        if matched {
            Ok(())
        } else {
            Err(WebhookError::InvalidSignature)
        }
    }

    /// Compute the base64 signature for a delivery.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::InvalidSecret` if the HMAC rejects the key.
    pub fn sign(&self, id: &str, timestamp: &str, body: &[u8]) -> Result<String, WebhookError> {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(&self.key).map_err(|_| WebhookError::InvalidSecret)?;
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

/// Constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

// =============================================================================
// Events
// =============================================================================

/// What a delivery asks us to do.
#[derive(Debug, Clone)]
pub enum IdentityEvent {
    /// `user.created` / `user.updated`.
    Upsert(ExternalProfile),
    /// `user.deleted`.
    Deleted { external_id: String },
    /// Any other event type; acknowledged and ignored.
    Ignored { event_type: String },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    event_type: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct UserData {
    id: String,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
    primary_email_address_id: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    username: Option<String>,
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmailAddress {
    id: String,
    email_address: String,
}

#[derive(Debug, Deserialize)]
struct DeletedData {
    id: Option<String>,
}

impl UserData {
    fn primary_email(&self) -> Option<&str> {
        self.primary_email_address_id
            .as_deref()
            .and_then(|primary| self.email_addresses.iter().find(|e| e.id == primary))
            .or_else(|| self.email_addresses.first())
            .map(|e| e.email_address.as_str())
    }

    fn display_name(&self) -> Option<String> {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if full.is_empty() {
            self.username
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        } else {
            Some(full)
        }
    }
}

/// Parse a verified delivery body.
///
/// # Errors
///
/// Returns `WebhookError::InvalidPayload` when the JSON does not match the
/// event type, or a user event has no usable email address.
pub fn parse_event(body: &[u8]) -> Result<IdentityEvent, WebhookError> {
    let envelope: Envelope =
        serde_json::from_slice(body).map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

    match envelope.event_type.as_str() {
        "user.created" | "user.updated" => {
            let data: UserData = serde_json::from_value(envelope.data)
                .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

            let email = data
                .primary_email()
                .ok_or_else(|| WebhookError::InvalidPayload("user has no email address".into()))
                .and_then(|raw| {
                    Email::parse(raw).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
                })?;

            Ok(IdentityEvent::Upsert(ExternalProfile {
                display_name: data.display_name(),
                avatar_url: data.image_url.filter(|s| !s.is_empty()),
                external_id: data.id,
                email,
            }))
        }
        "user.deleted" => {
            let data: DeletedData = serde_json::from_value(envelope.data)
                .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;
            let external_id = data
                .id
                .ok_or_else(|| WebhookError::InvalidPayload("deleted user has no id".into()))?;
            Ok(IdentityEvent::Deleted { external_id })
        }
        other => Ok(IdentityEvent::Ignored {
            event_type: other.to_owned(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(&SecretString::from(SECRET)).unwrap()
    }

    fn signed(body: &[u8], ts: i64) -> WebhookHeaders {
        let timestamp = ts.to_string();
        let sig = verifier().sign("msg_123", &timestamp, body).unwrap();
        WebhookHeaders {
            id: "msg_123".into(),
            timestamp,
            signature: format!("v1,{sig}"),
        }
    }

    #[test]
    fn test_valid_signature_accepted() {
        let body = br#"{"type":"user.created"}"#;
        let headers = signed(body, 1_700_000_000);
        assert!(verifier().verify_at(&headers, body, 1_700_000_010).is_ok());
    }

    #[test]
    fn test_any_matching_signature_in_list_is_enough() {
        let body = b"{}";
        let mut headers = signed(body, 1_700_000_000);
        headers.signature = format!("v1,bm90LWl0 v2,ignored {}", headers.signature);
        assert!(verifier().verify_at(&headers, body, 1_700_000_000).is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let headers = signed(b"{\"a\":1}", 1_700_000_000);
        let result = verifier().verify_at(&headers, b"{\"a\":2}", 1_700_000_000);
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let body = b"{}";
        let headers = signed(body, 1_700_000_000);
        let result = verifier().verify_at(&headers, body, 1_700_000_000 + TOLERANCE_SECS + 1);
        assert!(matches!(result, Err(WebhookError::Expired)));

        let mut bad = headers;
        bad.timestamp = "yesterday".into();
        assert!(matches!(
            verifier().verify_at(&bad, body, 0),
            Err(WebhookError::InvalidTimestamp)
        ));
    }

    #[test]
    fn test_extreme_timestamps_expire() {
        let body = b"{}";
        for ts in [i64::MIN, i64::MAX] {
            let headers = signed(body, ts);
            assert!(matches!(
                verifier().verify_at(&headers, body, 1_700_000_000),
                Err(WebhookError::Expired)
            ));
        }
        let headers = signed(body, 0);
        assert!(matches!(
            verifier().verify_at(&headers, body, i64::MIN),
            Err(WebhookError::Expired)
        ));
    }

    #[test]
    fn test_headers_fall_back_to_svix_names() {
        let mut map = HeaderMap::new();
        map.insert("svix-id", "msg_1".parse().unwrap());
        map.insert("svix-timestamp", "1700000000".parse().unwrap());
        map.insert("webhook-signature", "v1,abc".parse().unwrap());

        let headers = WebhookHeaders::from_headers(&map).unwrap();
        assert_eq!(headers.id, "msg_1");
        assert_eq!(headers.signature, "v1,abc");

        map.remove("webhook-signature");
        assert!(matches!(
            WebhookHeaders::from_headers(&map),
            Err(WebhookError::MissingHeader("webhook-signature"))
        ));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_parse_user_created_uses_primary_email() {
        let body = br#"{
            "type": "user.created",
            "data": {
                "id": "user_2abc",
                "email_addresses": [
                    {"id": "idn_1", "email_address": "old@example.com"},
                    {"id": "idn_2", "email_address": "Primary@Example.com"}
                ],
                "primary_email_address_id": "idn_2",
                "first_name": "Ada",
                "last_name": "Lovelace",
                "username": "ada",
                "image_url": "https://img.example.com/ada.png"
            }
        }"#;

        let IdentityEvent::Upsert(profile) = parse_event(body).unwrap() else {
            panic!("expected upsert");
        };
        assert_eq!(profile.external_id, "user_2abc");
        assert_eq!(profile.email.as_str(), "primary@example.com");
        assert_eq!(profile.display_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(
            profile.avatar_url.as_deref(),
            Some("https://img.example.com/ada.png")
        );
    }

    #[test]
    fn test_parse_display_name_falls_back_to_username() {
        let body = br#"{"type":"user.updated","data":{"id":"u1",
            "email_addresses":[{"id":"e","email_address":"a@b.co"}],
            "first_name":null,"last_name":"","username":"shopper"}}"#;
        let IdentityEvent::Upsert(profile) = parse_event(body).unwrap() else {
            panic!("expected upsert");
        };
        assert_eq!(profile.display_name.as_deref(), Some("shopper"));
    }

    #[test]
    fn test_parse_deleted_and_unknown() {
        let deleted = parse_event(br#"{"type":"user.deleted","data":{"id":"user_9","deleted":true}}"#)
            .unwrap();
        assert!(matches!(deleted, IdentityEvent::Deleted { external_id } if external_id == "user_9"));

        let other = parse_event(br#"{"type":"session.created","data":{}}"#).unwrap();
        assert!(matches!(other, IdentityEvent::Ignored { event_type } if event_type == "session.created"));
    }

    #[test]
    fn test_parse_rejects_user_without_email() {
        let body = br#"{"type":"user.created","data":{"id":"u1","email_addresses":[]}}"#;
        assert!(matches!(
            parse_event(body),
            Err(WebhookError::InvalidPayload(_))
        ));
    }
}
