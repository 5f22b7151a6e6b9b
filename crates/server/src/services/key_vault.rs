//! Symmetric encryption for third-party API keys at rest.
//!
//! Envelope format: `v1:<nonce_b64>:<ciphertext_b64>`, ChaCha20-Poly1305 with
//! a random 96-bit nonce per message. Both parts use URL-safe base64 without
//! padding so the envelope never contains `:` inside a part.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, Key, KeyInit, Nonce};
use thiserror::Error;

const ENVELOPE_VERSION: &str = "v1";
const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Errors from the key vault.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VaultError {
    #[error("encryption key must be base64 encoding of {KEY_LEN} bytes")]
    InvalidKey,
    #[error("envelope is malformed")]
    MalformedEnvelope,
    #[error("unsupported envelope version: {0}")]
    UnsupportedVersion(String),
    #[error("decryption failed")]
    Decrypt,
    #[error("encryption failed")]
    Encrypt,
}

/// Holds the vault key.
#[derive(Clone)]
pub struct KeyVault {
    cipher: ChaCha20Poly1305,
}

impl std::fmt::Debug for KeyVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyVault([REDACTED])")
    }
}

impl KeyVault {
    /// Import a key from standard base64.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::InvalidKey` unless the input decodes to 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, VaultError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| VaultError::InvalidKey)?;
        if bytes.len() != KEY_LEN {
            return Err(VaultError::InvalidKey);
        }
        Ok(Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&bytes)),
        })
    }

    /// Generate a fresh random key, returned as standard base64.
    #[must_use]
    pub fn generate() -> String {
        STANDARD.encode(rand::random::<[u8; KEY_LEN]>())
    }

    /// Encrypt `plaintext` into an envelope.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Encrypt` if the AEAD rejects the input.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        let nonce_bytes = rand::random::<[u8; NONCE_LEN]>();
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| VaultError::Encrypt)?;

        Ok(format!(
            "{ENVELOPE_VERSION}:{}:{}",
            URL_SAFE_NO_PAD.encode(nonce_bytes),
            URL_SAFE_NO_PAD.encode(ciphertext)
        ))
    }

    /// Decrypt an envelope produced by [`Self::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns `VaultError::MalformedEnvelope` or `UnsupportedVersion` for
    /// bad input and `VaultError::Decrypt` when authentication fails (wrong
    /// key or tampered ciphertext).
    pub fn decrypt(&self, envelope: &str) -> Result<String, VaultError> {
        let mut parts = envelope.split(':');
        let (Some(version), Some(nonce_b64), Some(ct_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(VaultError::MalformedEnvelope);
        };

        if version != ENVELOPE_VERSION {
            return Err(VaultError::UnsupportedVersion(version.to_owned()));
        }

        let nonce = URL_SAFE_NO_PAD
            .decode(nonce_b64)
            .map_err(|_| VaultError::MalformedEnvelope)?;
        if nonce.len() != NONCE_LEN {
            return Err(VaultError::MalformedEnvelope);
        }
        let ciphertext = URL_SAFE_NO_PAD
            .decode(ct_b64)
            .map_err(|_| VaultError::MalformedEnvelope)?;

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
            .map_err(|_| VaultError::Decrypt)?;

        String::from_utf8(plaintext).map_err(|_| VaultError::Decrypt)
    }

    /// Decrypt, logging and returning an empty string on any failure.
    #[must_use]
    pub fn decrypt_or_empty(&self, envelope: &str) -> String {
        self.decrypt(envelope).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to decrypt stored api key");
            String::new()
        })
    }
}

/// Last four characters of a secret, for display.
#[must_use]
pub fn hint(plaintext: &str) -> String {
    let chars: Vec<char> = plaintext.chars().collect();
    let start = chars.len().saturating_sub(4);
    chars.get(start..).map(|c| c.iter().collect()).unwrap_or_default()
}
