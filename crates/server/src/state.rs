//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::services::{
    ExtractionError, ExtractionLimiter, JwtService, KeyVault, ProductExtractor, VaultError,
    WebhookError, WebhookVerifier,
};

/// Error building application state from configuration.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("encryption key: {0}")]
    Vault(#[from] VaultError),
    #[error("extraction client: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("identity webhook secret: {0}")]
    Webhook(#[from] WebhookError),
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    jwt: JwtService,
    vault: KeyVault,
    extractor: ProductExtractor,
    extraction_limiter: ExtractionLimiter,
    webhook: Option<WebhookVerifier>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the encryption key or webhook secret is malformed,
    /// or the extraction HTTP client cannot be built.
    pub fn new(config: ServerConfig, pool: PgPool) -> Result<Self, StateError> {
        let jwt = JwtService::new(&config.jwt);
        let vault = KeyVault::from_base64(config.encryption_key.expose_secret())?;
        let extractor = ProductExtractor::new(&config.extraction)?;
        let extraction_limiter = ExtractionLimiter::new(config.extraction.rate_per_minute);
        let webhook = config
            .identity_webhook_secret
            .as_ref()
            .map(WebhookVerifier::new)
            .transpose()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                jwt,
                vault,
                extractor,
                extraction_limiter,
                webhook,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn jwt(&self) -> &JwtService {
        &self.inner.jwt
    }

    #[must_use]
    pub fn vault(&self) -> &KeyVault {
        &self.inner.vault
    }

    #[must_use]
    pub fn extractor(&self) -> &ProductExtractor {
        &self.inner.extractor
    }

    #[must_use]
    pub fn extraction_limiter(&self) -> &ExtractionLimiter {
        &self.inner.extraction_limiter
    }

    /// Webhook verifier, if `IDENTITY_WEBHOOK_SECRET` is configured.
    #[must_use]
    pub fn webhook(&self) -> Option<&WebhookVerifier> {
        self.inner.webhook.as_ref()
    }
}
