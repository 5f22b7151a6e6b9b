//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOWCASE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `SHOWCASE_BASE_URL` - Public URL of the API (used for cookie security and redirects)
//! - `SHOWCASE_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `SHOWCASE_JWT_SECRET` - HS256 signing secret for bearer tokens (min 32 chars, high entropy)
//! - `SHOWCASE_ENCRYPTION_KEY` - Base64 encoded 32-byte key for stored API keys
//!
//! ## Optional
//! - `SHOWCASE_HOST` - Bind address (default: 127.0.0.1)
//! - `SHOWCASE_PORT` - Listen port (default: 3000)
//! - `SHOWCASE_JWT_TTL_HOURS` - Bearer token lifetime (default: 24)
//! - `SHOWCASE_CORS_ORIGINS` - Comma-separated list of allowed browser origins
//! - `IDENTITY_WEBHOOK_SECRET` - `whsec_` secret for identity provider webhooks
//! - `OPENAI_API_KEY` - Server-wide fallback key for LLM extraction
//! - `OPENAI_MODEL` - Chat model used for extraction (default: gpt-4o-mini)
//! - `EXTRACTION_TIMEOUT_SECS` - Page fetch timeout (default: 15)
//! - `EXTRACTION_RATE_PER_MINUTE` - Per-user extraction quota (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance sample rate (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const ENCRYPTION_KEY_LENGTH: usize = 32;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Bearer token settings
    pub jwt: JwtConfig,
    /// Base64 key for the API key vault
    pub encryption_key: SecretString,
    /// Browser origins allowed by CORS. Empty disables CORS headers.
    pub cors_origins: Vec<String>,
    /// Identity provider webhook secret (`whsec_...`)
    pub identity_webhook_secret: Option<SecretString>,
    /// Product extraction settings
    pub extraction: ExtractionConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// JWT configuration.
///
/// Implements `Debug` manually to redact the signing secret.
#[derive(Clone)]
pub struct JwtConfig {
    /// HS256 signing secret
    pub secret: SecretString,
    /// Token lifetime in hours
    pub ttl_hours: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("ttl_hours", &self.ttl_hours)
            .finish()
    }
}

/// Product extraction configuration.
///
/// Implements `Debug` manually to redact the `OpenAI` key.
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Server-wide `OpenAI` key, used when the user has not stored their own
    pub openai_api_key: Option<SecretString>,
    /// Chat completions model
    pub openai_model: String,
    /// Page fetch timeout in seconds
    pub timeout_secs: u64,
    /// Extraction requests allowed per user per minute
    pub rate_per_minute: u32,
}

impl std::fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("openai_model", &self.openai_model)
            .field("timeout_secs", &self.timeout_secs)
            .field("rate_per_minute", &self.rate_per_minute)
            .finish()
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            timeout_secs: 15,
            rate_per_minute: 10,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SHOWCASE_DATABASE_URL")?;
        let host = get_env_or_default("SHOWCASE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SHOWCASE_HOST".to_string(), e.to_string()))?;
        let port = parse_env_or_default("SHOWCASE_PORT", 3000_u16)?;
        let base_url = get_required_env("SHOWCASE_BASE_URL")?;
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("SHOWCASE_BASE_URL".to_string(), e.to_string())
        })?;

        let session_secret = get_validated_secret("SHOWCASE_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "SHOWCASE_SESSION_SECRET")?;

        let jwt = JwtConfig::from_env()?;

        let encryption_key = get_required_secret("SHOWCASE_ENCRYPTION_KEY")?;
        validate_encryption_key(&encryption_key, "SHOWCASE_ENCRYPTION_KEY")?;

        let cors_origins = get_optional_env("SHOWCASE_CORS_ORIGINS")
            .map(|v| parse_origins(&v))
            .unwrap_or_default();

        let identity_webhook_secret =
            get_optional_env("IDENTITY_WEBHOOK_SECRET").map(SecretString::from);

        let extraction = ExtractionConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            jwt,
            encryption_key,
            cors_origins,
            identity_webhook_secret,
            extraction,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", 1.0_f32)?,
            sentry_traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", 0.1_f32)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the public URL is served over TLS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret = get_validated_secret("SHOWCASE_JWT_SECRET")?;
        validate_session_secret(&secret, "SHOWCASE_JWT_SECRET")?;
        let ttl_hours = parse_env_or_default("SHOWCASE_JWT_TTL_HOURS", 24_i64)?;
        if ttl_hours <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SHOWCASE_JWT_TTL_HOURS".to_string(),
                "must be positive".to_string(),
            ));
        }
        Ok(Self { secret, ttl_hours })
    }
}

impl ExtractionConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let rate_per_minute =
            parse_env_or_default("EXTRACTION_RATE_PER_MINUTE", defaults.rate_per_minute)?;
        if rate_per_minute == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "EXTRACTION_RATE_PER_MINUTE".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            openai_api_key: get_optional_env("OPENAI_API_KEY").map(SecretString::from),
            openai_model: get_env_or_default("OPENAI_MODEL", &defaults.openai_model),
            timeout_secs: parse_env_or_default("EXTRACTION_TIMEOUT_SECS", defaults.timeout_secs)?,
            rate_per_minute,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Blank values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

/// Split a comma-separated origin list, dropping blanks and trailing slashes.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Validate that the vault key decodes to exactly 32 bytes.
fn validate_encryption_key(key: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let bytes = STANDARD
        .decode(key.expose_secret().trim())
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if bytes.len() != ENCRYPTION_KEY_LENGTH {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!(
                "must decode to {ENCRYPTION_KEY_LENGTH} bytes (got {}). Generate one with `showcase keygen`.",
                bytes.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            jwt: JwtConfig {
                secret: SecretString::from("super_private_jwt_signing_value_1234"),
                ttl_hours: 24,
            },
            encryption_key: SecretString::from(STANDARD.encode([7u8; 32])),
            cors_origins: Vec::new(),
            identity_webhook_secret: None,
            extraction: ExtractionConfig {
                openai_api_key: Some(SecretString::from("sk-live-value-that-must-not-leak")),
                ..ExtractionConfig::default()
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-jwt-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_validate_encryption_key() {
        let good = SecretString::from(STANDARD.encode([1u8; 32]));
        assert!(validate_encryption_key(&good, "KEY").is_ok());

        let short = SecretString::from(STANDARD.encode([1u8; 16]));
        assert!(matches!(
            validate_encryption_key(&short, "KEY"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));

        let garbage = SecretString::from("not base64!!");
        assert!(validate_encryption_key(&garbage, "KEY").is_err());
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins(" https://app.example.com/, ,http://localhost:5173"),
            vec!["https://app.example.com", "http://localhost:5173"]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn test_socket_addr() {
        let config = test_config();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(!config.is_secure());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug_output = format!("{:?}", test_config());
        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("gpt-4o-mini"));
        assert!(!debug_output.contains("super_private_jwt_signing_value_1234"));
        assert!(!debug_output.contains("sk-live-value-that-must-not-leak"));
    }
}
