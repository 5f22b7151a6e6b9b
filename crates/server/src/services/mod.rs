//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Password accounts and bearer tokens
//! - `affiliate_url` - Retailer link rewriting
//! - `key_vault` - Encryption of stored third-party API keys
//! - `extraction` - Product extraction from retailer pages
//! - `import` - Sequential bulk import on top of extraction
//! - `webhook` - Identity provider webhook verification
//! - `rate_limit` - Per-user extraction budget

pub mod affiliate_url;
pub mod auth;
pub mod extraction;
pub mod import;
pub mod key_vault;
pub mod rate_limit;
pub mod webhook;

pub use affiliate_url::{AffiliateLink, AffiliateUrlError};
pub use auth::{AuthError, AuthService, JwtService};
pub use extraction::{ExtractedProduct, ExtractionError, ProductExtractor};
pub use import::{ImportOutcome, ProductImporter};
pub use key_vault::{KeyVault, VaultError};
pub use rate_limit::ExtractionLimiter;
pub use webhook::{IdentityEvent, WebhookError, WebhookVerifier};
