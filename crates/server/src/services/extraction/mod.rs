//! Product extraction from retailer pages.
//!
//! The pipeline is: normalize the URL, check the cache, fetch the page, parse
//! meta tags, optionally ask an LLM for structured fields, then merge. Merge
//! precedence is LLM, then page metadata, then whatever the URL itself says.
//!
//! An LLM failure never fails the extraction; the metadata result is used.
//! Results are cached for 10 minutes keyed by normalized URL. LLM results are
//! additionally keyed by the API key that produced them, and a run whose LLM
//! step failed is not cached.
//!
//! Only publicly routable hosts are fetched; see [`guard`].

mod error;
pub mod guard;
pub mod metadata;
pub mod openai;
pub mod url_parsing;

pub use error::ExtractionError;
pub use metadata::PageMetadata;
pub use openai::{LlmClient, LlmProduct};

use std::sync::Arc;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use moka::future::Cache;
use rust_decimal::Decimal;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};
use url::Url;

use showcase_core::{AffiliatePlatform, CurrencyCode};

use crate::config::ExtractionConfig;

/// Largest page body we will read.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Most URLs accepted by one bulk import.
pub const MAX_IMPORT_URLS: usize = 25;

const CACHE_CAPACITY: u64 = 1000;
const CACHE_TTL: Duration = Duration::from_secs(600);
const MAX_REDIRECTS: usize = 5;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/126.0.0.0 Safari/537.36";

/// A product as recovered from a retailer page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedProduct {
    /// Normalized URL.
    pub url: String,
    pub platform: AffiliatePlatform,
    /// ASIN, eBay item number and the like.
    pub product_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<Decimal>,
    pub currency_code: CurrencyCode,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub site_name: Option<String>,
    /// Whether the LLM contributed to this result.
    pub used_llm: bool,
}

/// Fetches and extracts products. Cheap to clone.
#[derive(Clone)]
pub struct ProductExtractor {
    inner: Arc<ProductExtractorInner>,
}

struct ProductExtractorInner {
    client: reqwest::Client,
    llm: LlmClient,
    cache: Cache<String, ExtractedProduct>,
}

impl ProductExtractor {
    /// Build an extractor from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::Fetch` if the HTTP client cannot be built.
    pub fn new(config: &ExtractionConfig) -> Result<Self, ExtractionError> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .redirect(guard::redirect_policy(MAX_REDIRECTS))
            .dns_resolver(guard::PublicResolver)
            .no_proxy()
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(ProductExtractorInner {
                client,
                llm: LlmClient::new(&config.openai_model, timeout)?,
                cache,
            }),
        })
    }

    /// Extract a product from `raw_url`.
    ///
    /// When `api_key` is given the LLM step runs; otherwise only page
    /// metadata is used.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::InvalidUrl` for bad input or a host that is
    /// not publicly routable, and a fetch error when the page cannot be
    /// retrieved.
    #[instrument(skip(self, api_key), fields(with_llm = api_key.is_some()))]
    pub async fn extract(
        &self,
        raw_url: &str,
        api_key: Option<&str>,
    ) -> Result<ExtractedProduct, ExtractionError> {
        let url = url_parsing::normalize(raw_url)?;
        let key = cache_key(&url, api_key);

        if let Some(cached) = self.inner.cache.get(&key).await {
            debug!(url = %url, "extraction cache hit");
            return Ok(cached);
        }

        guard::ensure_public(&url).await?;

        let html = self.fetch(&url).await?;
        let meta = metadata::parse(&html);

        let llm = match api_key {
            Some(key) => {
                let text = metadata::visible_text(&html, openai::MAX_PAGE_CHARS);
                match self.inner.llm.extract_product(key, url.as_str(), &text).await {
                    Ok(product) => Some(product),
                    Err(e) => {
                        warn!(url = %url, error = %e, "llm extraction failed, using page metadata");
                        None
                    }
                }
            }
            None => None,
        };

        let product = merge(&url, meta, llm);
        if product.used_llm == api_key.is_some() {
            self.inner.cache.insert(key, product.clone()).await;
        }
        Ok(product)
    }

    /// GET a page, enforcing the status and size limits.
    async fn fetch(&self, url: &Url) -> Result<String, ExtractionError> {
        let mut response = self.inner.client.get(url.as_str()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::UpstreamStatus(status.as_u16()));
        }

        if let Some(len) = response.content_length()
            && len > MAX_BODY_BYTES as u64
        {
            return Err(ExtractionError::TooLarge(MAX_BODY_BYTES));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > MAX_BODY_BYTES {
                return Err(ExtractionError::TooLarge(MAX_BODY_BYTES));
            }
            body.extend_from_slice(&chunk);
        }

        debug!(url = %url, bytes = body.len(), "fetched page");
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// `meta|<url>`, or `llm:<key fingerprint>|<url>` so one account's LLM
/// results are never served to another.
fn cache_key(url: &Url, api_key: Option<&str>) -> String {
    match api_key {
        Some(key) => {
            let digest = Sha256::digest(key.as_bytes());
            format!("llm:{}|{url}", URL_SAFE_NO_PAD.encode(&digest[..12]))
        }
        None => format!("meta|{url}"),
    }
}

/// Combine the three sources, LLM first.
#[must_use]
pub fn merge(url: &Url, meta: PageMetadata, llm: Option<LlmProduct>) -> ExtractedProduct {
    let used_llm = llm.is_some();
    let llm = llm.unwrap_or_default();

    let title = llm
        .title
        .or(meta.title)
        .or_else(|| url_parsing::title_from_path(url))
        .or_else(|| url.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string());

    let currency_code = [llm.currency.as_deref(), meta.currency.as_deref()]
        .into_iter()
        .flatten()
        .find_map(|c| c.parse::<CurrencyCode>().ok())
        .unwrap_or_default();

    ExtractedProduct {
        url: url.to_string(),
        platform: url_parsing::detect_platform(url),
        product_id: url_parsing::product_identifier(url),
        title,
        description: llm.description.or(meta.description),
        image_url: meta.image_url,
        price: llm.price.or(meta.price),
        currency_code,
        category: llm.category,
        tags: llm.tags,
        site_name: meta.site_name,
        used_llm,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn url(s: &str) -> Url {
        url_parsing::normalize(s).unwrap()
    }

    fn meta() -> PageMetadata {
        PageMetadata {
            title: Some("Meta Title".into()),
            description: Some("Meta description".into()),
            image_url: Some("https://cdn.example.com/a.jpg".into()),
            price: Some(Decimal::from_str("10.00").unwrap()),
            currency: Some("GBP".into()),
            site_name: Some("Amazon.co.uk".into()),
        }
    }

    #[test]
    fn test_llm_fields_win() {
        let llm = LlmProduct {
            title: Some("LLM Title".into()),
            description: None,
            price: Some(Decimal::from_str("9.99").unwrap()),
            currency: Some("EUR".into()),
            category: Some("audio".into()),
            tags: vec!["wireless".into()],
        };
        let product = merge(&url("https://www.amazon.co.uk/dp/B000000001"), meta(), Some(llm));

        assert!(product.used_llm);
        assert_eq!(product.title, "LLM Title");
        assert_eq!(product.description.as_deref(), Some("Meta description"));
        assert_eq!(product.price, Some(Decimal::from_str("9.99").unwrap()));
        assert_eq!(product.currency_code, CurrencyCode::EUR);
        assert_eq!(product.category.as_deref(), Some("audio"));
        assert_eq!(product.platform, AffiliatePlatform::Amazon);
        assert_eq!(product.product_id.as_deref(), Some("B000000001"));
    }

    #[test]
    fn test_meta_used_without_llm() {
        let product = merge(&url("https://www.amazon.co.uk/dp/B000000001"), meta(), None);
        assert!(!product.used_llm);
        assert_eq!(product.title, "Meta Title");
        assert_eq!(product.currency_code, CurrencyCode::GBP);
        assert!(product.tags.is_empty());
    }

    #[test]
    fn test_url_fallbacks() {
        let product = merge(
            &url("https://shop.example.com/items/walnut-desk-organizer"),
            PageMetadata::default(),
            None,
        );
        assert_eq!(product.title, "Walnut Desk Organizer");
        assert_eq!(product.currency_code, CurrencyCode::USD);
        assert_eq!(product.platform, AffiliatePlatform::Other);

        let bare = merge(&url("https://shop.example.com/"), PageMetadata::default(), None);
        assert_eq!(bare.title, "shop.example.com");
    }

    #[test]
    fn test_unknown_currency_falls_through() {
        let mut m = meta();
        m.currency = Some("XYZ".into());
        let llm = LlmProduct {
            currency: Some("nonsense".into()),
            ..LlmProduct::default()
        };
        let product = merge(&url("https://example.com/p"), m, Some(llm));
        assert_eq!(product.currency_code, CurrencyCode::USD);
    }

    #[test]
    fn test_cache_key_separates_llm_results() {
        let u = url("https://example.com/p");
        assert_eq!(cache_key(&u, None), "meta|https://example.com/p");
        assert_ne!(cache_key(&u, Some("sk-alice")), cache_key(&u, None));
        assert_ne!(cache_key(&u, Some("sk-alice")), cache_key(&u, Some("sk-bob")));
        assert_eq!(cache_key(&u, Some("sk-alice")), cache_key(&u, Some("sk-alice")));
        assert!(!cache_key(&u, Some("sk-alice")).contains("sk-alice"));
    }

    #[tokio::test]
    async fn test_extract_rejects_invalid_url_before_fetching() {
        let extractor = ProductExtractor::new(&ExtractionConfig::default()).unwrap();
        let result = extractor.extract("ftp://example.com/file", None).await;
        assert!(matches!(result, Err(ExtractionError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_extract_refuses_internal_hosts() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            while let Ok((mut socket, _)) = listener.accept().await {
                let page = "<html><head><title>internal admin</title></head></html>";
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: {}\r\n\r\n{page}",
                    page.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        let extractor = ProductExtractor::new(&ExtractionConfig::default()).unwrap();
        for target in [
            format!("http://127.0.0.1:{port}/admin"),
            format!("http://localhost:{port}/admin"),
            format!("http://[::ffff:127.0.0.1]:{port}/admin"),
            "http://169.254.169.254/latest/meta-data".to_string(),
        ] {
            let result = extractor.extract(&target, None).await;
            assert!(
                matches!(result, Err(ExtractionError::InvalidUrl(_))),
                "{target}: {result:?}"
            );
        }
        server.abort();
    }
}
