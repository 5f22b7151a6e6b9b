//! Bulk product import.
//!
//! URLs are extracted and inserted one at a time, in order. A failure is
//! recorded against its URL and the batch continues.

use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use showcase_core::{Price, StoreId, UserId};

use super::affiliate_url;
use super::extraction::{ExtractedProduct, ExtractionError, MAX_IMPORT_URLS, ProductExtractor};
use crate::db::ProductRepository;
use crate::models::{AffiliateId, NewProduct, Product};

/// Result for one URL of a bulk import.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportOutcome {
    Created { product: Box<Product> },
    Failed { url: String, error: String },
}

impl ImportOutcome {
    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

/// Check the batch size before any work is done.
///
/// # Errors
///
/// Returns `ExtractionError::BatchSize` for an empty or oversized batch.
pub fn check_batch(urls: &[String]) -> Result<(), ExtractionError> {
    if urls.is_empty() || urls.len() > MAX_IMPORT_URLS {
        return Err(ExtractionError::BatchSize {
            max: MAX_IMPORT_URLS,
            got: urls.len(),
        });
    }
    Ok(())
}

/// Build the row for an extracted product, rewriting its link with the
/// owner's tracking id for the platform. A price the money column cannot
/// hold is dropped.
#[must_use]
pub fn new_product(
    extracted: ExtractedProduct,
    store_id: StoreId,
    owner_id: UserId,
    affiliate_ids: &[AffiliateId],
) -> NewProduct {
    let affiliate_url = affiliate_url::rewrite_for_user(&extracted.url, affiliate_ids)
        .map_or_else(|_| extracted.url.clone(), |link| link.url);

    NewProduct {
        store_id,
        owner_id,
        title: extracted.title,
        description: extracted.description,
        image_url: extracted.image_url,
        original_url: extracted.url,
        affiliate_url,
        platform: extracted.platform,
        price: extracted.price.filter(|p| Price::is_storable(*p)),
        currency_code: extracted.currency_code,
        category: extracted.category,
        tags: extracted.tags,
        is_featured: false,
    }
}

/// Sequential importer.
pub struct ProductImporter<'a> {
    pool: &'a PgPool,
    extractor: &'a ProductExtractor,
}

impl<'a> ProductImporter<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, extractor: &'a ProductExtractor) -> Self {
        Self { pool, extractor }
    }

    /// Import every URL into `store_id`.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::BatchSize` if the batch is empty or too big.
    /// Per-URL failures are reported in the outcomes, not as an error.
    #[instrument(skip(self, urls, api_key, affiliate_ids), fields(count = urls.len()))]
    pub async fn import(
        &self,
        owner_id: UserId,
        store_id: StoreId,
        urls: &[String],
        api_key: Option<&str>,
        affiliate_ids: &[AffiliateId],
    ) -> Result<Vec<ImportOutcome>, ExtractionError> {
        check_batch(urls)?;

        let products = ProductRepository::new(self.pool);
        let mut outcomes = Vec::with_capacity(urls.len());

        for url in urls {
            let outcome = match self.extractor.extract(url, api_key).await {
                Ok(extracted) => {
                    let row = new_product(extracted, store_id, owner_id, affiliate_ids);
                    match products.create(&row).await {
                        Ok(product) => ImportOutcome::Created {
                            product: Box::new(product),
                        },
                        Err(e) => {
                            warn!(url = %url, error = %e, "failed to save imported product");
                            ImportOutcome::Failed {
                                url: url.clone(),
                                error: "failed to save product".to_string(),
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "failed to extract product");
                    ImportOutcome::Failed {
                        url: url.clone(),
                        error: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        let created = outcomes.iter().filter(|o| o.is_created()).count();
        info!(created, failed = outcomes.len() - created, "bulk import finished");
        Ok(outcomes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use showcase_core::{AffiliateIdId, AffiliatePlatform, CurrencyCode};

    use super::*;

    fn extracted(url: &str, platform: AffiliatePlatform) -> ExtractedProduct {
        ExtractedProduct {
            url: url.to_string(),
            platform,
            product_id: None,
            title: "Desk Lamp".into(),
            description: None,
            image_url: None,
            price: None,
            currency_code: CurrencyCode::USD,
            category: None,
            tags: vec!["lighting".into()],
            site_name: None,
            used_llm: false,
        }
    }

    #[test]
    fn test_check_batch_bounds() {
        assert!(check_batch(&[]).is_err());
        assert!(check_batch(&vec!["https://a.example".to_string(); MAX_IMPORT_URLS]).is_ok());
        assert!(matches!(
            check_batch(&vec!["https://a.example".to_string(); MAX_IMPORT_URLS + 1]),
            Err(ExtractionError::BatchSize { got: 26, .. })
        ));
    }

    #[test]
    fn test_new_product_rewrites_with_owner_tag() {
        let ids = vec![AffiliateId {
            id: AffiliateIdId::new(1),
            user_id: UserId::new(3),
            platform: AffiliatePlatform::Amazon,
            tracking_id: "owner-20".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }];

        let row = new_product(
            extracted("https://www.amazon.com/dp/B000000001", AffiliatePlatform::Amazon),
            StoreId::new(5),
            UserId::new(3),
            &ids,
        );
        assert_eq!(row.original_url, "https://www.amazon.com/dp/B000000001");
        assert_eq!(row.affiliate_url, "https://www.amazon.com/dp/B000000001?tag=owner-20");
        assert!(!row.is_featured);
    }

    #[test]
    fn test_new_product_without_matching_id_keeps_url() {
        let row = new_product(
            extracted("https://shop.example.com/lamp", AffiliatePlatform::Other),
            StoreId::new(5),
            UserId::new(3),
            &[],
        );
        assert_eq!(row.affiliate_url, row.original_url);
    }

    #[test]
    fn test_new_product_drops_unstorable_price() {
        let mut huge = extracted("https://shop.example.com/lamp", AffiliatePlatform::Other);
        huge.price = Some(Decimal::from(10_000_000_000_i64));
        assert_eq!(new_product(huge, StoreId::new(5), UserId::new(3), &[]).price, None);

        let mut fine = extracted("https://shop.example.com/lamp", AffiliatePlatform::Other);
        fine.price = Some(Decimal::new(3990, 2));
        assert_eq!(
            new_product(fine, StoreId::new(5), UserId::new(3), &[]).price,
            Some(Decimal::new(3990, 2))
        );
    }
}
