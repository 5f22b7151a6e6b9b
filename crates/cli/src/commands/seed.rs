//! Seed the database with demo accounts, stores and products.
//!
//! The YAML file is parsed and validated in full before connecting, so a
//! typo never leaves a half-seeded database behind. Seeding is re-runnable:
//! existing accounts are reused and stores whose slug is taken are skipped.

use std::collections::BTreeMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{error, info, warn};

use showcase_core::{AffiliatePlatform, CurrencyCode, Email, Price, Slug, UserId, UserRole};
use showcase_server::db::{
    AffiliateIdRepository, ProductRepository, RepositoryError, StoreRepository, UserRepository,
};
use showcase_server::models::{AffiliateId, NewProduct, NewStore};
use showcase_server::services::affiliate_url;
use showcase_server::services::extraction::url_parsing;
use showcase_server::services::{AuthError, AuthService};

use super::connect;

/// Top-level seed document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedFile {
    pub users: Vec<SeedUser>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedUser {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    /// Platform name to tracking id.
    #[serde(default)]
    pub affiliate_ids: BTreeMap<String, String>,
    #[serde(default)]
    pub stores: Vec<SeedStore>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedStore {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedProduct {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured: bool,
}

const fn default_true() -> bool {
    true
}

/// Counts reported at the end of a run.
#[derive(Debug, Default)]
struct SeedResult {
    users_created: usize,
    users_existing: usize,
    stores_created: usize,
    stores_skipped: usize,
    products_created: usize,
}

/// Parse a seed document.
///
/// # Errors
///
/// Returns the YAML error for malformed input or unknown fields.
pub fn parse(content: &str) -> Result<SeedFile, serde_yaml::Error> {
    serde_yaml::from_str(content)
}

/// Check everything that can be checked without a database.
///
/// Returns one message per problem; an empty list means the file is usable.
#[must_use]
pub fn validate(seed: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();

    for user in &seed.users {
        if let Err(e) = Email::parse(&user.email) {
            errors.push(format!("user {}: {e}", user.email));
        }
        for platform in user.affiliate_ids.keys() {
            match platform.parse::<AffiliatePlatform>() {
                Ok(AffiliatePlatform::Other) => {
                    errors.push(format!("user {}: no tracking id for 'other'", user.email));
                }
                Ok(_) => {}
                Err(e) => errors.push(format!("user {}: {e}", user.email)),
            }
        }

        for store in &user.stores {
            if let Err(e) = store_slug(store) {
                errors.push(format!("store {}: {e}", store.name));
            }
            for product in &store.products {
                if let Err(e) = url_parsing::normalize(&product.url) {
                    errors.push(format!("product {}: {e}", product.title));
                }
                if let Some(currency) = &product.currency
                    && let Err(e) = currency.parse::<CurrencyCode>()
                {
                    errors.push(format!("product {}: {e}", product.title));
                }
                if product.price.is_some_and(|p| !Price::is_storable(p)) {
                    errors.push(format!("product {}: price out of range", product.title));
                }
            }
        }
    }

    errors
}

fn store_slug(store: &SeedStore) -> Result<Slug, showcase_core::SlugError> {
    store
        .slug
        .as_deref()
        .map_or_else(|| Slug::from_name(&store.name), Slug::parse)
}

/// Seed demo data from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation, or if a
/// database operation fails.
pub async fn demo(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading seed data from file");

    let content = tokio::fs::read_to_string(path).await?;
    let seed = parse(&content)?;

    info!(users = seed.users.len(), "Parsed seed file");

    let errors = validate(&seed);
    if !errors.is_empty() {
        error!("Seed validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = connect().await?;
    info!("Connected to database");

    let mut result = SeedResult::default();
    for user in &seed.users {
        seed_user(&pool, user, &mut result).await?;
    }

    info!("Seeding complete!");
    info!(
        "  Users created: {} (existing: {})",
        result.users_created, result.users_existing
    );
    info!(
        "  Stores created: {} (skipped: {})",
        result.stores_created, result.stores_skipped
    );
    info!("  Products created: {}", result.products_created);

    Ok(())
}

async fn seed_user(
    pool: &PgPool,
    user: &SeedUser,
    result: &mut SeedResult,
) -> Result<(), Box<dyn std::error::Error>> {
    let created = AuthService::new(pool)
        .create_user(
            &user.email,
            &user.password,
            user.display_name.as_deref(),
            user.role,
        )
        .await;

    let user_id = match created {
        Ok(created) => {
            result.users_created += 1;
            created.id
        }
        Err(AuthError::UserAlreadyExists) => {
            result.users_existing += 1;
            let email = Email::parse(&user.email)?;
            UserRepository::new(pool)
                .get_by_email(&email)
                .await?
                .ok_or_else(|| format!("user {} exists but cannot be loaded", user.email))?
                .id
        }
        Err(e) => return Err(e.into()),
    };

    let affiliate_ids = seed_affiliate_ids(pool, user_id, &user.affiliate_ids).await?;

    for store in &user.stores {
        seed_store(pool, user_id, store, &affiliate_ids, result).await?;
    }
    Ok(())
}

async fn seed_affiliate_ids(
    pool: &PgPool,
    user_id: UserId,
    ids: &BTreeMap<String, String>,
) -> Result<Vec<AffiliateId>, Box<dyn std::error::Error>> {
    let repo = AffiliateIdRepository::new(pool);
    let mut stored = Vec::with_capacity(ids.len());
    for (platform, tracking_id) in ids {
        let platform: AffiliatePlatform = platform.parse()?;
        stored.push(repo.upsert(user_id, platform, tracking_id).await?);
    }
    Ok(stored)
}

async fn seed_store(
    pool: &PgPool,
    owner_id: UserId,
    store: &SeedStore,
    affiliate_ids: &[AffiliateId],
    result: &mut SeedResult,
) -> Result<(), Box<dyn std::error::Error>> {
    let slug = store_slug(store)?;
    let created = StoreRepository::new(pool)
        .create(&NewStore {
            owner_id,
            slug: slug.clone(),
            name: store.name.clone(),
            description: store.description.clone(),
            is_public: store.is_public,
        })
        .await;

    let created = match created {
        Ok(created) => created,
        Err(RepositoryError::Conflict(_)) => {
            warn!(slug = %slug, "store slug already taken, skipping");
            result.stores_skipped += 1;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    result.stores_created += 1;

    let products = ProductRepository::new(pool);
    for product in &store.products {
        let original = url_parsing::normalize(&product.url)?;
        let link = affiliate_url::rewrite_for_user(original.as_str(), affiliate_ids)?;
        let currency_code = product
            .currency
            .as_deref()
            .map(str::parse::<CurrencyCode>)
            .transpose()?
            .unwrap_or_default();

        products
            .create(&NewProduct {
                store_id: created.id,
                owner_id,
                title: product.title.clone(),
                description: product.description.clone(),
                image_url: product.image_url.clone(),
                original_url: original.into(),
                affiliate_url: link.url,
                platform: link.platform,
                price: product.price,
                currency_code,
                category: product.category.clone(),
                tags: product.tags.clone(),
                is_featured: product.featured,
            })
            .await?;
        result.products_created += 1;
    }

    info!(store = %created.slug, products = store.products.len(), "store seeded");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const DEMO: &str = include_str!("../../seed/demo.yaml");

    #[test]
    fn test_demo_file_is_valid() {
        let seed = parse(DEMO).unwrap();
        assert!(!seed.users.is_empty());
        assert_eq!(validate(&seed), Vec::<String>::new());
    }

    #[test]
    fn test_defaults() {
        let seed = parse(
            r"
users:
  - email: a@example.com
    password: password123
    stores:
      - name: Desk Setup
        products:
          - title: Lamp
            url: amazon.com/dp/B000000001
",
        )
        .unwrap();

        let user = &seed.users[0];
        assert_eq!(user.role, UserRole::User);
        assert!(user.affiliate_ids.is_empty());
        let store = &user.stores[0];
        assert!(store.is_public);
        assert_eq!(store_slug(store).unwrap().as_str(), "desk-setup");
        assert!(!store.products[0].featured);
        assert!(validate(&seed).is_empty());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = parse(
            r"
users:
  - email: a@example.com
    password: password123
    nickname: a
",
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let seed = parse(
            r#"
users:
  - email: not-an-email
    password: password123
    affiliate_ids:
      myspace: abc
      other: abc
    stores:
      - name: "!"
        products:
          - title: Broken
            url: "ftp://example.com/file"
            currency: XYZ
            price: "-1.00"
"#,
        )
        .unwrap();

        let errors = validate(&seed);
        assert_eq!(errors.len(), 7, "{errors:?}");
    }
}
