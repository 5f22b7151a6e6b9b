//! Domain models for the Showcase API.
//!
//! These are validated domain objects, separate from the database row types
//! in `crate::db`. Most of them serialize directly into API responses.

pub mod affiliate;
pub mod api_key;
pub mod consent;
pub mod order;
pub mod pagination;
pub mod product;
pub mod session;
pub mod store;
pub mod user;

pub use affiliate::AffiliateId;
pub use api_key::StoredApiKey;
pub use consent::CookiePreferences;
pub use order::{NewOrder, Order, OrderFilter, OrderSummary, OrderUpdate};
pub use pagination::{PageParams, PageRequest, Paginated};
pub use product::{NewProduct, Product, ProductFilter, ProductUpdate};
pub use session::{CurrentUser, keys as session_keys};
pub use store::{NewStore, Store, StoreUpdate};
pub use user::{ExternalProfile, ProfileUpdate, User};
