//! Core types for Showcase.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod platform;
pub mod price;
pub mod slug;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use platform::{AffiliatePlatform, ParsePlatformError};
pub use price::{CurrencyCode, Price};
pub use slug::{Slug, SlugError};
pub use status::*;
