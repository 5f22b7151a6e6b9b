//! Showcase Core - Shared types library.
//!
//! This crate provides common types used across all Showcase components:
//! - `server` - JSON API for catalogs, storefronts, and affiliate links
//! - `cli` - Command-line tools for migrations, seeding, and user management
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, slugs, prices, platforms, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
