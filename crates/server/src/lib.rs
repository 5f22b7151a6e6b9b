//! Showcase API server library.
//!
//! The binary in `main.rs` is a thin wrapper; everything else lives here so
//! the integration tests can build the same router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
