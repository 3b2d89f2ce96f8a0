//! # reel_core
//!
//! Core domain logic for Reel: tokens, principals, permissions and storage.

pub mod auth;
pub mod cache;
pub mod mailer;
pub mod migrate;
pub mod models;
pub mod permissions;
pub mod repository;
pub mod users;
pub mod validation;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
