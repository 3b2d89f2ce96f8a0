//! Request middleware, applied in order: rate limit, authenticate, gates.

pub mod auth;
pub mod permission;
pub mod rate_limit;
