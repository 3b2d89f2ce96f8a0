//! Authentication and token lifecycle.
//!
//! ID tokens (RS256) prove identity, refresh tokens (HS256) are tracked in the
//! token store so they can be revoked, and activation tokens confirm an email
//! address exactly once.

pub mod activation;
pub mod issuer;
pub mod jwt;
pub mod password;
pub mod principal;
pub mod token_store;

use thiserror::Error;

use crate::cache::CacheError;
use crate::repository::RepositoryError;
use crate::validation::FieldErrors;

pub use issuer::{TokenIssuer, TokenSettings};
pub use principal::{Identity, Principal};
pub use token_store::TokenStore;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    CredentialError,

    /// Signature, format, expiry or store mismatch. Deliberately carries no detail.
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Account not activated")]
    NotActivated,

    #[error("A session already exists for user {0}")]
    SessionExists(i64),

    #[error("An activation is already pending for user {0}")]
    ActivationPending(i64),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Internal error: {0}")]
    Internal(String),
}
