//! Password hashing via bcrypt, with an application-wide pepper.
//!
//! The peppered password is pre-hashed with SHA-256 so bcrypt always sees a
//! fixed 44-byte input, well inside its 72-byte limit, no matter how many bytes
//! the password encodes to.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

use super::AuthError;

/// Default bcrypt cost factor.
pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

/// Hashes and verifies peppered passwords.
#[derive(Clone)]
pub struct PasswordHasher {
    pepper: String,
    cost: u32,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}

impl PasswordHasher {
    pub fn new(pepper: impl Into<String>) -> Self {
        Self::with_cost(pepper, DEFAULT_COST)
    }

    pub fn with_cost(pepper: impl Into<String>, cost: u32) -> Self {
        Self {
            pepper: pepper.into(),
            cost,
        }
    }

    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        bcrypt::hash(self.peppered(password), self.cost)
            .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
    }

    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        bcrypt::verify(self.peppered(password), hash)
            .map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
    }

    /// Spend the same bcrypt work as [`Self::verify`] without a stored hash,
    /// so a lookup miss takes as long as a wrong password.
    pub fn dummy_verify(&self, password: &str) {
        let _ = bcrypt::hash(self.peppered(password), self.cost);
    }

    fn peppered(&self, password: &str) -> String {
        let digest = Sha256::new()
            .chain_update(self.pepper.as_bytes())
            .chain_update([0u8])
            .chain_update(password.as_bytes())
            .finalize();
        STANDARD.encode(digest)
    }
}
