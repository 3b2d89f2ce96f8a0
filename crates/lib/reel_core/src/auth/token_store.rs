//! Per-user token storage over a [`CacheStore`].
//!
//! Keys are `{prefix}:{user_id}`, so each token kind gets one slot per user.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheError, CacheStore};

/// Namespace for refresh-token IDs.
pub const REFRESH_PREFIX: &str = "refreshtoken";

/// Namespace for activation-token hashes.
pub const ACTIVATION_PREFIX: &str = "activationtoken";

/// Namespaced, TTL-aware token slots.
#[derive(Clone)]
pub struct TokenStore {
    cache: Arc<dyn CacheStore>,
}

impl TokenStore {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }

    /// Cache key for a user's token of the given kind.
    pub fn key(prefix: &str, user_id: i64) -> String {
        format!("{prefix}:{user_id}")
    }

    /// Store a token; fails with [`CacheError::KeyExists`] if the slot is taken.
    pub async fn set_if_absent(
        &self,
        user_id: i64,
        value: &str,
        prefix: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let key = Self::key(prefix, user_id);
        if self.cache.set_if_absent(&key, value, ttl).await? {
            Ok(())
        } else {
            Err(CacheError::KeyExists(key))
        }
    }

    /// Replace a token only if the slot is occupied. Returns whether it was.
    pub async fn set_if_present(
        &self,
        user_id: i64,
        value: &str,
        prefix: &str,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        self.cache
            .set_if_present(&Self::key(prefix, user_id), value, ttl)
            .await
    }

    /// Fetch a token; fails with [`CacheError::KeyMissing`] if absent or expired.
    pub async fn get(&self, user_id: i64, prefix: &str) -> Result<String, CacheError> {
        let key = Self::key(prefix, user_id);
        self.cache
            .get(&key)
            .await?
            .ok_or(CacheError::KeyMissing(key))
    }

    /// Remove a token. Absent slots are fine.
    pub async fn delete(&self, user_id: i64, prefix: &str) -> Result<(), CacheError> {
        self.cache.delete(&Self::key(prefix, user_id)).await
    }
}
