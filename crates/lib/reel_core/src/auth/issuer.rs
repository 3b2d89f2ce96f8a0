//! Token issuance, validation and server-side tracking.

use std::time::Duration;

use tracing::{debug, info};

use super::AuthError;
use super::activation;
use super::jwt::{self, IdTokenKeys};
use super::principal::Identity;
use super::token_store::{ACTIVATION_PREFIX, REFRESH_PREFIX, TokenStore};
use crate::cache::CacheError;
use crate::models::auth::{ActivationToken, IdTokenClaims, RefreshTokenClaims, TokenPair};

/// Token lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSettings {
    pub id_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub activation_token_ttl: Duration,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            id_token_ttl: Duration::from_secs(15 * 60),
            refresh_token_ttl: Duration::from_secs(3 * 24 * 60 * 60),
            activation_token_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Mints and checks ID, refresh and activation tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    keys: IdTokenKeys,
    refresh_secret: Vec<u8>,
    settings: TokenSettings,
    store: TokenStore,
}

impl TokenIssuer {
    pub fn new(
        keys: IdTokenKeys,
        refresh_secret: impl Into<Vec<u8>>,
        settings: TokenSettings,
        store: TokenStore,
    ) -> Self {
        Self {
            keys,
            refresh_secret: refresh_secret.into(),
            settings,
            store,
        }
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Issue an ID token and a tracked refresh token.
    ///
    /// Only one refresh session may exist per user; a second sign-in before
    /// the first refresh token lapses (or is deleted) fails with
    /// [`AuthError::SessionExists`].
    pub async fn new_pair_from_user(&self, identity: &Identity) -> Result<TokenPair, AuthError> {
        let id_token = self.issue_id_token(identity)?;
        let refresh_token = jwt::generate_refresh_token(
            identity.id,
            &self.refresh_secret,
            self.settings.refresh_token_ttl,
        )?;

        self.store
            .set_if_absent(
                identity.id,
                &refresh_token.id,
                REFRESH_PREFIX,
                self.settings.refresh_token_ttl,
            )
            .await
            .map_err(|e| match e {
                CacheError::KeyExists(_) => AuthError::SessionExists(identity.id),
                other => AuthError::Cache(other),
            })?;

        info!(user_id = identity.id, "issued token pair");
        Ok(TokenPair {
            id_token,
            refresh_token,
        })
    }

    /// Sign a standalone ID token.
    pub fn issue_id_token(&self, identity: &Identity) -> Result<String, AuthError> {
        jwt::generate_id_token(identity, &self.keys, self.settings.id_token_ttl)
    }

    /// Verify an ID token's signature and expiry.
    pub fn validate_id_token(&self, token: &str) -> Result<IdTokenClaims, AuthError> {
        jwt::verify_id_token(token, &self.keys).ok_or(AuthError::InvalidToken)
    }

    /// Verify a refresh token's signature and expiry.
    ///
    /// This does not consult the token store; see [`Self::verify_refresh_session`].
    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshTokenClaims, AuthError> {
        jwt::verify_refresh_token(token, &self.refresh_secret).ok_or(AuthError::InvalidToken)
    }

    /// Check that `claims` still names the user's live refresh session.
    /// Returns the user ID.
    pub async fn verify_refresh_session(
        &self,
        claims: &RefreshTokenClaims,
    ) -> Result<i64, AuthError> {
        let user_id: i64 = claims.uid.parse().map_err(|_| AuthError::InvalidToken)?;
        let stored = self
            .store
            .get(user_id, REFRESH_PREFIX)
            .await
            .map_err(not_found_as_invalid)?;
        if stored != claims.jti {
            debug!(user_id, "refresh token superseded or revoked");
            return Err(AuthError::InvalidToken);
        }
        Ok(user_id)
    }

    /// Create the user's pending activation token. Only one may be pending.
    pub async fn generate_activation_token(
        &self,
        user_id: i64,
    ) -> Result<ActivationToken, AuthError> {
        let token = activation::generate();
        self.store
            .set_if_absent(
                user_id,
                &token.hash,
                ACTIVATION_PREFIX,
                self.settings.activation_token_ttl,
            )
            .await
            .map_err(|e| match e {
                CacheError::KeyExists(_) => AuthError::ActivationPending(user_id),
                other => AuthError::Cache(other),
            })?;
        Ok(token)
    }

    /// Issue a fresh activation token, replacing any pending one and
    /// restarting the TTL. Works whether or not a token is still pending, so
    /// an expired or never-delivered token can always be reissued.
    pub async fn regenerate_activation_token(
        &self,
        user_id: i64,
    ) -> Result<ActivationToken, AuthError> {
        let token = activation::generate();
        let ttl = self.settings.activation_token_ttl;
        if self
            .store
            .set_if_present(user_id, &token.hash, ACTIVATION_PREFIX, ttl)
            .await?
        {
            return Ok(token);
        }
        match self
            .store
            .set_if_absent(user_id, &token.hash, ACTIVATION_PREFIX, ttl)
            .await
        {
            Ok(()) => Ok(token),
            // Raced with another issuer; overwrite what it stored.
            Err(CacheError::KeyExists(_)) => {
                if self
                    .store
                    .set_if_present(user_id, &token.hash, ACTIVATION_PREFIX, ttl)
                    .await?
                {
                    Ok(token)
                } else {
                    Err(AuthError::ActivationPending(user_id))
                }
            }
            Err(other) => Err(AuthError::Cache(other)),
        }
    }

    /// Compare `candidate` against the stored activation hash.
    ///
    /// Does not consume the token: the caller deletes it once the activation
    /// has been recorded, so a failed follow-up step can be retried.
    pub async fn validate_activation_token(
        &self,
        user_id: i64,
        candidate: &str,
    ) -> Result<(), AuthError> {
        let stored = self
            .store
            .get(user_id, ACTIVATION_PREFIX)
            .await
            .map_err(not_found_as_invalid)?;
        if activation::hash(candidate) != stored {
            debug!(user_id, "activation token mismatch");
            return Err(AuthError::InvalidToken);
        }
        Ok(())
    }

    pub async fn delete_activation_token(&self, user_id: i64) -> Result<(), AuthError> {
        Ok(self.store.delete(user_id, ACTIVATION_PREFIX).await?)
    }

    /// Revoke the user's refresh session.
    pub async fn delete_user_tokens(&self, user_id: i64) -> Result<(), AuthError> {
        Ok(self.store.delete(user_id, REFRESH_PREFIX).await?)
    }
}

/// A missing token slot means the presented token is simply not valid.
fn not_found_as_invalid(e: CacheError) -> AuthError {
    match e {
        CacheError::KeyMissing(_) => AuthError::InvalidToken,
        other => AuthError::Cache(other),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::jwt::tests::test_keys;
    use crate::cache::MemoryCache;

    fn issuer_with(settings: TokenSettings) -> TokenIssuer {
        let store = TokenStore::new(Arc::new(MemoryCache::new()));
        TokenIssuer::new(test_keys(), b"refresh-secret".to_vec(), settings, store)
    }

    fn issuer() -> TokenIssuer {
        issuer_with(TokenSettings::default())
    }

    fn ada() -> Identity {
        Identity {
            id: 7,
            name: "Ada".into(),
            email: "ada@example.com".into(),
        }
    }

    #[tokio::test]
    async fn pair_id_token_validates() {
        let issuer = issuer();
        let pair = issuer.new_pair_from_user(&ada()).await.unwrap();

        let claims = issuer.validate_id_token(&pair.id_token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.name, "Ada");

        let refresh = issuer
            .validate_refresh_token(&pair.refresh_token.token)
            .unwrap();
        assert_eq!(refresh.uid, "7");
        assert_eq!(refresh.jti, pair.refresh_token.id);
    }

    #[tokio::test]
    async fn second_pair_for_same_user_conflicts() {
        let issuer = issuer();
        issuer.new_pair_from_user(&ada()).await.unwrap();
        let err = issuer.new_pair_from_user(&ada()).await.unwrap_err();
        assert!(matches!(err, AuthError::SessionExists(7)));
    }

    #[tokio::test]
    async fn sign_out_frees_the_session_slot() {
        let issuer = issuer();
        issuer.new_pair_from_user(&ada()).await.unwrap();
        issuer.delete_user_tokens(7).await.unwrap();
        assert!(issuer.new_pair_from_user(&ada()).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn session_slot_frees_after_refresh_ttl() {
        let issuer = issuer_with(TokenSettings {
            refresh_token_ttl: Duration::from_secs(30),
            ..TokenSettings::default()
        });
        issuer.new_pair_from_user(&ada()).await.unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(issuer.new_pair_from_user(&ada()).await.is_ok());
    }

    #[tokio::test]
    async fn garbage_tokens_are_invalid() {
        let issuer = issuer();
        assert!(matches!(
            issuer.validate_id_token("abc"),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            issuer.validate_refresh_token("abc"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn refresh_token_is_not_accepted_as_id_token() {
        let issuer = issuer();
        let pair = issuer.new_pair_from_user(&ada()).await.unwrap();
        assert!(issuer.validate_id_token(&pair.refresh_token.token).is_err());
    }

    #[tokio::test]
    async fn refresh_session_is_revoked_by_delete() {
        let issuer = issuer();
        let pair = issuer.new_pair_from_user(&ada()).await.unwrap();
        let claims = issuer
            .validate_refresh_token(&pair.refresh_token.token)
            .unwrap();
        assert_eq!(issuer.verify_refresh_session(&claims).await.unwrap(), 7);

        issuer.delete_user_tokens(7).await.unwrap();
        // Still cryptographically valid, but no longer backed by the store.
        assert!(issuer.validate_refresh_token(&pair.refresh_token.token).is_ok());
        assert!(matches!(
            issuer.verify_refresh_session(&claims).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn superseded_refresh_token_fails_session_check() {
        let issuer = issuer();
        let first = issuer.new_pair_from_user(&ada()).await.unwrap();
        issuer.delete_user_tokens(7).await.unwrap();
        issuer.new_pair_from_user(&ada()).await.unwrap();

        let stale = issuer
            .validate_refresh_token(&first.refresh_token.token)
            .unwrap();
        assert!(issuer.verify_refresh_session(&stale).await.is_err());
    }

    #[tokio::test]
    async fn activation_token_validates_until_deleted() {
        let issuer = issuer();
        let token = issuer.generate_activation_token(7).await.unwrap();

        issuer
            .validate_activation_token(7, &token.plaintext)
            .await
            .unwrap();
        // Validation alone does not consume the token.
        issuer
            .validate_activation_token(7, &token.plaintext)
            .await
            .unwrap();

        issuer.delete_activation_token(7).await.unwrap();
        assert!(matches!(
            issuer.validate_activation_token(7, &token.plaintext).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn wrong_activation_token_is_invalid() {
        let issuer = issuer();
        let token = issuer.generate_activation_token(7).await.unwrap();
        assert!(matches!(
            issuer.validate_activation_token(7, "WRONG").await,
            Err(AuthError::InvalidToken)
        ));
        // The stored hash itself is not a valid plaintext.
        assert!(issuer.validate_activation_token(7, &token.hash).await.is_err());
        // Another user's slot is empty.
        assert!(issuer.validate_activation_token(8, &token.plaintext).await.is_err());
    }

    #[tokio::test]
    async fn only_one_activation_token_pending() {
        let issuer = issuer();
        issuer.generate_activation_token(7).await.unwrap();
        assert!(matches!(
            issuer.generate_activation_token(7).await,
            Err(AuthError::ActivationPending(7))
        ));
    }

    #[tokio::test]
    async fn regenerate_replaces_pending_token() {
        let issuer = issuer();
        let old = issuer.generate_activation_token(7).await.unwrap();
        let new = issuer.regenerate_activation_token(7).await.unwrap();
        assert!(issuer.validate_activation_token(7, &old.plaintext).await.is_err());
        assert!(issuer.validate_activation_token(7, &new.plaintext).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn activation_token_expires() {
        let issuer = issuer_with(TokenSettings {
            activation_token_ttl: Duration::from_secs(60),
            ..TokenSettings::default()
        });
        let token = issuer.generate_activation_token(7).await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(matches!(
            issuer.validate_activation_token(7, &token.plaintext).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn regenerate_issues_when_nothing_is_pending() {
        let issuer = issuer();
        let token = issuer.regenerate_activation_token(7).await.unwrap();
        assert!(issuer.validate_activation_token(7, &token.plaintext).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_activation_can_be_reissued() {
        let issuer = issuer_with(TokenSettings {
            activation_token_ttl: Duration::from_secs(60),
            ..TokenSettings::default()
        });
        let expired = issuer.generate_activation_token(7).await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;

        let fresh = issuer.regenerate_activation_token(7).await.unwrap();
        assert!(issuer.validate_activation_token(7, &expired.plaintext).await.is_err());
        assert!(issuer.validate_activation_token(7, &fresh.plaintext).await.is_ok());

        // The reissued token gets a full TTL of its own.
        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(issuer.validate_activation_token(7, &fresh.plaintext).await.is_ok());
    }
}
