//! JWT token generation and verification.

use std::path::PathBuf;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::{debug, info};
use uuid::Uuid;

use super::AuthError;
use super::principal::Identity;
use crate::models::auth::{IdTokenClaims, RefreshToken, RefreshTokenClaims};

/// RSA key pair for ID tokens. The private half signs, the public half verifies.
#[derive(Clone)]
pub struct IdTokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl IdTokenKeys {
    /// Load PEM-encoded RSA keys.
    pub fn from_pem(private_pem: &[u8], public_pem: &[u8]) -> Result<Self, AuthError> {
        let encoding = EncodingKey::from_rsa_pem(private_pem)
            .map_err(|e| AuthError::Signing(format!("parse private key: {e}")))?;
        let decoding = DecodingKey::from_rsa_pem(public_pem)
            .map_err(|e| AuthError::Signing(format!("parse public key: {e}")))?;
        Ok(Self { encoding, decoding })
    }

    /// Load RSA keys given as base64-encoded PEM (the environment form).
    pub fn from_base64_pem(private_b64: &str, public_b64: &str) -> Result<Self, AuthError> {
        let private_pem = STANDARD
            .decode(private_b64.trim())
            .map_err(|e| AuthError::Signing(format!("decode private key: {e}")))?;
        let public_pem = STANDARD
            .decode(public_b64.trim())
            .map_err(|e| AuthError::Signing(format!("decode public key: {e}")))?;
        Self::from_pem(&private_pem, &public_pem)
    }
}

/// Sign an ID token for `identity` (RS256).
pub fn generate_id_token(
    identity: &Identity,
    keys: &IdTokenKeys,
    ttl: Duration,
) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let claims = IdTokenClaims {
        sub: identity.id,
        name: identity.name.clone(),
        email: identity.email.clone(),
        iat: now,
        exp: now + ttl.as_secs() as i64,
    };
    sign_id_claims(&claims, keys)
}

fn sign_id_claims(claims: &IdTokenClaims, keys: &IdTokenKeys) -> Result<String, AuthError> {
    encode(&Header::new(Algorithm::RS256), claims, &keys.encoding)
        .map_err(|e| AuthError::Signing(format!("jwt encode: {e}")))
}

/// Verify an ID token, returning the claims on success.
pub fn verify_id_token(token: &str, keys: &IdTokenKeys) -> Option<IdTokenClaims> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.leeway = 0;
    decode::<IdTokenClaims>(token, &keys.decoding, &validation)
        .map_err(|e| debug!(error = %e, "id token rejected"))
        .ok()
        .map(|data| data.claims)
}

/// Sign a refresh token for `user_id` with a fresh token ID (HS256).
pub fn generate_refresh_token(
    user_id: i64,
    secret: &[u8],
    ttl: Duration,
) -> Result<RefreshToken, AuthError> {
    let now = Utc::now().timestamp();
    let claims = RefreshTokenClaims {
        uid: user_id.to_string(),
        jti: Uuid::new_v4().to_string(),
        iat: now,
        exp: now + ttl.as_secs() as i64,
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::Signing(format!("jwt encode: {e}")))?;

    Ok(RefreshToken {
        id: claims.jti,
        uid: claims.uid,
        token,
    })
}

/// Verify a refresh token's signature and expiry.
pub fn verify_refresh_token(token: &str, secret: &[u8]) -> Option<RefreshTokenClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    decode::<RefreshTokenClaims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|e| debug!(error = %e, "refresh token rejected"))
        .ok()
        .map(|data| data.claims)
}

/// Resolve the refresh-token secret: env var `JWT_SECRET` → persisted file.
pub fn resolve_jwt_secret() -> String {
    if let Ok(secret) = std::env::var("JWT_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    let secret_path = jwt_secret_path();
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new JWT secret");
    secret
}

fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reel")
        .join("jwt-secret")
}
