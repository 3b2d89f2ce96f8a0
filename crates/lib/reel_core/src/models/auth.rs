//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! types (which carry `#[serde(rename)]` for camelCase etc.).

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Domain user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub activated: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// User with password hash (for internal auth flows).
#[derive(Debug, Clone)]
pub struct UserWithPassword {
    pub user: User,
    pub password_hash: String,
}

/// Fields required to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Claims embedded in ID tokens (RS256).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Subject: numeric user ID.
    pub sub: i64,
    pub name: String,
    pub email: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

/// Claims embedded in refresh tokens (HS256).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    /// User ID rendered as a string.
    pub uid: String,
    /// Unique token ID, mirrored in the token store.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signed refresh token plus the ID persisted server-side.
#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub id: String,
    pub uid: String,
    pub token: String,
}

/// Tokens returned at sign-in.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub id_token: String,
    pub refresh_token: RefreshToken,
}

/// One-time activation token.
///
/// Only `hash` is ever persisted; `plaintext` is handed to the user once.
#[derive(Debug, Clone)]
pub struct ActivationToken {
    pub plaintext: String,
    pub hash: String,
}

/// Sign-up request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignUpInput {
    #[validate(length(min = 1, max = 100, message = "name must be 1 to 100 characters"))]
    pub name: String,
    #[validate(
        email(message = "email must be a valid address"),
        length(max = 100, message = "email must be at most 100 characters")
    )]
    pub email: String,
    #[validate(length(min = 8, max = 50, message = "password must be 8 to 50 characters"))]
    pub password: String,
    #[serde(alias = "confirm_password", rename = "confirmPassword")]
    pub confirm_password: String,
}

impl SignUpInput {
    pub fn passwords_match(&self) -> bool {
        self.password == self.confirm_password
    }
}

/// Sign-in request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignInInput {
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, max = 200, message = "password must be 8 to 200 characters"))]
    pub password: String,
}
