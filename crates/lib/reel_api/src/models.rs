//! Request and response bodies.

use chrono::{DateTime, Utc};
use reel_core::auth::TokenSettings;
use reel_core::models::auth::{TokenPair, User};
use reel_core::models::permission::Permission;
use reel_core::validation::FieldErrors;
use serde::{Deserialize, Serialize};

/// Error body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub activated: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            activated: user.activated,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub id_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// ID token lifetime in seconds.
    pub expires_in: u64,
}

impl TokenResponse {
    pub fn new(pair: TokenPair, settings: &TokenSettings) -> Self {
        Self {
            id_token: pair.id_token,
            refresh_token: pair.refresh_token.token,
            token_type: "Bearer".into(),
            expires_in: settings.id_token_ttl.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignInResponse {
    pub user: UserResponse,
    pub token: TokenResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdTokenResponse {
    pub id_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// `GET /activate` query. Both fields are checked by the handler so a
/// missing one is a 400 with a useful message rather than a rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivationQuery {
    pub id: Option<i64>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResendActivationRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionCodesRequest {
    pub codes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPermissionsResponse {
    pub user_id: i64,
    pub permissions: Vec<Permission>,
}
