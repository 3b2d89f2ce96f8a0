//! Shared fixtures: in-memory collaborators and request helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use reel_api::AppState;
use reel_api::config::{ApiConfig, LimiterConfig};
use reel_api::middleware::rate_limit::RateLimiter;
use reel_core::auth::jwt::IdTokenKeys;
use reel_core::auth::password::PasswordHasher;
use reel_core::auth::{Identity, TokenIssuer, TokenSettings, TokenStore};
use reel_core::cache::MemoryCache;
use reel_core::mailer::{MailError, MailMessage, Mailer};
use reel_core::models::auth::{NewUser, User, UserWithPassword};
use reel_core::models::permission::{Permission, PermissionCode, PermissionCodes};
use reel_core::permissions::{PermissionRepository, PermissionService};
use reel_core::repository::RepositoryError;
use reel_core::users::UserRepository;
use serde_json::Value;
use tower::ServiceExt;

pub const PRIVATE_PEM: &str = include_str!("../../../reel_core/testdata/private.pem");
pub const PUBLIC_PEM: &str = include_str!("../../../reel_core/testdata/public.pem");

#[derive(Default)]
pub struct FakeUsers {
    rows: Mutex<Vec<UserWithPassword>>,
}

impl FakeUsers {
    pub fn activated(&self, id: i64) -> bool {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .any(|row| row.user.id == id && row.user.activated)
    }
}

#[async_trait]
impl UserRepository for FakeUsers {
    async fn insert(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|row| row.user.email == user.email) {
            return Err(RepositoryError::Conflict("users_email_key".into()));
        }
        let created = User {
            id: rows.len() as i64 + 1,
            name: user.name.clone(),
            email: user.email.clone(),
            activated: false,
            created_at: chrono::Utc::now(),
        };
        rows.push(UserWithPassword {
            user: created.clone(),
            password_hash: user.password_hash.clone(),
        });
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> Result<User, RepositoryError> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.user.id == id)
            .map(|row| row.user.clone())
            .ok_or_else(|| RepositoryError::NotFound(format!("user {id}")))
    }

    async fn get_by_email(&self, email: &str) -> Result<UserWithPassword, RepositoryError> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.user.email == email)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("user with email {email}")))
    }

    async fn set_activated(&self, id: i64) -> Result<User, RepositoryError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|row| row.user.id == id)
            .ok_or_else(|| RepositoryError::NotFound(format!("user {id}")))?;
        row.user.activated = true;
        Ok(row.user.clone())
    }
}

/// Permission repository whose grants are set directly by tests.
#[derive(Default)]
pub struct FakePermissions {
    catalog: Mutex<Vec<Permission>>,
    grants: Mutex<HashMap<i64, Vec<Permission>>>,
    failing: AtomicBool,
    stalled: AtomicBool,
    lookups: Mutex<usize>,
}

impl FakePermissions {
    pub fn grant(&self, user_id: i64, codes: &[&str]) {
        let permissions = codes
            .iter()
            .enumerate()
            .map(|(i, code)| Permission {
                id: i as i64 + 1,
                code: PermissionCode::parse(code).unwrap(),
            })
            .collect();
        self.grants.lock().unwrap().insert(user_id, permissions);
    }

    pub fn fail_lookups(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Make every grant lookup hang for an hour.
    pub fn stall_lookups(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    pub fn lookups(&self) -> usize {
        *self.lookups.lock().unwrap()
    }

    pub fn codes_of(&self, user_id: i64) -> Vec<String> {
        self.grants
            .lock()
            .unwrap()
            .get(&user_id)
            .map(|perms| perms.iter().map(|p| p.code.to_string()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PermissionRepository for FakePermissions {
    async fn add_permission(&self, code: &PermissionCode) -> Result<Permission, RepositoryError> {
        let mut catalog = self.catalog.lock().unwrap();
        let permission = Permission {
            id: catalog.len() as i64 + 1,
            code: code.clone(),
        };
        catalog.push(permission.clone());
        Ok(permission)
    }

    async fn get_permission(&self, id: i64) -> Result<Permission, RepositoryError> {
        self.catalog
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("permission {id}")))
    }

    async fn update_permission(&self, permission: &Permission) -> Result<(), RepositoryError> {
        let mut catalog = self.catalog.lock().unwrap();
        let existing = catalog
            .iter_mut()
            .find(|p| p.id == permission.id)
            .ok_or_else(|| RepositoryError::NotFound(format!("permission {}", permission.id)))?;
        existing.code = permission.code.clone();
        Ok(())
    }

    async fn delete_permission(&self, id: i64) -> Result<(), RepositoryError> {
        let mut catalog = self.catalog.lock().unwrap();
        let before = catalog.len();
        catalog.retain(|p| p.id != id);
        if catalog.len() == before {
            return Err(RepositoryError::NotFound(format!("permission {id}")));
        }
        Ok(())
    }

    async fn user_permissions(&self, user_id: i64) -> Result<Vec<Permission>, RepositoryError> {
        *self.lookups.lock().unwrap() += 1;
        if self.stalled.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self
            .grants
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_user_permissions(
        &self,
        user_id: i64,
        codes: &PermissionCodes,
    ) -> Result<(), RepositoryError> {
        let mut grants = self.grants.lock().unwrap();
        let held = grants.entry(user_id).or_default();
        for code in codes.iter() {
            if !held.iter().any(|p| &p.code == code) {
                held.push(Permission {
                    id: held.len() as i64 + 1,
                    code: code.clone(),
                });
            }
        }
        Ok(())
    }

    async fn delete_user_permissions(
        &self,
        user_id: i64,
        codes: &PermissionCodes,
    ) -> Result<(), RepositoryError> {
        if let Some(held) = self.grants.lock().unwrap().get_mut(&user_id) {
            held.retain(|p| !codes.iter().any(|c| c == &p.code));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Wait for the `n`th message (1-based) sent from a background task.
    pub async fn wait_for(&self, n: usize) -> MailMessage {
        for _ in 0..200 {
            if let Some(message) = self.sent.lock().unwrap().get(n - 1) {
                return message.clone();
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("mail #{n} was never sent");
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub users: Arc<FakeUsers>,
    pub permissions: Arc<FakePermissions>,
    pub mailer: Arc<RecordingMailer>,
    pub cache: Arc<MemoryCache>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_limiter(None)
    }

    pub fn with_limiter(limiter: Option<LimiterConfig>) -> Self {
        let keys = IdTokenKeys::from_pem(PRIVATE_PEM.as_bytes(), PUBLIC_PEM.as_bytes()).unwrap();
        let cache = Arc::new(MemoryCache::new());
        let users = Arc::new(FakeUsers::default());
        let permissions = Arc::new(FakePermissions::default());
        let mailer = Arc::new(RecordingMailer::default());

        let mut config = ApiConfig {
            jwt_secret: "test-refresh-secret".into(),
            ..ApiConfig::default()
        };
        if let Some(limiter) = limiter.clone() {
            config.limiter = limiter;
        }

        let state = AppState {
            tokens: TokenIssuer::new(
                keys,
                config.jwt_secret.as_bytes(),
                TokenSettings::default(),
                TokenStore::new(cache.clone()),
            ),
            permissions: PermissionService::new(permissions.clone()),
            users: users.clone(),
            mailer: mailer.clone(),
            hasher: PasswordHasher::with_cost("pepper", 4),
            limiter: limiter.map(|l| Arc::new(RateLimiter::new(&l))),
            config,
        };
        Self {
            state,
            users,
            permissions,
            mailer,
            cache,
        }
    }

    pub fn router(&self) -> Router {
        reel_api::router(self.state.clone())
    }

    /// Signed ID token for a user who need not exist in storage.
    pub fn id_token(&self, id: i64) -> String {
        self.state
            .tokens
            .issue_id_token(&Identity {
                id,
                name: "Ada".into(),
                email: "ada@example.com".into(),
            })
            .unwrap()
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub fn request(method: Method, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    TestResponse {
        status,
        headers,
        body,
    }
}
