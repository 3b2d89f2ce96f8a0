//! # reel_api
//!
//! HTTP API library for Reel.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{MethodRouter, delete, get, post, put};
use reel_core::auth::jwt::IdTokenKeys;
use reel_core::auth::password::PasswordHasher;
use reel_core::auth::{AuthError, TokenIssuer, TokenStore};
use reel_core::cache::CacheStore;
use reel_core::mailer::{LogMailer, Mailer};
use reel_core::permissions::{PermissionService, PgPermissionRepository};
use reel_core::users::{PgUserRepository, UserRepository};
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::ApiConfig;
use crate::handlers::{auth, health, permissions};
use crate::middleware::auth::{authenticate, require_auth};
use crate::middleware::permission::{PermissionGate, require_permission};
use crate::middleware::rate_limit::{RateLimiter, rate_limit};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: ApiConfig,
    pub tokens: TokenIssuer,
    pub permissions: PermissionService,
    pub users: Arc<dyn UserRepository>,
    pub mailer: Arc<dyn Mailer>,
    pub hasher: PasswordHasher,
    /// `None` when rate limiting is disabled.
    pub limiter: Option<Arc<RateLimiter>>,
}

impl AppState {
    /// Wire PostgreSQL-backed collaborators and the given token cache.
    pub fn new(
        config: ApiConfig,
        pool: PgPool,
        cache: Arc<dyn CacheStore>,
    ) -> Result<Self, AuthError> {
        let keys =
            IdTokenKeys::from_base64_pem(&config.id_token_private_key, &config.id_token_public_key)?;
        let tokens = TokenIssuer::new(
            keys,
            config.jwt_secret.as_bytes(),
            config.tokens,
            TokenStore::new(cache),
        );
        let permissions = PermissionService::new(Arc::new(PgPermissionRepository::new(pool.clone())));
        let limiter = config
            .limiter
            .enabled
            .then(|| Arc::new(RateLimiter::new(&config.limiter)));
        Ok(Self {
            hasher: PasswordHasher::new(config.password_pepper.clone()),
            mailer: Arc::new(LogMailer::new(format!("{} <noreply@localhost>", config.app_name))),
            users: Arc::new(PgUserRepository::new(pool)),
            tokens,
            permissions,
            limiter,
            config,
        })
    }
}

/// Run embedded database migrations.
///
/// Delegates to `reel_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    reel_core::migrate::migrate(pool).await
}

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Wrap `route` in a gate requiring `code`.
fn gated(
    state: &AppState,
    code: &'static str,
    route: MethodRouter<AppState>,
) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(
        PermissionGate::new(code, state),
        require_permission,
    ))
}

fn cors_layer(trusted: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
    if trusted.is_empty() {
        return cors.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = trusted
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Builds the Axum router with all routes and shared state.
///
/// Requests pass the rate limiter, then authentication, then any per-route
/// permission gate before reaching a handler.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/v1/healthcheck", get(health::healthcheck_handler))
        .route("/api/v1/auth/users/register", post(auth::sign_up_handler))
        .route("/api/v1/auth/users/login", post(auth::sign_in_handler))
        .route("/api/v1/auth/refresh", post(auth::refresh_handler))
        .route("/api/v1/auth/activation", post(auth::resend_activation_handler))
        .route("/api/v1/activate", get(auth::activate_handler))
        .route(
            "/api/v1/auth/signout",
            post(auth::sign_out_handler).route_layer(from_fn(require_auth)),
        );

    let admin = Router::new()
        .route(
            "/api/v1/permissions",
            gated(&state, "permission:add", post(permissions::add_permission_handler)).merge(
                gated(
                    &state,
                    "permission:update",
                    put(permissions::update_permission_handler),
                ),
            ),
        )
        .route(
            "/api/v1/permissions/{id}",
            gated(&state, "permission:view", get(permissions::get_permission_handler)).merge(
                gated(
                    &state,
                    "permission:delete",
                    delete(permissions::delete_permission_handler),
                ),
            ),
        )
        .route(
            "/api/v1/permissions/users/{id}",
            gated(&state, "permission:view", get(permissions::user_permissions_handler))
                .merge(gated(
                    &state,
                    "permission:grant",
                    post(permissions::grant_permissions_handler),
                ))
                .merge(gated(
                    &state,
                    "permission:revoke",
                    delete(permissions::revoke_permissions_handler),
                )),
        );

    let mut app = Router::new()
        .merge(public)
        .merge(admin)
        .layer(from_fn_with_state(state.clone(), authenticate));

    if let Some(limiter) = state.limiter.clone() {
        app = app.layer(from_fn_with_state(limiter, rate_limit));
    }

    app.layer(cors_layer(&state.config.cors_trusted_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
