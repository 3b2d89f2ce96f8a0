//! API server configuration.

use std::str::FromStr;
use std::time::Duration;

use reel_core::auth::TokenSettings;
use reel_core::auth::jwt::resolve_jwt_secret;
use tracing::warn;

/// Per-client rate limiting.
#[derive(Clone, Debug, PartialEq)]
pub struct LimiterConfig {
    pub enabled: bool,
    /// Sustained requests per second per client.
    pub rps: f64,
    /// Bucket capacity.
    pub burst: u32,
    /// Entries not seen for this long are evicted.
    pub idle_timeout: Duration,
    pub sweep_interval: Duration,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rps: 2.0,
            burst: 2,
            idle_timeout: Duration::from_secs(180),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:4000").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Base64-encoded PEM of the RSA key that signs ID tokens.
    pub id_token_private_key: String,
    /// Base64-encoded PEM of the matching public key.
    pub id_token_public_key: String,
    /// Refresh-token signing secret.
    pub jwt_secret: String,
    pub password_pepper: String,
    pub tokens: TokenSettings,
    /// Upper bound on any single cache, database or mail call.
    pub request_timeout: Duration,
    /// Public base URL of the API, including the `/api/v1` prefix. Activation
    /// links are built as `{app_host}/activate?...`.
    pub app_host: String,
    pub app_name: String,
    pub limiter: LimiterConfig,
    /// Allowed CORS origins; empty allows any origin.
    pub cors_trusted_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:4000".into(),
            database_url: "postgres://localhost:5432/reel".into(),
            id_token_private_key: String::new(),
            id_token_public_key: String::new(),
            jwt_secret: String::new(),
            password_pepper: String::new(),
            tokens: TokenSettings::default(),
            request_timeout: Duration::from_secs(5),
            app_host: "http://localhost:4000/api/v1".into(),
            app_name: "reel".into(),
            limiter: LimiterConfig::default(),
            cors_trusted_origins: Vec::new(),
        }
    }
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                     | Default                          |
    /// |------------------------------|----------------------------------|
    /// | `BIND_ADDR`                  | `127.0.0.1:4000`                 |
    /// | `DATABASE_URL`               | `postgres://localhost:5432/reel` |
    /// | `ID_TOKEN_PRIVATE_KEY`       | required                         |
    /// | `ID_TOKEN_PUBLIC_KEY`        | required                         |
    /// | `JWT_SECRET`                 | generated & persisted to file    |
    /// | `PASSWORD_PEPPER`            | empty                            |
    /// | `ID_TOKEN_TTL_SECS`          | `900`                            |
    /// | `REFRESH_TOKEN_TTL_SECS`     | `259200`                         |
    /// | `ACTIVATION_TOKEN_TTL_SECS`  | `86400`                          |
    /// | `CTX_DEFAULT_TIMEOUT_SECS`   | `5`                              |
    /// | `APP_HOST`                   | `http://localhost:4000/api/v1`   |
    /// | `APP_NAME`                   | `reel`                           |
    /// | `LIMITER_ENABLED`            | `true`                           |
    /// | `LIMITER_RPS`                | `2`                              |
    /// | `LIMITER_BURST`              | `2`                              |
    /// | `LIMITER_IDLE_SECS`          | `180`                            |
    /// | `LIMITER_SWEEP_SECS`         | `60`                             |
    /// | `CORS_TRUSTED_ORIGINS`       | empty (space or comma separated) |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env_string("BIND_ADDR", defaults.bind_addr),
            database_url: env_string("DATABASE_URL", defaults.database_url),
            id_token_private_key: env_string("ID_TOKEN_PRIVATE_KEY", String::new()),
            id_token_public_key: env_string("ID_TOKEN_PUBLIC_KEY", String::new()),
            jwt_secret: resolve_jwt_secret(),
            password_pepper: env_string("PASSWORD_PEPPER", String::new()),
            tokens: TokenSettings {
                id_token_ttl: env_secs("ID_TOKEN_TTL_SECS", defaults.tokens.id_token_ttl),
                refresh_token_ttl: env_secs(
                    "REFRESH_TOKEN_TTL_SECS",
                    defaults.tokens.refresh_token_ttl,
                ),
                activation_token_ttl: env_secs(
                    "ACTIVATION_TOKEN_TTL_SECS",
                    defaults.tokens.activation_token_ttl,
                ),
            },
            request_timeout: env_secs("CTX_DEFAULT_TIMEOUT_SECS", defaults.request_timeout),
            app_host: env_string("APP_HOST", defaults.app_host),
            app_name: env_string("APP_NAME", defaults.app_name),
            limiter: LimiterConfig {
                enabled: env_parse("LIMITER_ENABLED", defaults.limiter.enabled),
                rps: env_parse("LIMITER_RPS", defaults.limiter.rps),
                burst: env_parse("LIMITER_BURST", defaults.limiter.burst),
                idle_timeout: env_secs("LIMITER_IDLE_SECS", defaults.limiter.idle_timeout),
                sweep_interval: env_secs("LIMITER_SWEEP_SECS", defaults.limiter.sweep_interval),
            },
            cors_trusted_origins: std::env::var("CORS_TRUSTED_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or_default(),
        }
    }
}

fn env_string(name: &str, default: String) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) if !raw.is_empty() => raw.trim().parse().unwrap_or_else(|_| {
            warn!(var = name, value = %raw, "unparseable value, using default");
            default
        }),
        _ => default,
    }
}

/// Durations must be positive; zero falls back to the default.
fn env_secs(name: &str, default: Duration) -> Duration {
    parse_secs(name, std::env::var(name).ok().as_deref(), default)
}

fn parse_secs(name: &str, raw: Option<&str>, default: Duration) -> Duration {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return default;
    };
    match raw.parse::<u64>() {
        Ok(0) => {
            warn!(var = name, "zero duration is not allowed, using default");
            default
        }
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => {
            warn!(var = name, value = %raw, "unparseable value, using default");
            default
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split([' ', ','])
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| o.trim_end_matches('/').to_string())
        .collect()
}
