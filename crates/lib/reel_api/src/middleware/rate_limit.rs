//! Per-client token-bucket rate limiting with idle eviction.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::LimiterConfig;
use crate::error::AppError;

/// Key used when the peer address is unknown (e.g. in-process requests).
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Shortest sweep period; `tokio::time::interval` panics on zero.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Token bucket: holds up to `capacity` tokens, refilled at `refill_rate` per second.
#[derive(Debug)]
struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: u32, refill_rate: f64, now: Instant) -> Self {
        Self {
            capacity: f64::from(capacity),
            tokens: f64::from(capacity),
            refill_rate,
            last_refill: now,
        }
    }

    fn try_consume(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }
}

#[derive(Debug)]
struct ClientEntry {
    bucket: TokenBucket,
    last_seen: Instant,
}

/// Shared map of client IP to token bucket.
#[derive(Debug)]
pub struct RateLimiter {
    clients: DashMap<String, ClientEntry>,
    rps: f64,
    burst: u32,
    idle_timeout: Duration,
}

impl RateLimiter {
    pub fn new(config: &LimiterConfig) -> Self {
        Self {
            clients: DashMap::new(),
            rps: config.rps,
            burst: config.burst,
            idle_timeout: config.idle_timeout,
        }
    }

    /// Take one token for `client`, creating its bucket on first sight.
    /// Returns `false` when the bucket is empty.
    pub fn check(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut entry = self
            .clients
            .entry(client.to_string())
            .or_insert_with(|| ClientEntry {
                bucket: TokenBucket::new(self.burst, self.rps, now),
                last_seen: now,
            });
        entry.last_seen = now;
        entry.bucket.try_consume(now)
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn contains(&self, client: &str) -> bool {
        self.clients.contains_key(client)
    }

    /// Evict clients idle for at least the configured timeout. Returns how
    /// many were removed.
    ///
    /// Stale keys are collected first and removed one at a time, re-checking
    /// each entry under its own lock, so a client that reappears mid-sweep
    /// keeps its bucket.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let stale: Vec<String> = self
            .clients
            .iter()
            .filter(|entry| now.duration_since(entry.last_seen) >= self.idle_timeout)
            .map(|entry| entry.key().clone())
            .collect();

        stale
            .into_iter()
            .filter(|client| {
                self.clients
                    .remove_if(client, |_, entry| {
                        now.duration_since(entry.last_seen) >= self.idle_timeout
                    })
                    .is_some()
            })
            .count()
    }

    /// Spawn the periodic sweeper. It stops when `shutdown` is cancelled.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        every: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        let every = every.max(MIN_SWEEP_INTERVAL);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        let evicted = limiter.sweep();
                        if evicted > 0 {
                            debug!(evicted, remaining = limiter.len(), "rate limiter sweep");
                        }
                    }
                }
            }
            debug!("rate limiter sweeper stopped");
        })
    }
}

/// Rejects requests with 429 once the client's bucket is empty.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_ip(&request);
    if !limiter.check(&client) {
        warn!(client_ip = %client, "rate limit exceeded");
        return Err(AppError::TooManyRequests);
    }
    Ok(next.run(request).await)
}

fn client_ip(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
