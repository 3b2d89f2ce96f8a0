//! Reel API server binary.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use reel_api::AppState;
use reel_api::config::ApiConfig;
use reel_core::cache::MemoryCache;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How often expired token-cache entries are purged.
const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "reel_api_server", about = "Reel API server")]
struct Args {
    /// Port to listen on; overrides the port in `BIND_ADDR`.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/reel"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 25)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,reel_api=debug,reel_core=debug")),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    config.database_url = args.database_url;
    if let Some(port) = args.port {
        let host = config
            .bind_addr
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "127.0.0.1".into());
        config.bind_addr = format!("{host}:{port}");
    }

    info!(
        bind_addr = %config.bind_addr,
        max_connections = args.max_connections,
        limiter = config.limiter.enabled,
        "starting reel_api_server"
    );

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database_url)
        .await?;

    info!("running database migrations");
    reel_api::migrate(&pool).await?;

    let shutdown = CancellationToken::new();

    let cache = Arc::new(MemoryCache::new());
    let purge_handle = cache.spawn_purge_task(CACHE_PURGE_INTERVAL, shutdown.clone());

    let state = AppState::new(config.clone(), pool, cache)?;
    let sweeper_handle = state
        .limiter
        .as_ref()
        .map(|limiter| limiter.spawn_sweeper(config.limiter.sweep_interval, shutdown.clone()));

    let app = reel_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    let api_result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown({
        let shutdown = shutdown.clone();
        async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("shutdown signal received"),
                _ = shutdown.cancelled() => {}
            }
        }
    })
    .await;

    // Stop background tasks whichever way the server exited.
    shutdown.cancel();
    if let Err(e) = purge_handle.await {
        warn!(error = %e, "cache purge task failed");
    }
    if let Some(handle) = sweeper_handle
        && let Err(e) = handle.await
    {
        warn!(error = %e, "rate limiter sweeper failed");
    }

    api_result?;
    info!("server stopped");
    Ok(())
}
