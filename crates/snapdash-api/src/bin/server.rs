//! Snapdash dashboard server
//!
//! # Environment Variables
//!
//! - `DATABASE_URL`: SQLite URL or PostgreSQL URL (default: sqlite://snapdash.db)
//! - `REDIS_URL`: Redis for the cache/notify relay (default: in-process relay)
//! - `API_PORT`: HTTP port (default: 5000)
//! - `QUERY_TIMEOUT_SECS`: Per-query timeout (default: 30)
//! - `JWT_SECRET`: required; `JWT_ENABLED=false` serves fragments ungated.
//!   Other `JWT_*` settings: see `snapdash_api::jwt`
//! - `SHUTDOWN_TIMEOUT_SECS`: Drain time after SIGINT/SIGTERM (default: 30)
//! - `RUST_LOG`: Log filter (default: info)
//!
//! # Example
//!
//! ```bash
//! export DATABASE_URL=sqlite://./data/snapdash.db
//! export REDIS_URL=redis://localhost:6379
//! cargo run --bin snapdash-server
//!
//! # Mint a dashboard token with the configured secret
//! cargo run --bin snapdash-server -- --issue-token analyst-7
//! ```

use snapdash_api::jwt::JwtService;
use snapdash_api::shutdown::serve_with_shutdown;
use snapdash_api::{create_router, AppState, ServerConfig};
use snapdash_relay::{MemoryRelay, RedisRelay, ViewRelay};
use snapdash_store::SqliteDashboardStore;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;

    let args: Vec<String> = std::env::args().collect();
    if args.len() == 3 && args[1] == "--issue-token" {
        let jwt = config
            .jwt
            .clone()
            .ok_or("JWT_ENABLED=false, there is no secret to sign with")?;
        println!("{}", JwtService::new(jwt).generate_token(args[2].as_str(), None)?);
        return Ok(());
    }

    info!(
        database = %config.database_url,
        relay = config.redis_url.as_deref().unwrap_or("in-process"),
        port = config.port,
        query_timeout = ?config.query_timeout,
        jwt = config.jwt.is_some(),
        "Starting snapdash"
    );

    let relay: Arc<dyn ViewRelay> = match &config.redis_url {
        Some(url) => Arc::new(RedisRelay::connect(url).await?),
        None => Arc::new(MemoryRelay::new()),
    };
    info!(backend = relay.backend(), "Relay ready");

    let state = if config.is_postgres() {
        #[cfg(feature = "postgres")]
        {
            let store = snapdash_store::PostgresDashboardStore::new(&config.database_url)
                .await?
                .with_query_timeout(config.query_timeout);
            AppState::new(Arc::new(store), relay)
        }
        #[cfg(not(feature = "postgres"))]
        {
            return Err("DATABASE_URL is PostgreSQL but the server was built without the postgres feature".into());
        }
    } else {
        let store = SqliteDashboardStore::connect(&config.database_url)
            .await?
            .with_query_timeout(config.query_timeout);
        AppState::new(Arc::new(store), relay)
    };
    info!(postgres = config.is_postgres(), "Store ready");

    let router = create_router(state.with_jwt(config.jwt));
    serve_with_shutdown(router, config.port, config.shutdown).await?;

    Ok(())
}
