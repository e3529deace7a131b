//! Warden - Account registration and token authentication service

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use config::{Config, LogFormat, RevocationBackend};
use warden_api::{AppState, create_router};
use warden_auth::{
    AuthService, CredentialHasher, JwtManager, MemoryStore, RedisStore, RevocationStore,
};
use warden_db::{Database, DatabaseOptions};

/// Warden - Account registration and token authentication service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "WARDEN_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "WARDEN_PORT")]
    port: Option<u16>,

    /// Token signing secret
    #[arg(long, env = "WARDEN_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Redis URL for the revocation store
    #[arg(long, env = "WARDEN_REDIS_URL")]
    redis_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(&args.config)?;
    config.apply_overrides(args.jwt_secret, args.redis_url);
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", args.config))?;

    // Initialize logging
    init_logging(&config.logging.level, config.logging.format);

    info!("Starting Warden v{}", env!("CARGO_PKG_VERSION"));

    if config.uses_default_secret() {
        warn!("Using the built-in JWT secret; set auth.jwt_secret or WARDEN_JWT_SECRET");
    }

    // Initialize database
    if let Some(parent) = std::path::Path::new(&config.database.path).parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    let db_path = format!("sqlite:{}?mode=rwc", config.database.path);
    let db = Database::new(
        &db_path,
        DatabaseOptions {
            max_connections: config.database.max_connections,
            username_policy: config.database.username_policy,
        },
    )
    .await?;

    // Initialize credential hashing and tokens
    let hasher = CredentialHasher::new(&config.auth.hashing)?;
    let jwt = Arc::new(JwtManager::new(
        &config.auth.jwt_secret,
        config.auth.token_ttl_hours,
    ));

    // Initialize revocation store
    let revocations = match config.revocation.backend {
        RevocationBackend::Redis => {
            let store = RedisStore::connect(&config.revocation.redis_url)
                .await
                .context("Failed to connect to the Redis revocation store")?;
            RevocationStore::new(Arc::new(store))
        }
        RevocationBackend::Memory => {
            warn!("Using in-memory revocation store; logouts are lost on restart");
            RevocationStore::new(Arc::new(MemoryStore::new()))
        }
    };

    let auth = Arc::new(AuthService::new(
        db,
        hasher,
        jwt,
        revocations,
        config.auth.password_change_policy,
    ));

    // Install the Prometheus recorder
    let metrics_handle = if config.metrics.enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(Arc::new(handle))
    } else {
        None
    };

    // Create router
    let app = create_router(AppState::new(auth), metrics_handle).layer(TraceLayer::new_for_http());

    // Determine bind address
    let bind_addr = args.bind.unwrap_or(config.server.bind_address);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind_addr, port).parse()?;

    info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Initialize logging
fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Shutdown signal received");
}
