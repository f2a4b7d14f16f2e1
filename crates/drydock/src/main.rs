//! Drydock - Offline-capable resource cache controller

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use url::Url;

mod config;

use config::Config;
use drydock_core::{BroadcastHub, Controller, Manifest, RoutingPolicy};
use drydock_gateway::{AppState, create_router};
use drydock_net::{HttpTransport, TransportConfig};
use drydock_store::{CacheBackend, LocalBackend, MemoryBackend};

/// Drydock - Offline-capable resource cache controller
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "DRYDOCK_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "DRYDOCK_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args.config)?;

    // Initialize logging
    init_logging(&config.logging.level);

    info!("Starting Drydock v{}", env!("CARGO_PKG_VERSION"));

    let origin = Url::parse(&config.origin.url)
        .with_context(|| format!("Invalid origin URL: {}", config.origin.url))?;

    // Initialize the cache backend
    let backend: Arc<dyn CacheBackend> = match config.cache.backend.as_str() {
        "local" => Arc::new(LocalBackend::new(&config.cache.path).await?),
        "memory" => Arc::new(MemoryBackend::new()),
        other => bail!("Unknown cache backend: {}", other),
    };

    // Initialize the network transport
    let transport = Arc::new(HttpTransport::new(TransportConfig {
        skip_tls_verify: config.origin.skip_tls_verify,
    })?);

    // Client hub for readiness, control, and purge notifications
    let hub = Arc::new(BroadcastHub::default());

    let manifest = Manifest::new(
        config.cache.generation.clone(),
        config.manifest.entries.clone(),
    );

    let policy = RoutingPolicy {
        origin: origin.clone(),
        static_hosts: config.policy.static_hosts.clone(),
        bypass_schemes: config.policy.bypass_schemes.clone(),
        fallback_exempt: config.policy.fallback_exempt.clone(),
    };

    let controller = Arc::new(Controller::new(
        backend,
        transport.clone(),
        hub.clone(),
        manifest,
        policy,
        config.manifest.precache_remote,
        &config.policy.offline_path,
    )?);

    // Populate the current generation, then retire stale ones. A store-open
    // failure aborts startup; individual precache failures do not.
    let report = controller
        .install()
        .await
        .context("Failed to install generation")?;
    info!(
        "Precache complete: {} stored, {} failed",
        report.stored.len(),
        report.failed.len()
    );

    let activation = controller
        .activate()
        .await
        .context("Failed to activate generation")?;
    if !activation.deleted.is_empty() {
        info!("Deleted stale generations: {:?}", activation.deleted);
    }

    // Create application state and router
    let state = AppState::new(controller, transport, hub, origin);
    let app = create_router(state).layer(TraceLayer::new_for_http());

    // Determine bind address
    let bind_addr = args.bind.unwrap_or(config.server.bind_address);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind_addr, port).parse()?;

    info!("Listening on {}", addr);
    info!("Origin: {}", config.origin.url);
    info!("Generation: {}", config.cache.generation);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Initialize logging
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Shutdown signal received");
}
