//! autodiag-api - Guided Vehicle Diagnosis Microservice
//!
//! **Module Identity:**
//! - Name: autodiag-api
//! - Default port: 5050
//!
//! Runs the two-step guided diagnosis flow (intake questions, then a final
//! diagnosis with repair videos) over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use autodiag_api::AppState;
use autodiag_common::config::{load_or_default, ConfigPathResolver};

/// Command-line arguments for autodiag-api
#[derive(Parser, Debug)]
#[command(name = "autodiag-api")]
#[command(about = "Guided vehicle diagnosis microservice")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long, env = "AUTODIAG_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "AUTODIAG_PORT")]
    port: Option<u16>,

    /// Bind address (overrides config)
    #[arg(short, long, env = "AUTODIAG_BIND_ADDRESS")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config comes first so its log level can seed the filter
    let resolver = ConfigPathResolver::new(args.config.clone());
    let config = load_or_default(&resolver).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&config.logging.level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting autodiag-api (Guided Diagnosis) microservice");
    info!(
        "Version: {} (git {}, {} build)",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        if cfg!(debug_assertions) { "debug" } else { "release" }
    );
    match resolver.resolve() {
        Some(path) => info!("Config: {}", path.display()),
        None => info!("Config: built-in defaults"),
    }

    let orchestrator =
        autodiag_api::config::build_orchestrator(&config).context("Failed to configure providers")?;
    let state = AppState::new(orchestrator);
    let app = autodiag_api::build_router(state);

    let bind = args.bind.unwrap_or_else(|| config.bind_address.clone());
    let port = args.port.unwrap_or(config.port);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address: {}:{}", bind, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
