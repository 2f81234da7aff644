//! pvr-vr - Property valuation resolver service
//!
//! Serves `GET /api/value` (multi-provider AVM resolution) and `GET /health`.
//!
//! Settings priority: command line > environment > TOML > built-in defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pvr_common::config;
use pvr_vr::valuation::ValuationResolver;
use pvr_vr::{build_router, AppState};

/// Command-line arguments for pvr-vr
#[derive(Parser, Debug)]
#[command(name = "pvr-vr")]
#[command(about = "Property valuation resolver (ATTOM + RentCast)")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides TOML)
    #[arg(short, long, env = "PVR_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides TOML)
    #[arg(short, long, env = "PVR_BIND")]
    bind: Option<String>,

    /// Path to TOML config file (falls back to PVR_CONFIG, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is loaded before tracing so the configured log level applies
    let config_path = config::resolve_config_path(args.config.as_deref());
    let toml_config =
        config::load_or_default(config_path.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = &toml_config.logging.level;
            format!("pvr_vr={level},pvr_common={level},tower_http=info").into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting PVR valuation resolver (pvr-vr) v{}",
        env!("CARGO_PKG_VERSION")
    );
    match &config_path {
        Some(path) if path.exists() => info!("Config file: {}", path.display()),
        Some(path) => info!("Config file {} not found, using defaults", path.display()),
        None => info!("No config file, using defaults"),
    }

    let resolver =
        ValuationResolver::from_config(&toml_config).context("Failed to initialize resolver")?;
    let app = build_router(AppState::new(resolver));

    let port = args.port.unwrap_or(toml_config.port);
    let bind = args.bind.unwrap_or_else(|| toml_config.bind_address.clone());
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("pvr-vr listening on http://{}", addr);
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
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
