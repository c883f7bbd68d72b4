//! Logistics BFF
//!
//! Serves `GET /api/goods-detail` by calling a slow downstream logistics
//! endpoint through a bounded, pooled HTTP client.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │                     BFF                      │
//!   Client Request   │  ┌─────────┐    ┌─────────┐    ┌──────────┐  │
//!   ─────────────────┼─▶│  axum   │───▶│ handler │───▶│downstream│──┼──▶ slow-api
//!                    │  │ server  │    │         │    │  client  │  │
//!   Client Response  │  └─────────┘    └─────────┘    └────┬─────┘  │
//!   ◀────────────────┼─────────────────────────────────────┘        │
//!                    │                                              │
//!                    │  config · observability · lifecycle          │
//!                    └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use logistics_bff::config::{load_config, validate_config, BffConfig, ClientStrategy, ConfigError};
use logistics_bff::lifecycle::signals::wait_for_signal;
use logistics_bff::observability::{logging, metrics};
use logistics_bff::{DownstreamClient, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "logistics-bff")]
#[command(about = "Backend-for-frontend calling a slow logistics service", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override downstream.target_url.
    #[arg(long)]
    target_url: Option<String>,

    /// Override downstream.strategy (pooled | unpooled).
    #[arg(long)]
    strategy: Option<ClientStrategy>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BffConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(target_url) = cli.target_url {
        config.downstream.target_url = target_url;
    }
    if let Some(strategy) = cli.strategy {
        config.downstream.strategy = strategy;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("logistics-bff v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        target_url = %config.downstream.target_url,
        strategy = ?config.downstream.strategy,
        connect_timeout_ms = config.downstream.connect_timeout_ms,
        response_timeout_ms = config.downstream.response_timeout_ms,
        max_connections_total = config.downstream.max_connections_total,
        max_connections_per_route = config.downstream.max_connections_per_route,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let client = Arc::new(DownstreamClient::new(config.downstream.clone())?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    let server = HttpServer::new(config, client, shutdown);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
