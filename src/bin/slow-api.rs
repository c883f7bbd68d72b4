//! Deliberately slow logistics service used as the BFF's downstream.

use axum::{extract::State, routing::get, Router};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use logistics_bff::lifecycle::signals::wait_for_signal;
use logistics_bff::observability::logging;

#[derive(Parser)]
#[command(name = "slow-api")]
#[command(about = "Slow downstream logistics endpoint for BFF demos", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// Delay before each response, in milliseconds.
    #[arg(short, long, default_value_t = 500)]
    delay_ms: u64,

    /// Response body.
    #[arg(long, default_value = "物流信息: 已发货")]
    body: String,
}

struct Settings {
    delay: Duration,
    body: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_logging("info");

    let settings = Arc::new(Settings {
        delay: Duration::from_millis(cli.delay_ms),
        body: cli.body,
    });

    let app = Router::new()
        .route("/api/logistics", get(logistics_handler))
        .with_state(settings);

    let listener = TcpListener::bind(&cli.bind).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        delay_ms = cli.delay_ms,
        "slow-api listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_signal())
        .await?;
    Ok(())
}

async fn logistics_handler(State(settings): State<Arc<Settings>>) -> String {
    tokio::time::sleep(settings.delay).await;
    settings.body.clone()
}
