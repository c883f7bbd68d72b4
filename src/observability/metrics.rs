//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bff_downstream_requests_total` (counter): calls by outcome
//! - `bff_downstream_request_duration_seconds` (histogram): call latency
//! - `bff_downstream_in_flight` (gauge): pool slots currently held
//! - `bff_http_requests_total` (counter): BFF responses by status

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

use crate::downstream::FetchResult;

/// Start the Prometheus scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record the outcome of one downstream call.
pub fn record_fetch(result: &FetchResult, elapsed: Duration) {
    let outcome = match result {
        Ok(_) => "success",
        Err(e) => e.kind().as_str(),
    };
    metrics::counter!("bff_downstream_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("bff_downstream_request_duration_seconds", "outcome" => outcome)
        .record(elapsed.as_secs_f64());
}

pub fn connection_acquired() {
    metrics::gauge!("bff_downstream_in_flight").increment(1.0);
}

pub fn connection_released() {
    metrics::gauge!("bff_downstream_in_flight").decrement(1.0);
}

/// Record a response sent by the BFF itself.
pub fn record_response(status: u16) {
    metrics::counter!("bff_http_requests_total", "status" => status.to_string()).increment(1);
}
