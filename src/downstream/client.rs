//! The downstream logistics client.
//!
//! # Call State Machine
//! ```text
//! Idle → AcquiringConnection → AwaitingResponse → Succeeded | Failed
//! ```
//! One pass per call; no retries, no resumption.
//!
//! # Timing
//! - Waiting for a pool slot is bounded by `connect_timeout`
//! - Connecting and reading the response are bounded by their own timeouts
//! - The whole call never exceeds `connect_timeout + response_timeout`

use http::Uri;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::{validate_client_config, ClientConfig, ClientStrategy, ValidationError};
use crate::downstream::error::{BuildError, FetchError, FetchResult};
use crate::downstream::limiter::{ConnectionLimiter, PoolStats};
use crate::downstream::transport::{Deadlines, Transport};
use crate::observability::metrics;

/// Bounded HTTP client for the fixed downstream logistics endpoint.
///
/// Build one per process and share it (typically behind an `Arc`); every
/// method takes `&self` and is safe to call from any number of tasks.
pub struct DownstreamClient {
    config: ClientConfig,
    target: Uri,
    /// Pool key: scheme, host and port of the target.
    route: String,
    limiter: Arc<ConnectionLimiter>,
    transport: Transport,
    sweeper: Option<JoinHandle<()>>,
}

impl DownstreamClient {
    /// Build a client and its pool.
    ///
    /// Construction is synchronous and only fails on an invalid
    /// configuration. When called inside a Tokio runtime, an idle sweeper is
    /// started on `idle_eviction_interval`; it stops when the client drops.
    pub fn new(config: ClientConfig) -> Result<Self, BuildError> {
        validate_client_config(&config).map_err(BuildError::Invalid)?;

        let url = Url::parse(&config.target_url).map_err(|e| {
            BuildError::Invalid(vec![ValidationError::InvalidUrl {
                url: config.target_url.clone(),
                reason: e.to_string(),
            }])
        })?;
        let target: Uri = config.target_url.parse()?;
        let route = route_key(&url);

        let limiter = Arc::new(ConnectionLimiter::new(
            config.max_connections_total,
            config.max_connections_per_route,
        ));
        let transport = Transport::new(&config, &url);
        let sweeper = spawn_sweeper(&limiter, config.idle_eviction_interval());

        tracing::debug!(
            target_url = %config.target_url,
            strategy = ?config.strategy,
            max_total = config.max_connections_total,
            max_per_route = config.max_connections_per_route,
            "Downstream client created"
        );

        Ok(Self {
            config,
            target,
            route,
            limiter,
            transport,
            sweeper,
        })
    }

    /// GET the logistics endpoint.
    ///
    /// Dropping the returned future abandons the call and releases its pool
    /// slot and socket.
    pub async fn fetch_logistics(&self) -> FetchResult {
        let started = Instant::now();
        let result = self.execute(started).await;
        metrics::record_fetch(&result, started.elapsed());
        result
    }

    /// GET the logistics endpoint, giving up when `cancel` fires.
    ///
    /// Returns an `Interrupted` failure on cancellation. The token is left
    /// cancelled so the caller's own tasks observe it too.
    pub async fn fetch_logistics_until(&self, cancel: &CancellationToken) -> FetchResult {
        let started = Instant::now();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let result = Err(FetchError::interrupted());
                metrics::record_fetch(&result, started.elapsed());
                result
            }
            result = self.fetch_logistics() => result,
        }
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.limiter.stats()
    }

    pub fn strategy(&self) -> ClientStrategy {
        self.config.strategy
    }

    async fn execute(&self, started: Instant) -> FetchResult {
        let connect_timeout = self.config.connect_timeout();
        let response_timeout = self.config.response_timeout();

        tracing::trace!(route = %self.route, "Acquiring connection");
        let permit = match time::timeout_at(
            started + connect_timeout,
            self.limiter.acquire(&self.route),
        )
        .await
        {
            Ok(permit) => permit?,
            Err(_) => return Err(FetchError::pool_saturated(connect_timeout)),
        };

        tracing::trace!(route = %self.route, "Awaiting response");
        let deadlines = Deadlines {
            overall: started + connect_timeout + response_timeout,
            connect_timeout,
            response_timeout,
        };
        let exchange = self.transport.get(&self.target, deadlines).await;
        drop(permit);

        let (status, body) = exchange?;
        if !status.is_success() {
            return Err(FetchError::status(status.as_u16()));
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

impl Drop for DownstreamClient {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}

fn route_key(url: &Url) -> String {
    format!(
        "{}://{}:{}",
        url.scheme(),
        url.host_str().unwrap_or_default(),
        url.port_or_known_default().unwrap_or(80)
    )
}

/// Periodically forget idle route bookkeeping.
///
/// The task holds only a weak reference, so it also ends on its own once
/// the limiter is gone.
fn spawn_sweeper(limiter: &Arc<ConnectionLimiter>, interval: Duration) -> Option<JoinHandle<()>> {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        tracing::debug!("No Tokio runtime; idle sweeper not started");
        return None;
    };
    let limiter = Arc::downgrade(limiter);

    Some(handle.spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(limiter) = limiter.upgrade() else {
                break;
            };
            let evicted = limiter.evict_idle_routes();
            if evicted > 0 {
                tracing::debug!(evicted, "Evicted idle downstream routes");
            }
        }
    }))
}
