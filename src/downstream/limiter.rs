//! Connection admission for the downstream pool.
//!
//! # Responsibilities
//! - Cap concurrent connections across all routes
//! - Cap concurrent connections per route, independently of the total
//! - Hand out RAII permits so every exit path releases its slot
//! - Forget route bookkeeping that has gone idle

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::downstream::error::{ErrorKind, FetchError};
use crate::observability::metrics;

/// Snapshot of pool accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Connections currently checked out.
    pub in_flight: usize,
    pub max_total: usize,
    pub max_per_route: usize,
    /// Routes with live per-route bookkeeping.
    pub tracked_routes: usize,
}

/// Two-level semaphore guarding the connection pool.
///
/// A caller takes a per-route slot first, then a global one, so a request
/// stuck behind a busy route never sits on a scarce global slot.
#[derive(Debug)]
pub struct ConnectionLimiter {
    total: Arc<Semaphore>,
    max_total: usize,
    max_per_route: usize,
    routes: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl ConnectionLimiter {
    pub fn new(max_total: usize, max_per_route: usize) -> Self {
        Self {
            total: Arc::new(Semaphore::new(max_total)),
            max_total,
            max_per_route,
            routes: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for a slot on `route`.
    ///
    /// Waits indefinitely; callers bound the wait with their own deadline.
    /// Dropping the returned permit releases both slots.
    pub async fn acquire(&self, route: &str) -> Result<ConnectionPermit, FetchError> {
        let route_slot = self.route_semaphore(route)?;

        let route_permit = route_slot.acquire_owned().await.map_err(|_| closed())?;
        let total_permit = self
            .total
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| closed())?;

        metrics::connection_acquired();
        tracing::trace!(
            route = %route,
            available_total = self.total.available_permits(),
            "Pool slot acquired"
        );

        Ok(ConnectionPermit {
            _route: route_permit,
            _total: total_permit,
        })
    }

    /// Drop bookkeeping for routes with no holders and no waiters.
    ///
    /// Returns the number of routes forgotten.
    pub fn evict_idle_routes(&self) -> usize {
        let Ok(mut routes) = self.routes.lock() else {
            return 0;
        };
        let before = routes.len();
        // The map holds the only reference once nobody is waiting on a route.
        routes.retain(|_, slot| {
            Arc::strong_count(slot) > 1 || slot.available_permits() < self.max_per_route
        });
        before - routes.len()
    }

    pub fn stats(&self) -> PoolStats {
        let tracked_routes = self.routes.lock().map(|r| r.len()).unwrap_or(0);
        PoolStats {
            in_flight: self.max_total - self.total.available_permits(),
            max_total: self.max_total,
            max_per_route: self.max_per_route,
            tracked_routes,
        }
    }

    fn route_semaphore(&self, route: &str) -> Result<Arc<Semaphore>, FetchError> {
        let mut routes = self.routes.lock().map_err(|_| {
            FetchError::new(ErrorKind::Unknown, "connection pool bookkeeping poisoned")
        })?;
        let slot = routes
            .entry(route.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.max_per_route)));
        Ok(Arc::clone(slot))
    }
}

fn closed() -> FetchError {
    FetchError::new(ErrorKind::ConnectionFailure, "connection pool is closed")
}

/// A checked-out pool slot.
///
/// Releases its route and global slots when dropped, including when the
/// owning future is cancelled.
#[derive(Debug)]
pub struct ConnectionPermit {
    _route: OwnedSemaphorePermit,
    _total: OwnedSemaphorePermit,
}

impl Drop for ConnectionPermit {
    fn drop(&mut self) {
        metrics::connection_released();
        tracing::trace!("Pool slot released");
    }
}
