//! Downstream client subsystem.
//!
//! # Data Flow
//! ```text
//! fetch_logistics()
//!     → limiter.rs (per-route slot, then global slot; waits ≤ connect_timeout)
//!     → transport.rs (pooled keep-alive client, or a dedicated connection)
//!     → status check: 2xx → body, otherwise NonSuccessStatus
//!     → error.rs (classify every failure into an ErrorKind)
//! ```
//!
//! # Design Decisions
//! - One client per process, passed explicitly to whoever needs it
//! - Failures are values (`FetchResult`), never panics
//! - No retries here; callers own retry policy
//! - Permits are RAII guards, so cancellation cannot leak pool slots

pub mod client;
pub mod error;
pub mod limiter;
mod transport;

pub use client::DownstreamClient;
pub use error::{BuildError, ErrorKind, FetchError, FetchResult};
pub use limiter::{ConnectionLimiter, ConnectionPermit, PoolStats};
