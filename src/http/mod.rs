//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (assign request ID)
//!     → handler calls DownstreamClient
//!     → response.rs (compose body or map failure to status)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use response::{goods_detail_body, status_for, DownstreamFailure, GOODS_DETAIL_PREFIX};
pub use server::{AppState, HttpServer};
