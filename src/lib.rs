//! Backend-for-frontend demo service with a bounded downstream client.

pub mod config;
pub mod downstream;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use self::config::schema::BffConfig;
pub use self::downstream::{DownstreamClient, ErrorKind, FetchError, FetchResult};
pub use self::http::HttpServer;
pub use self::lifecycle::Shutdown;
