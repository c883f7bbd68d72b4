//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the BFF.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the BFF service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BffConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Downstream client configuration.
    pub downstream: ClientConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// How the downstream client obtains connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClientStrategy {
    /// Keep-alive pool shared by all calls.
    #[default]
    Pooled,
    /// A dedicated connection per call, closed after the response.
    Unpooled,
}

impl std::str::FromStr for ClientStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pooled" => Ok(ClientStrategy::Pooled),
            "unpooled" => Ok(ClientStrategy::Unpooled),
            other => Err(format!("unknown client strategy '{}'", other)),
        }
    }
}

/// Downstream client configuration.
///
/// Immutable once the client is built.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Absolute URL of the downstream logistics endpoint.
    pub target_url: String,

    /// Connection establishment timeout in milliseconds. Also bounds the
    /// wait for a free pool slot.
    pub connect_timeout_ms: u64,

    /// Time allowed for the full response in milliseconds.
    pub response_timeout_ms: u64,

    /// Maximum concurrent connections across all routes.
    pub max_connections_total: usize,

    /// Maximum concurrent connections to a single route.
    pub max_connections_per_route: usize,

    /// Interval between idle eviction sweeps in milliseconds.
    pub idle_eviction_interval_ms: u64,

    /// Connection strategy.
    pub strategy: ClientStrategy,
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn idle_eviction_interval(&self) -> Duration {
        Duration::from_millis(self.idle_eviction_interval_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            target_url: "http://slow-api:8080/api/logistics".to_string(),
            connect_timeout_ms: 5_000,
            response_timeout_ms: 10_000,
            max_connections_total: 12_000,
            max_connections_per_route: 12_000,
            idle_eviction_interval_ms: 60_000,
            strategy: ClientStrategy::Pooled,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
