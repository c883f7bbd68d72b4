//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Keep connection limits within what a semaphore can hold
//! - Check the per-route limit fits inside the total limit
//! - Check the downstream URL is an absolute http URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BffConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use tokio::sync::Semaphore;
use url::Url;

use crate::config::schema::{BffConfig, ClientConfig};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("max_connections_per_route ({per_route}) exceeds max_connections_total ({total})")]
    PerRouteExceedsTotal { per_route: usize, total: usize },

    #[error("{field} ({value}) exceeds the maximum of {max}")]
    TooLarge {
        field: &'static str,
        value: usize,
        max: usize,
    },

    #[error("invalid target_url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid {field} '{value}'")]
    InvalidAddress { field: &'static str, value: String },
}

/// Validate a full service configuration.
pub fn validate_config(config: &BffConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = match validate_client_config(&config.downstream) {
        Ok(()) => Vec::new(),
        Err(errors) => errors,
    };

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the downstream client section on its own.
pub fn validate_client_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let positive = [
        ("connect_timeout_ms", config.connect_timeout_ms as u128),
        ("response_timeout_ms", config.response_timeout_ms as u128),
        ("max_connections_total", config.max_connections_total as u128),
        ("max_connections_per_route", config.max_connections_per_route as u128),
        ("idle_eviction_interval_ms", config.idle_eviction_interval_ms as u128),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::NotPositive { field });
        }
    }

    let limits = [
        ("max_connections_total", config.max_connections_total),
        ("max_connections_per_route", config.max_connections_per_route),
    ];
    for (field, value) in limits {
        if value > Semaphore::MAX_PERMITS {
            errors.push(ValidationError::TooLarge {
                field,
                value,
                max: Semaphore::MAX_PERMITS,
            });
        }
    }

    if config.max_connections_per_route > config.max_connections_total {
        errors.push(ValidationError::PerRouteExceedsTotal {
            per_route: config.max_connections_per_route,
            total: config.max_connections_total,
        });
    }

    if let Err(reason) = check_target_url(&config.target_url) {
        errors.push(ValidationError::InvalidUrl {
            url: config.target_url.clone(),
            reason,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_target_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}
