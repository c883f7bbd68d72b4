//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BffConfig (validated, immutable)
//!     → ClientConfig handed to the downstream client at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::BffConfig;
pub use schema::ClientConfig;
pub use schema::ClientStrategy;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use validation::{validate_client_config, validate_config, ValidationError};
