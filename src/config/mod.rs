//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → Config (validated, immutable)
//!     → handed to lifecycle::startup, which builds the beacon client once
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the endpoint chain never changes at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{BeaconConfig, Config, ObservabilityConfig, ResilienceConfig};
pub use validation::{validate_config, ValidationError};
