//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the TOML config file.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    /// Consensus-layer endpoints and HTTP settings.
    pub beacon: BeaconConfig,

    /// Retry and circuit breaker settings.
    pub resilience: ResilienceConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

/// Beacon API endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BeaconConfig {
    /// Beacon API base URLs, most-preferred first.
    pub endpoints: Vec<String>,

    /// Optional connect timeout in seconds. Unset leaves the HTTP client default.
    pub connect_timeout_secs: Option<u64>,

    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["http://localhost:5052".to_string()],
            connect_timeout_secs: None,
            user_agent: concat!("rocketwatch-beacon/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Retry and circuit breaker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Consecutive transient failures that open a non-terminal node's circuit.
    /// The default of 1 opens on the first failure.
    pub failure_threshold: u32,

    /// Seconds an open circuit waits before admitting a trial call.
    pub recovery_timeout_secs: u64,

    /// Attempts per call on non-terminal nodes (including the first).
    pub max_attempts: u32,

    /// Attempts per call on the terminal node.
    pub terminal_max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 1,
            recovery_timeout_secs: 15,
            max_attempts: 2,
            terminal_max_attempts: 1,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
