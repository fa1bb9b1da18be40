//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics. Every problem found is
//! reported, not just the first.

use std::collections::HashSet;
use thiserror::Error;
use url::Url;

use crate::config::schema::Config;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("beacon.endpoints must contain at least one URL")]
    NoEndpoints,

    #[error("beacon endpoint '{url}' is not a valid URL: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("beacon endpoint '{0}' must use http or https")]
    UnsupportedScheme(String),

    #[error("beacon endpoint '{0}' is listed more than once")]
    DuplicateEndpoint(String),

    #[error("resilience.{field} must be at least 1")]
    ZeroValue { field: &'static str },

    #[error("resilience.base_delay_ms ({base}) exceeds resilience.max_delay_ms ({max})")]
    DelayRange { base: u64, max: u64 },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.beacon.endpoints.is_empty() {
        errors.push(ValidationError::NoEndpoints);
    }

    let mut seen = HashSet::new();
    for raw in &config.beacon.endpoints {
        match Url::parse(raw) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    errors.push(ValidationError::UnsupportedScheme(raw.clone()));
                }
                if !seen.insert(url) {
                    errors.push(ValidationError::DuplicateEndpoint(raw.clone()));
                }
            }
            Err(e) => errors.push(ValidationError::InvalidEndpoint {
                url: raw.clone(),
                reason: e.to_string(),
            }),
        }
    }

    let resilience = &config.resilience;
    let counts = [
        ("failure_threshold", u64::from(resilience.failure_threshold)),
        ("recovery_timeout_secs", resilience.recovery_timeout_secs),
        ("max_attempts", u64::from(resilience.max_attempts)),
        ("terminal_max_attempts", u64::from(resilience.terminal_max_attempts)),
    ];
    for (field, value) in counts {
        if value == 0 {
            errors.push(ValidationError::ZeroValue { field });
        }
    }

    if resilience.base_delay_ms > resilience.max_delay_ms {
        errors.push(ValidationError::DelayRange {
            base: resilience.base_delay_ms,
            max: resilience.max_delay_ms,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
