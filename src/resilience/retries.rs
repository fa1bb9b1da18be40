//! Retry policy for a single chain node.
//!
//! # Responsibilities
//! - Decide whether an error is retryable (transient network failures only)
//! - Bound the number of attempts per node
//! - Space attempts with jittered exponential backoff
//!
//! Non-terminal nodes retry before handing over to their fallback. The terminal
//! node gets a single attempt since nothing sits behind it.

use std::time::Duration;

use crate::beacon::types::BeaconError;
use crate::config::ResilienceConfig;
use crate::resilience::backoff::Backoff;

/// Attempt budget and spacing for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Policy for a node, depending on whether it is the terminal one.
    pub fn for_node(config: &ResilienceConfig, terminal: bool) -> Self {
        let max_attempts = if terminal {
            config.terminal_max_attempts
        } else {
            config.max_attempts
        };
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::from_millis(config.base_delay_ms, config.max_delay_ms),
        }
    }

    /// Whether another attempt should follow a failed `attempt` (1-based).
    pub fn should_retry(&self, attempt: u32, error: &BeaconError) -> bool {
        attempt < self.max_attempts && is_retryable(error)
    }

    /// Delay before the attempt following `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

/// Transient failures (HTTP error, connection error, connect timeout) are retryable.
pub fn is_retryable(error: &BeaconError) -> bool {
    error.is_transient()
}
