//! Metrics for the endpoint chain.
//!
//! # Metrics
//! - `beacon_requests_total` (counter): attempts by endpoint and outcome
//! - `beacon_fallbacks_total` (counter): fallback hops by source and target endpoint
//! - `beacon_circuit_state` (gauge): 0=closed, 1=half-open, 2=open
//!
//! Recording is a no-op until the host process installs a recorder.

use crate::resilience::CircuitState;

/// Outcome label for an attempt against one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Transient,
    Rejected,
}

impl AttemptOutcome {
    fn as_str(self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::Transient => "transient_error",
            AttemptOutcome::Rejected => "rejected",
        }
    }
}

pub fn record_attempt(endpoint: &str, outcome: AttemptOutcome) {
    metrics::counter!(
        "beacon_requests_total",
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

pub fn record_fallback(from: &str, to: &str) {
    metrics::counter!(
        "beacon_fallbacks_total",
        "from" => from.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
}

pub fn record_circuit_state(endpoint: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    metrics::gauge!("beacon_circuit_state", "endpoint" => endpoint.to_string()).set(value);
}
