//! Circuit breaker guarding a single beacon endpoint.
//!
//! # States
//! - Closed: normal operation, calls reach the endpoint
//! - Open: endpoint assumed down, calls go straight to the fallback
//! - Half-Open: one trial call checks whether the endpoint recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive transient failures >= threshold
//! Open → Half-Open: recovery timeout elapsed since opening
//! Half-Open → Closed: trial call succeeds
//! Half-Open → Open: trial call fails (timer restarts)
//! ```
//!
//! Only the holder of the [`TrialGuard`] moves the breaker out of Half-Open.
//! Calls admitted while the circuit was still closed can finish late; their
//! outcome only touches the failure count.
//!
//! Elapsed time uses `tokio::time::Instant`, so a paused test clock drives it.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use serde::Serialize;
use tokio::time::Instant;

use crate::observability::metrics;

/// Breaker state as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Answer to "may I call the endpoint now?".
#[derive(Debug)]
pub enum Admission<'a> {
    /// Circuit closed; call normally.
    Allowed,
    /// Circuit half-open and this caller holds the single trial slot.
    Trial(TrialGuard<'a>),
    /// Circuit open (or trial already in flight); use the fallback.
    Rejected,
}

impl Admission<'_> {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Admission::Rejected)
    }
}

/// The half-open trial slot. Only the holder can close or re-open the circuit;
/// dropping it unsettled frees the slot for the next caller.
#[derive(Debug)]
#[must_use = "dropping the guard releases the trial slot"]
pub struct TrialGuard<'a> {
    breaker: &'a CircuitBreaker,
    settled: bool,
}

impl TrialGuard<'_> {
    /// The endpoint answered: close the circuit.
    pub fn succeed(mut self) {
        self.settled = true;
        self.breaker.close_after_trial();
    }

    /// The trial hit a transient failure: re-open the circuit and restart the timer.
    /// Always returns true (the circuit is open afterwards).
    pub fn fail(mut self) -> bool {
        self.settled = true;
        self.breaker.reopen_after_trial();
        true
    }
}

impl Drop for TrialGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.release_trial();
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

/// Consecutive-failure circuit breaker with a time-based recovery window.
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Label used in logs and metrics (the endpoint URL).
    name: String,
    failure_threshold: u32,
    recovery_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a closed breaker. A threshold of 0 is treated as 1.
    pub fn new(name: impl Into<String>, failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    /// Current state, applying any due Open → Half-Open transition.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        self.refresh(&mut inner);
        inner.state
    }

    /// Number of transient failures since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    /// Decide whether a call may reach the endpoint.
    pub fn try_acquire(&self) -> Admission<'_> {
        let mut inner = self.lock();
        self.refresh(&mut inner);

        match inner.state {
            CircuitState::Closed => Admission::Allowed,
            CircuitState::Open => Admission::Rejected,
            CircuitState::HalfOpen if inner.trial_in_flight => Admission::Rejected,
            CircuitState::HalfOpen => {
                inner.trial_in_flight = true;
                tracing::debug!(endpoint = %self.name, "Circuit half-open, admitting trial call");
                Admission::Trial(TrialGuard {
                    breaker: self,
                    settled: false,
                })
            }
        }
    }

    /// Record that the endpoint answered a call admitted while the circuit was closed.
    ///
    /// Only resets the failure count: a late answer never leaves Open or Half-Open,
    /// that is the trial holder's job.
    pub fn record_success(&self) {
        self.lock().consecutive_failures = 0;
    }

    /// Record a transient failure of a call admitted while the circuit was closed.
    /// Returns true when this failure opened the circuit.
    pub fn record_failure(&self) -> bool {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            return false;
        }

        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        if inner.consecutive_failures < self.failure_threshold {
            return false;
        }
        tracing::warn!(
            endpoint = %self.name,
            failures = inner.consecutive_failures,
            recovery_secs = self.recovery_timeout.as_secs_f64(),
            "Circuit opened"
        );
        self.open(&mut inner);
        true
    }

    fn close_after_trial(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = 0;
        inner.trial_in_flight = false;
        if inner.state == CircuitState::HalfOpen {
            tracing::info!(endpoint = %self.name, "Circuit closed, endpoint recovered");
            inner.state = CircuitState::Closed;
            inner.opened_at = None;
            metrics::record_circuit_state(&self.name, CircuitState::Closed);
        }
    }

    fn reopen_after_trial(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        tracing::warn!(endpoint = %self.name, "Trial call failed, circuit re-opened");
        self.open(&mut inner);
    }

    fn release_trial(&self) {
        let mut inner = self.lock();
        inner.trial_in_flight = false;
        tracing::debug!(endpoint = %self.name, "Trial call abandoned");
    }

    fn open(&self, inner: &mut BreakerInner) {
        inner.state = CircuitState::Open;
        inner.opened_at = Some(Instant::now());
        inner.trial_in_flight = false;
        metrics::record_circuit_state(&self.name, CircuitState::Open);
    }

    fn refresh(&self, inner: &mut BreakerInner) {
        if inner.state != CircuitState::Open {
            return;
        }
        // No opening time or a time in the future: stay open.
        let elapsed = inner
            .opened_at
            .and_then(|t| Instant::now().checked_duration_since(t));
        if matches!(elapsed, Some(e) if e >= self.recovery_timeout) {
            inner.state = CircuitState::HalfOpen;
            inner.trial_in_flight = false;
            metrics::record_circuit_state(&self.name, CircuitState::HalfOpen);
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
