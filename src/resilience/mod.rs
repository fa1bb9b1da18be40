//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! ChainNode::get(path):
//!     → retries.rs (attempt budget, backoff between attempts)
//!         → circuit_breaker.rs (admit, or reject straight to the fallback node)
//!             → transport (single HTTP GET)
//! ```
//!
//! # Design Decisions
//! - One breaker per non-terminal endpoint; the terminal endpoint has none
//! - Only transient network failures count against a breaker or trigger a retry
//! - Single trial call in Half-Open, owned by a guard for the life of the call

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;

pub use circuit_breaker::{Admission, CircuitBreaker, CircuitState, TrialGuard};
pub use backoff::Backoff;
pub use retries::RetryPolicy;
