//! Resilient beacon chain client for the RocketPool watch bot.
//!
//! Requests go to the most preferred consensus-layer endpoint and fall back
//! along a fixed chain of less preferred endpoints, each guarded by a circuit
//! breaker and a bounded retry budget.

pub mod beacon;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod watch;

pub use beacon::{BeaconClient, BeaconError, BeaconResult};
pub use config::Config;
pub use lifecycle::{AppContext, Shutdown};
