//! Beacon chain (consensus layer) integration subsystem.
//!
//! # Data Flow
//! ```text
//! Configured endpoints (most preferred first)
//!     → chain.rs (fold into linked nodes, terminal node last)
//!     → client.rs (typed routes on the head node)
//!     → transport.rs (shared reqwest client, error classification)
//!     → responses.rs (envelope decoding)
//! ```
//!
//! # Constraints
//! - The chain is built once and never mutated
//! - Endpoint URLs are redacted before they reach logs or metrics
//! - Only transient network failures move a call down the chain

pub mod chain;
pub mod client;
pub mod responses;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use chain::{build_chain, ChainNode, EndpointStatus, Request};
pub use client::BeaconClient;
pub use transport::{HttpTransport, Transport};
pub use types::{BeaconError, BeaconResult, BlockId, StateId, ValidatorId};
