//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! beacon chain nodes + circuit breakers produce:
//!     → logging.rs (structured events, request-id spans)
//!     → metrics.rs (attempt/fallback counters, circuit state gauges)
//! ```
//!
//! # Design Decisions
//! - Every fallback hop is logged with source, target and requested path
//! - Metric updates are cheap; no exporter is bundled

pub mod logging;
pub mod metrics;
