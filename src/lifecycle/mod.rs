//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config (loaded and validated by config::load_config) → Build beacon client → AppContext
//!
//! Shutdown (shutdown.rs):
//!     Signal received → stop flag set → long-running tasks exit their loops
//!
//! Signals (signals.rs):
//!     SIGINT → Trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownListener};
pub use startup::{startup, AppContext, StartupError};
