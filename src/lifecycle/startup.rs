//! Ordered startup: the loaded config builds the beacon client once.
//!
//! The resulting [`AppContext`] is the process-wide state; it is passed to
//! consumers explicitly instead of living in a global.

use std::sync::Arc;
use thiserror::Error;

use crate::beacon::{BeaconClient, BeaconError};
use crate::config::Config;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("beacon client: {0}")]
    Beacon(#[from] BeaconError),
}

/// Shared, immutable application state.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub beacon: BeaconClient,
}

/// Build the application context from an already validated config.
pub fn startup(config: Config) -> Result<AppContext, StartupError> {
    let beacon = BeaconClient::new(&config.beacon, &config.resilience)?;
    Ok(AppContext {
        config: Arc::new(config),
        beacon,
    })
}
