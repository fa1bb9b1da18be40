//! OS signal handling.

use crate::lifecycle::Shutdown;

/// Trigger `shutdown` on Ctrl+C (SIGINT).
pub fn spawn_ctrl_c_handler(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                shutdown.trigger();
            }
            Err(e) => tracing::error!(error = %e, "Failed to install Ctrl+C handler"),
        }
    })
}
