//! Periodic head-block polling.
//!
//! Fetches the head block on a fixed interval and logs what was seen together
//! with the state of every endpoint, so degradation shows up in the logs even
//! when nothing else is calling the client.

use std::time::Duration;
use tokio::time;

use crate::beacon::BeaconClient;
use crate::lifecycle::ShutdownListener;

pub struct HeadWatcher {
    client: BeaconClient,
    interval: Duration,
}

impl HeadWatcher {
    pub fn new(client: BeaconClient, interval: Duration) -> Self {
        Self { client, interval }
    }

    /// Poll until `shutdown` fires. Returns the number of successful polls.
    pub async fn run(self, mut shutdown: ShutdownListener) -> u64 {
        tracing::info!(interval_secs = self.interval.as_secs_f64(), "Head watcher starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        let mut polled = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.poll_once().await {
                        polled += 1;
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!(polled, "Head watcher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
        polled
    }

    async fn poll_once(&self) -> bool {
        let ok = match self.client.get_block("head").await {
            Ok(block) => {
                tracing::info!(
                    slot = block.message.slot,
                    proposer_index = block.message.proposer_index,
                    execution_block = ?block.message.execution_block_number(),
                    "Head block"
                );
                true
            }
            Err(e) => {
                tracing::error!(error = %e, transient = e.is_transient(), "Failed to fetch head block");
                false
            }
        };

        for status in self.client.endpoint_status() {
            tracing::debug!(
                endpoint = %status.endpoint,
                circuit = ?status.circuit,
                attempts = status.attempts,
                failures = status.failures,
                fallbacks = status.fallbacks,
                "Endpoint status"
            );
        }
        ok
    }
}
