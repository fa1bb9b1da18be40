//! Spacing between retries against the same endpoint.

use std::time::Duration;

use rand::Rng;

/// Doubling delay, capped, with up to 10% random jitter on top so callers that
/// failed together do not retry in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    pub fn from_millis(base_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(base_ms), Duration::from_millis(max_ms))
    }

    /// Delay before the retry that follows failed attempt `attempt` (1-based).
    /// Zero for attempt 0 or a zero base.
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 || self.base.is_zero() {
            return Duration::ZERO;
        }

        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        let delay = self.base.saturating_mul(factor).min(self.max);

        let jitter_ms = (delay.as_millis() / 10) as u64;
        if jitter_ms == 0 {
            return delay;
        }
        delay + Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
    }
}
