use std::time::Duration;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    pub interval_ms: u64,
    /// Orders resolved concurrently within one pass.
    pub max_concurrency: usize,
    pub outcome_buffer: usize,
    /// Upper bound for the pause requested through `Retry-After`.
    pub max_rate_limit_backoff_ms: u64,
}

impl ReconcilerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn max_rate_limit_backoff(&self) -> Duration {
        Duration::from_millis(self.max_rate_limit_backoff_ms)
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        ReconcilerConfig {
            interval_ms: 1_000,
            max_concurrency: 8,
            outcome_buffer: 256,
            max_rate_limit_backoff_ms: 60_000,
        }
    }
}
