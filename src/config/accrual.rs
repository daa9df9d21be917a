use std::time::Duration;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct AccrualConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    /// Extra attempts after a transport failure; status codes are never retried.
    pub retry_count: u32,
    pub retry_wait_ms: u64,
}

impl AccrualConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_wait(&self) -> Duration {
        Duration::from_millis(self.retry_wait_ms)
    }
}

impl Default for AccrualConfig {
    fn default() -> Self {
        AccrualConfig {
            base_url: "http://localhost:8080".to_string(),
            timeout_ms: 200,
            retry_count: 2,
            retry_wait_ms: 100,
        }
    }
}
