use std::time::Duration;

use imagecast_pipeline::CallPolicy;
use serde::Deserialize;

/// Timeout and retry settings applied to every backend call.
#[derive(Debug, Deserialize)]
pub struct CallsConfig {
    /// Upper bound on a single attempt, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Pause before the single retry of a transient failure, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for CallsConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl CallsConfig {
    pub fn policy(&self) -> CallPolicy {
        CallPolicy::new(
            Duration::from_millis(self.timeout_ms),
            Duration::from_millis(self.retry_delay_ms),
        )
    }
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_retry_delay_ms() -> u64 {
    200
}
