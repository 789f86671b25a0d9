use std::time::Duration;

use imagecast_pipeline::RelayConfig;
use imagecast_pipeline::relay::DEFAULT_SUBJECT;
use serde::Deserialize;

/// Notification relay schedule.
///
/// # Example
///
/// ```toml
/// [relay]
/// enabled = true
/// interval_seconds = 60
/// batch_size = 10
/// subject = "New image has been uploaded"
/// ```
#[derive(Debug, Deserialize)]
pub struct RelayServerConfig {
    /// Whether the relay scheduler runs in this process.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Seconds between relay runs.
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    /// Messages requested per run. Clamped to `1..=10`.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Subject attached to published notifications.
    #[serde(default = "default_subject")]
    pub subject: String,
}

impl Default for RelayServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_seconds: default_interval(),
            batch_size: default_batch_size(),
            subject: default_subject(),
        }
    }
}

impl RelayServerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds.max(1))
    }

    pub fn to_relay_config(&self) -> RelayConfig {
        RelayConfig {
            batch_size: self.batch_size,
            subject: self.subject.clone(),
            interval: self.interval(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_interval() -> u64 {
    60
}

fn default_batch_size() -> usize {
    10
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_owned()
}
