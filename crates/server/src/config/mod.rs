mod backends;
mod calls;
mod relay;
mod server;
mod storage;
mod telemetry;


pub use backends::*;
pub use calls::*;
pub use relay::*;
pub use server::*;
pub use storage::*;
pub use telemetry::*;

use std::path::Path;

use imagecast_aws::AwsBaseConfig;
use serde::Deserialize;

use crate::error::ServerError;

/// Top-level configuration for the imagecast server, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct ImagecastConfig {
    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Bucket that holds the image blobs.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Blob store backend.
    #[serde(default)]
    pub blob: BlobConfig,
    /// Image catalog backend.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Upload notification queue backend.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Notification topic backend.
    #[serde(default)]
    pub topic: TopicConfig,
    /// External function backend.
    #[serde(default)]
    pub function: FunctionConfig,
    /// Shared AWS settings used by every AWS backend.
    #[serde(default)]
    pub aws: AwsBaseConfig,
    /// Notification relay schedule.
    #[serde(default)]
    pub relay: RelayServerConfig,
    /// Timeout and retry policy for backend calls.
    #[serde(default)]
    pub calls: CallsConfig,
    /// OpenTelemetry distributed tracing configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl ImagecastConfig {
    /// Load the configuration from `path`, or use defaults if the file does
    /// not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServerError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate a TOML document.
    pub fn parse(contents: &str) -> Result<Self, ServerError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot work together.
    fn validate(&self) -> Result<(), ServerError> {
        if self.calls.timeout_ms == 0 {
            return Err(ServerError::Config("calls.timeout_ms must be positive".into()));
        }
        if let Some(wait) = self.queue.wait_time_seconds {
            if !(0..=MAX_QUEUE_WAIT_SECONDS).contains(&wait) {
                return Err(ServerError::Config(format!(
                    "queue.wait_time_seconds must be between 0 and {MAX_QUEUE_WAIT_SECONDS}, got {wait}"
                )));
            }
            // A long poll has to finish inside a single call attempt.
            let wait_ms = u64::from(wait.unsigned_abs()) * 1000;
            if wait_ms >= self.calls.timeout_ms {
                return Err(ServerError::Config(format!(
                    "queue.wait_time_seconds ({wait} s) must be shorter than calls.timeout_ms ({} ms)",
                    self.calls.timeout_ms
                )));
            }
        }
        Ok(())
    }
}

/// Longest long-poll wait a queue receive accepts.
const MAX_QUEUE_WAIT_SECONDS: i32 = 20;
