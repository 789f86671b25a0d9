use async_trait::async_trait;
use aws_sdk_sqs::error::{DisplayErrorContext, ProvideErrorMetadata};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use imagecast_backend::{BackendError, MessageQueue};
use imagecast_core::QueuedMessage;

use crate::auth::build_sdk_config;
use crate::config::AwsBaseConfig;
use crate::error::classify_service_error;

/// Largest batch SQS returns from a single `ReceiveMessage` call.
pub const MAX_RECEIVE_BATCH: usize = 10;

/// Configuration for the SQS work queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqsConfig {
    /// Shared AWS configuration (region, role ARN, endpoint URL).
    #[serde(flatten)]
    pub aws: AwsBaseConfig,

    /// Queue URL.
    pub queue_url: String,

    /// Long-poll wait time in seconds (0-20).
    #[serde(default)]
    pub wait_time_seconds: Option<i32>,

    /// Visibility timeout applied to received messages, in seconds.
    #[serde(default)]
    pub visibility_timeout_seconds: Option<i32>,
}

impl SqsConfig {
    /// Create a new `SqsConfig` for the given region and queue URL.
    pub fn new(region: impl Into<String>, queue_url: impl Into<String>) -> Self {
        Self {
            aws: AwsBaseConfig::new(region),
            queue_url: queue_url.into(),
            wait_time_seconds: None,
            visibility_timeout_seconds: None,
        }
    }

    /// Set the long-poll wait time.
    #[must_use]
    pub fn with_wait_time_seconds(mut self, seconds: i32) -> Self {
        self.wait_time_seconds = Some(seconds);
        self
    }

    /// Set the visibility timeout for received messages.
    #[must_use]
    pub fn with_visibility_timeout_seconds(mut self, seconds: i32) -> Self {
        self.visibility_timeout_seconds = Some(seconds);
        self
    }

    /// Set the endpoint URL override (for `LocalStack`).
    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.aws.endpoint_url = Some(endpoint_url.into());
        self
    }
}

/// Clamp a requested batch size into the range SQS accepts.
fn clamp_batch(max_messages: usize) -> i32 {
    // Bounded by MAX_RECEIVE_BATCH, so the cast is lossless.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let clamped = max_messages.clamp(1, MAX_RECEIVE_BATCH) as i32;
    clamped
}

/// SQS-backed [`MessageQueue`].
pub struct SqsQueue {
    config: SqsConfig,
    client: aws_sdk_sqs::Client,
}

impl std::fmt::Debug for SqsQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqsQueue")
            .field("config", &self.config)
            .field("client", &"<SqsClient>")
            .finish()
    }
}

impl SqsQueue {
    /// Create a new `SqsQueue` by building an AWS SDK client.
    pub async fn new(config: SqsConfig) -> Self {
        let sdk_config = build_sdk_config(&config.aws).await;
        Self::from_sdk_config(config, &sdk_config)
    }

    /// Create an `SqsQueue` from an already loaded SDK configuration.
    pub fn from_sdk_config(config: SqsConfig, sdk_config: &aws_config::SdkConfig) -> Self {
        let client = aws_sdk_sqs::Client::new(sdk_config);
        Self { config, client }
    }

    /// Create an `SqsQueue` with a pre-built client (for testing).
    pub fn with_client(config: SqsConfig, client: aws_sdk_sqs::Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    #[instrument(skip(self, body), fields(backend = "aws-sqs", queue_url = %self.config.queue_url))]
    async fn send(&self, body: &str) -> Result<String, BackendError> {
        let result = self
            .client
            .send_message()
            .queue_url(&self.config.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %DisplayErrorContext(&e), "SQS send_message failed");
                classify_service_error(e.code(), &DisplayErrorContext(&e).to_string())
            })?;

        let message_id = result.message_id().unwrap_or("unknown").to_owned();
        info!(message_id = %message_id, "SQS message sent");
        Ok(message_id)
    }

    #[instrument(skip(self), fields(backend = "aws-sqs", queue_url = %self.config.queue_url))]
    async fn receive_batch(&self, max_messages: usize) -> Result<Vec<QueuedMessage>, BackendError> {
        let mut request = self
            .client
            .receive_message()
            .queue_url(&self.config.queue_url)
            .max_number_of_messages(clamp_batch(max_messages));

        if let Some(wait) = self.config.wait_time_seconds {
            request = request.wait_time_seconds(wait);
        }
        if let Some(visibility) = self.config.visibility_timeout_seconds {
            request = request.visibility_timeout(visibility);
        }

        let result = request.send().await.map_err(|e| {
            error!(error = %DisplayErrorContext(&e), "SQS receive_message failed");
            classify_service_error(e.code(), &DisplayErrorContext(&e).to_string())
        })?;

        let mut batch = Vec::new();
        for message in result.messages() {
            let Some(receipt_handle) = message.receipt_handle() else {
                warn!(message_id = ?message.message_id(), "SQS message without receipt handle skipped");
                continue;
            };
            batch.push(QueuedMessage::new(
                message.message_id().unwrap_or_default(),
                message.body().unwrap_or_default(),
                receipt_handle,
            ));
        }

        debug!(count = batch.len(), "SQS messages received");
        Ok(batch)
    }

    #[instrument(skip(self, receipt_handle), fields(backend = "aws-sqs", queue_url = %self.config.queue_url))]
    async fn delete_message(&self, receipt_handle: &str) -> Result<(), BackendError> {
        self.client
            .delete_message()
            .queue_url(&self.config.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| {
                error!(error = %DisplayErrorContext(&e), "SQS delete_message failed");
                classify_service_error(e.code(), &DisplayErrorContext(&e).to_string())
            })?;

        debug!("SQS message deleted");
        Ok(())
    }
}
