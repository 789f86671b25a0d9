use async_trait::async_trait;
use aws_sdk_sns::error::{DisplayErrorContext, ProvideErrorMetadata};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use imagecast_backend::{BackendError, Topic};
use imagecast_core::Subscription;

use crate::auth::build_sdk_config;
use crate::config::AwsBaseConfig;
use crate::error::classify_service_error;

/// Subscription ARN placeholder SNS reports until the endpoint confirms.
const PENDING_CONFIRMATION: &str = "PendingConfirmation";

/// Configuration for the SNS notification topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnsConfig {
    /// Shared AWS configuration (region, role ARN, endpoint URL).
    #[serde(flatten)]
    pub aws: AwsBaseConfig,

    /// Topic ARN.
    pub topic_arn: String,
}

impl SnsConfig {
    /// Create a new `SnsConfig` for the given region and topic.
    pub fn new(region: impl Into<String>, topic_arn: impl Into<String>) -> Self {
        Self {
            aws: AwsBaseConfig::new(region),
            topic_arn: topic_arn.into(),
        }
    }

    /// Set the endpoint URL override (for `LocalStack`).
    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.aws.endpoint_url = Some(endpoint_url.into());
        self
    }
}

/// Whether a listed subscription can be addressed by its ARN.
fn is_confirmed(arn: &str) -> bool {
    !arn.is_empty() && arn != PENDING_CONFIRMATION
}

/// SNS-backed [`Topic`].
pub struct SnsTopic {
    config: SnsConfig,
    client: aws_sdk_sns::Client,
}

impl std::fmt::Debug for SnsTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnsTopic")
            .field("config", &self.config)
            .field("client", &"<SnsClient>")
            .finish()
    }
}

impl SnsTopic {
    /// Create a new `SnsTopic` by building an AWS SDK client.
    pub async fn new(config: SnsConfig) -> Self {
        let sdk_config = build_sdk_config(&config.aws).await;
        Self::from_sdk_config(config, &sdk_config)
    }

    /// Create an `SnsTopic` from an already loaded SDK configuration.
    pub fn from_sdk_config(config: SnsConfig, sdk_config: &aws_config::SdkConfig) -> Self {
        let client = aws_sdk_sns::Client::new(sdk_config);
        Self { config, client }
    }

    /// Create an `SnsTopic` with a pre-built client (for testing).
    pub fn with_client(config: SnsConfig, client: aws_sdk_sns::Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl Topic for SnsTopic {
    #[instrument(skip(self, message), fields(backend = "aws-sns", topic_arn = %self.config.topic_arn))]
    async fn publish(&self, message: &str, subject: &str) -> Result<String, BackendError> {
        let result = self
            .client
            .publish()
            .topic_arn(&self.config.topic_arn)
            .subject(subject)
            .message(message)
            .send()
            .await
            .map_err(|e| {
                error!(error = %DisplayErrorContext(&e), "SNS publish failed");
                classify_service_error(e.code(), &DisplayErrorContext(&e).to_string())
            })?;

        let message_id = result.message_id().unwrap_or("unknown").to_owned();
        info!(message_id = %message_id, "SNS message published");
        Ok(message_id)
    }

    #[instrument(skip(self), fields(backend = "aws-sns", topic_arn = %self.config.topic_arn))]
    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, BackendError> {
        let mut subscriptions = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_subscriptions_by_topic()
                .topic_arn(&self.config.topic_arn)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| {
                    error!(error = %DisplayErrorContext(&e), "SNS list_subscriptions_by_topic failed");
                    classify_service_error(e.code(), &DisplayErrorContext(&e).to_string())
                })?;

            for sub in page.subscriptions() {
                let arn = sub.subscription_arn().unwrap_or_default();
                if !is_confirmed(arn) {
                    continue;
                }
                subscriptions.push(Subscription {
                    protocol: sub.protocol().unwrap_or_default().to_owned(),
                    endpoint: sub.endpoint().unwrap_or_default().to_owned(),
                    handle: arn.to_owned(),
                });
            }

            match page.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_owned()),
                _ => break,
            }
        }

        debug!(count = subscriptions.len(), "SNS subscriptions listed");
        Ok(subscriptions)
    }

    #[instrument(skip(self, endpoint), fields(backend = "aws-sns", topic_arn = %self.config.topic_arn))]
    async fn subscribe(&self, protocol: &str, endpoint: &str) -> Result<String, BackendError> {
        let result = self
            .client
            .subscribe()
            .topic_arn(&self.config.topic_arn)
            .protocol(protocol)
            .endpoint(endpoint)
            .send()
            .await
            .map_err(|e| {
                error!(error = %DisplayErrorContext(&e), "SNS subscribe failed");
                classify_service_error(e.code(), &DisplayErrorContext(&e).to_string())
            })?;

        let handle = result
            .subscription_arn()
            .unwrap_or(PENDING_CONFIRMATION)
            .to_owned();
        info!(subscription = %handle, "SNS subscription requested");
        Ok(handle)
    }

    #[instrument(skip(self), fields(backend = "aws-sns"))]
    async fn unsubscribe(&self, handle: &str) -> Result<(), BackendError> {
        self.client
            .unsubscribe()
            .subscription_arn(handle)
            .send()
            .await
            .map_err(|e| {
                error!(error = %DisplayErrorContext(&e), "SNS unsubscribe failed");
                classify_service_error(e.code(), &DisplayErrorContext(&e).to_string())
            })?;

        info!(subscription = %handle, "SNS subscription removed");
        Ok(())
    }
}
