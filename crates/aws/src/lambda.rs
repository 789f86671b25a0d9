use async_trait::async_trait;
use aws_sdk_lambda::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::InvocationType;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use imagecast_backend::{BackendError, FunctionInvoker};
use imagecast_core::FunctionResponse;

use crate::auth::build_sdk_config;
use crate::config::AwsBaseConfig;
use crate::error::classify_service_error;

/// Configuration for the Lambda function invoker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LambdaConfig {
    /// Shared AWS configuration (region, role ARN, endpoint URL).
    #[serde(flatten)]
    pub aws: AwsBaseConfig,

    /// Optional function version or alias.
    #[serde(default)]
    pub qualifier: Option<String>,
}

impl LambdaConfig {
    /// Create a new `LambdaConfig` with the given AWS region.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            aws: AwsBaseConfig::new(region),
            qualifier: None,
        }
    }

    /// Set the function version or alias.
    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }
}

/// Lambda-backed [`FunctionInvoker`] using `RequestResponse` invocations.
pub struct LambdaInvoker {
    config: LambdaConfig,
    client: aws_sdk_lambda::Client,
}

impl std::fmt::Debug for LambdaInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LambdaInvoker")
            .field("config", &self.config)
            .field("client", &"<LambdaClient>")
            .finish()
    }
}

impl LambdaInvoker {
    /// Create a new `LambdaInvoker` by building an AWS SDK client.
    pub async fn new(config: LambdaConfig) -> Self {
        let sdk_config = build_sdk_config(&config.aws).await;
        Self::from_sdk_config(config, &sdk_config)
    }

    /// Create a `LambdaInvoker` from an already loaded SDK configuration.
    pub fn from_sdk_config(config: LambdaConfig, sdk_config: &aws_config::SdkConfig) -> Self {
        let client = aws_sdk_lambda::Client::new(sdk_config);
        Self { config, client }
    }

    /// Create a `LambdaInvoker` with a pre-built client (for testing).
    pub fn with_client(config: LambdaConfig, client: aws_sdk_lambda::Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl FunctionInvoker for LambdaInvoker {
    #[instrument(skip(self, payload), fields(backend = "aws-lambda"))]
    async fn invoke(
        &self,
        function: &str,
        payload: &serde_json::Value,
    ) -> Result<FunctionResponse, BackendError> {
        let body = serde_json::to_vec(payload)?;

        let mut request = self
            .client
            .invoke()
            .function_name(function)
            .invocation_type(InvocationType::RequestResponse)
            .payload(Blob::new(body));

        if let Some(qualifier) = &self.config.qualifier {
            request = request.qualifier(qualifier);
        }

        let result = request.send().await.map_err(|e| {
            error!(error = %DisplayErrorContext(&e), "Lambda invoke failed");
            classify_service_error(e.code(), &DisplayErrorContext(&e).to_string())
        })?;

        let response = FunctionResponse {
            status_code: result.status_code(),
            payload: result
                .payload()
                .map(|blob| String::from_utf8_lossy(blob.as_ref()).into_owned()),
            function_error: result.function_error().map(String::from),
        };

        if let Some(err) = &response.function_error {
            warn!(function_error = %err, "Lambda function returned an error");
        } else {
            info!(status_code = response.status_code, "Lambda invocation succeeded");
        }
        Ok(response)
    }
}
