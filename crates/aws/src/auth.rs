use aws_config::{ConfigLoader, Region};
use tracing::{debug, info};

use crate::config::AwsBaseConfig;

/// Start a loader for the configured region and endpoint override.
fn base_loader(config: &AwsBaseConfig) -> ConfigLoader {
    let mut loader = aws_config::from_env().region(Region::new(config.region.clone()));
    if let Some(endpoint) = &config.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }
    loader
}

/// Build an AWS SDK configuration from the given [`AwsBaseConfig`].
///
/// Uses the standard environment credential chain. When `role_arn` is set,
/// credentials come from an STS `AssumeRoleProvider`, which refreshes them
/// before expiry.
///
/// # Examples
///
/// ```no_run
/// use imagecast_aws::config::AwsBaseConfig;
/// use imagecast_aws::auth::build_sdk_config;
///
/// # async fn example() {
/// let config = AwsBaseConfig::new("us-east-1")
///     .with_endpoint_url("http://localhost:4566");
/// let sdk_config = build_sdk_config(&config).await;
/// # }
/// ```
pub async fn build_sdk_config(config: &AwsBaseConfig) -> aws_config::SdkConfig {
    if let Some(endpoint) = &config.endpoint_url {
        debug!(endpoint = %endpoint, "using custom AWS endpoint");
    }

    let Some(role_arn) = &config.role_arn else {
        return base_loader(config).load().await;
    };

    let session_name = config.effective_session_name();
    info!(role_arn = %role_arn, session_name = %session_name, "assuming IAM role via STS");

    // STS itself is called with the base credentials and endpoint.
    let base_config = base_loader(config).load().await;

    let mut provider_builder = aws_config::sts::AssumeRoleProvider::builder(role_arn)
        .session_name(session_name)
        .region(Region::new(config.region.clone()));

    if let Some(ref external_id) = config.external_id {
        provider_builder = provider_builder.external_id(external_id);
    }

    let assume_role_provider = provider_builder.configure(&base_config).build().await;

    base_loader(config)
        .credentials_provider(assume_role_provider)
        .load()
        .await
}
