use serde::{Deserialize, Serialize};

/// STS session name used when none is configured.
pub const DEFAULT_SESSION_NAME: &str = "imagecast";

fn default_region() -> String {
    "us-east-1".to_owned()
}

/// Shared base configuration for all AWS backends.
///
/// Holds the region, an optional STS assume-role ARN for cross-account
/// access, and an endpoint URL override for local development
/// (e.g. `LocalStack`).
#[derive(Clone, Serialize, Deserialize)]
pub struct AwsBaseConfig {
    /// AWS region (e.g. `"us-east-1"`).
    #[serde(default = "default_region")]
    pub region: String,

    /// Optional IAM role ARN to assume via STS.
    #[serde(default)]
    pub role_arn: Option<String>,

    /// Optional endpoint URL override (e.g. `http://localhost:4566`).
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Optional STS session name (defaults to [`DEFAULT_SESSION_NAME`]).
    #[serde(default)]
    pub session_name: Option<String>,

    /// Optional external ID for cross-account trust policies.
    #[serde(default)]
    pub external_id: Option<String>,
}

impl std::fmt::Debug for AwsBaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsBaseConfig")
            .field("region", &self.region)
            .field("role_arn", &self.role_arn.as_ref().map(|_| "[REDACTED]"))
            .field("endpoint_url", &self.endpoint_url)
            .field("session_name", &self.session_name)
            .field("external_id", &self.external_id)
            .finish()
    }
}

impl AwsBaseConfig {
    /// Create a new `AwsBaseConfig` with the given region.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            ..Self::default()
        }
    }

    /// Set an IAM role ARN to assume via STS.
    #[must_use]
    pub fn with_role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.role_arn = Some(role_arn.into());
        self
    }

    /// Set an endpoint URL override for local development.
    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Set the STS session name for assume-role.
    #[must_use]
    pub fn with_session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = Some(session_name.into());
        self
    }

    /// Set the external ID for cross-account trust policies.
    #[must_use]
    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    /// Session name to present to STS.
    pub fn effective_session_name(&self) -> &str {
        self.session_name.as_deref().unwrap_or(DEFAULT_SESSION_NAME)
    }

    /// Endpoint override without a trailing slash, if any.
    pub(crate) fn endpoint_base(&self) -> Option<&str> {
        self.endpoint_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
    }
}

impl Default for AwsBaseConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            role_arn: None,
            endpoint_url: None,
            session_name: None,
            external_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_config_sets_region() {
        let config = AwsBaseConfig::new("eu-west-1");
        assert_eq!(config.region, "eu-west-1");
        assert!(config.role_arn.is_none());
        assert!(config.endpoint_url.is_none());
    }

    #[test]
    fn session_name_defaults() {
        let config = AwsBaseConfig::default();
        assert_eq!(config.effective_session_name(), DEFAULT_SESSION_NAME);
        let config = config.with_session_name("uploader");
        assert_eq!(config.effective_session_name(), "uploader");
    }

    #[test]
    fn endpoint_base_trims_trailing_slash() {
        let config = AwsBaseConfig::new("us-east-1").with_endpoint_url("http://localhost:4566/");
        assert_eq!(config.endpoint_base(), Some("http://localhost:4566"));
        assert_eq!(AwsBaseConfig::default().endpoint_base(), None);
    }

    #[test]
    fn debug_redacts_role_arn() {
        let config =
            AwsBaseConfig::new("us-east-1").with_role_arn("arn:aws:iam::123456789012:role/test");
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("123456789012"));
    }

    #[test]
    fn deserialize_fills_defaults() {
        let config: AwsBaseConfig =
            serde_json::from_str(r#"{"endpoint_url": "http://localhost:4566"}"#).unwrap();
        assert_eq!(config.region, "us-east-1");
        assert_eq!(
            config.endpoint_url.as_deref(),
            Some("http://localhost:4566")
        );
        assert!(config.external_id.is_none());
    }
}
