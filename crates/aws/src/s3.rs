use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use imagecast_backend::{BackendError, BlobStore};
use imagecast_core::BlobMetadata;

use crate::auth::build_sdk_config;
use crate::config::AwsBaseConfig;
use crate::error::classify_service_error;

/// Configuration for the S3 blob store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3Config {
    /// Shared AWS configuration (region, role ARN, endpoint URL).
    #[serde(flatten)]
    pub aws: AwsBaseConfig,

    /// Force path-style addressing (`{endpoint}/{bucket}/{key}`), which most
    /// S3-compatible local stacks require.
    #[serde(default)]
    pub force_path_style: bool,
}

impl S3Config {
    /// Create a new `S3Config` with the given AWS region.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            aws: AwsBaseConfig::new(region),
            force_path_style: false,
        }
    }

    /// Set the endpoint URL override (for `LocalStack`).
    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.aws.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Use path-style addressing.
    #[must_use]
    pub fn with_force_path_style(mut self, force: bool) -> Self {
        self.force_path_style = force;
        self
    }
}

/// An object location resolved from a blob store `(path, key)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ObjectLocation {
    bucket: String,
    key: String,
}

impl ObjectLocation {
    /// Split `{bucket}/{prefix...}` and join the prefix with `key`.
    fn resolve(path: &str, key: &str) -> Result<Self, BackendError> {
        let path = path.trim_matches('/');
        let (bucket, prefix) = path.split_once('/').unwrap_or((path, ""));
        if bucket.is_empty() {
            return Err(BackendError::Configuration(format!(
                "blob path '{path}' does not name a bucket"
            )));
        }
        let key = if prefix.is_empty() {
            key.to_owned()
        } else {
            format!("{prefix}/{key}")
        };
        Ok(Self {
            bucket: bucket.to_owned(),
            key,
        })
    }
}

/// S3-backed [`BlobStore`].
pub struct S3BlobStore {
    config: S3Config,
    client: aws_sdk_s3::Client,
}

impl std::fmt::Debug for S3BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3BlobStore")
            .field("config", &self.config)
            .field("client", &"<S3Client>")
            .finish()
    }
}

impl S3BlobStore {
    /// Create a new `S3BlobStore` by building an AWS SDK client.
    pub async fn new(config: S3Config) -> Self {
        let sdk_config = build_sdk_config(&config.aws).await;
        Self::from_sdk_config(config, &sdk_config)
    }

    /// Create an `S3BlobStore` from an already loaded SDK configuration.
    pub fn from_sdk_config(config: S3Config, sdk_config: &aws_config::SdkConfig) -> Self {
        let s3_config = aws_sdk_s3::config::Builder::from(sdk_config)
            .force_path_style(config.force_path_style)
            .build();
        let client = aws_sdk_s3::Client::from_conf(s3_config);
        Self { config, client }
    }

    /// Create an `S3BlobStore` with a pre-built client (for testing).
    pub fn with_client(config: S3Config, client: aws_sdk_s3::Client) -> Self {
        Self { config, client }
    }

    /// Public URL of an object.
    fn object_url(&self, location: &ObjectLocation) -> String {
        match self.config.aws.endpoint_base() {
            Some(endpoint) => format!("{endpoint}/{}/{}", location.bucket, location.key),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                location.bucket, self.config.aws.region, location.key
            ),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    #[instrument(skip(self, metadata, data), fields(backend = "aws-s3"))]
    async fn put(
        &self,
        path: &str,
        key: &str,
        metadata: &BlobMetadata,
        data: Bytes,
    ) -> Result<String, BackendError> {
        let location = ObjectLocation::resolve(path, key)?;
        let content_length = i64::try_from(metadata.content_length).map_err(|_| {
            BackendError::Configuration(format!(
                "content length {} exceeds S3 limits",
                metadata.content_length
            ))
        })?;

        debug!(bucket = %location.bucket, key = %location.key, size = data.len(), "uploading object to S3");

        self.client
            .put_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .content_type(&metadata.content_type)
            .content_length(content_length)
            .metadata("original-file-name", key)
            .if_none_match("*")
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                let err = classify_service_error(e.code(), &DisplayErrorContext(&e).to_string());
                if !matches!(err, BackendError::Conflict(_)) {
                    error!(error = %DisplayErrorContext(&e), "S3 put_object failed");
                }
                err
            })?;

        info!(bucket = %location.bucket, key = %location.key, "S3 object uploaded");
        Ok(self.object_url(&location))
    }

    fn url(&self, path: &str, key: &str) -> Result<String, BackendError> {
        Ok(self.object_url(&ObjectLocation::resolve(path, key)?))
    }

    #[instrument(skip(self), fields(backend = "aws-s3"))]
    async fn get(&self, path: &str, key: &str) -> Result<Bytes, BackendError> {
        let location = ObjectLocation::resolve(path, key)?;

        let result = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(|e| {
                let err = classify_service_error(e.code(), &DisplayErrorContext(&e).to_string());
                if !matches!(err, BackendError::NotFound(_)) {
                    error!(error = %DisplayErrorContext(&e), "S3 get_object failed");
                }
                err
            })?;

        let data = result
            .body
            .collect()
            .await
            .map_err(|e| BackendError::Connection(format!("failed to read S3 body: {e}")))?
            .into_bytes();

        debug!(bucket = %location.bucket, key = %location.key, size = data.len(), "S3 object downloaded");
        Ok(data)
    }

    #[instrument(skip(self), fields(backend = "aws-s3"))]
    async fn delete(&self, path: &str, key: &str) -> Result<(), BackendError> {
        let location = ObjectLocation::resolve(path, key)?;

        self.client
            .delete_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(|e| {
                error!(error = %DisplayErrorContext(&e), "S3 delete_object failed");
                classify_service_error(e.code(), &DisplayErrorContext(&e).to_string())
            })?;

        info!(bucket = %location.bucket, key = %location.key, "S3 object deleted");
        Ok(())
    }
}
