use std::sync::Arc;

use imagecast_aws::AwsBaseConfig;
#[cfg(feature = "aws-lambda")]
use imagecast_aws::{LambdaConfig, LambdaInvoker};
#[cfg(feature = "aws-s3")]
use imagecast_aws::{S3BlobStore, S3Config};
#[cfg(feature = "aws-sns")]
use imagecast_aws::{SnsConfig, SnsTopic};
#[cfg(feature = "aws-sqs")]
use imagecast_aws::{SqsConfig, SqsQueue};
use imagecast_backend::{BlobStore, Catalog, FunctionInvoker, MessageQueue, Topic};
use imagecast_memory::{
    MemoryBlobStore, MemoryCatalog, MemoryFunctionInvoker, MemoryQueue, MemoryTopic,
};
#[cfg(feature = "postgres")]
use imagecast_postgres::{PostgresCatalog, PostgresConfig};
use tracing::info;

use crate::config::{
    BlobConfig, CatalogConfig, FunctionConfig, ImagecastConfig, QueueConfig, TopicConfig,
};
use crate::error::ServerError;

/// Every backend the pipeline services need.
#[derive(Clone)]
pub struct Backends {
    pub blobs: Arc<dyn BlobStore>,
    pub catalog: Arc<dyn Catalog>,
    pub queue: Arc<dyn MessageQueue>,
    pub topic: Arc<dyn Topic>,
    pub invoker: Arc<dyn FunctionInvoker>,
}

/// Create every backend named in `config`.
pub async fn create_backends(config: &ImagecastConfig) -> Result<Backends, ServerError> {
    let backends = Backends {
        blobs: create_blob_store(&config.blob, &config.aws).await?,
        catalog: create_catalog(&config.catalog).await?,
        queue: create_queue(&config.queue, &config.aws).await?,
        topic: create_topic(&config.topic, &config.aws).await?,
        invoker: create_invoker(&config.function, &config.aws).await?,
    };
    info!(
        blob = %config.blob.backend,
        catalog = %config.catalog.backend,
        queue = %config.queue.backend,
        topic = %config.topic.backend,
        function = %config.function.backend,
        "backends ready"
    );
    Ok(backends)
}

fn unknown(kind: &str, backend: &str) -> ServerError {
    ServerError::Config(format!(
        "unknown {kind} backend: {backend} (is the feature enabled?)"
    ))
}

/// Create a blob store from the `[blob]` section.
#[allow(clippy::unused_async)]
#[cfg_attr(not(feature = "aws-s3"), allow(unused_variables))]
pub async fn create_blob_store(
    config: &BlobConfig,
    aws: &AwsBaseConfig,
) -> Result<Arc<dyn BlobStore>, ServerError> {
    let store: Arc<dyn BlobStore> = match config.backend.as_str() {
        "memory" => Arc::new(MemoryBlobStore::new()),
        #[cfg(feature = "aws-s3")]
        "s3" => {
            let s3_config = S3Config {
                aws: aws.clone(),
                force_path_style: config.force_path_style,
            };
            Arc::new(S3BlobStore::new(s3_config).await)
        }
        other => return Err(unknown("blob", other)),
    };
    Ok(store)
}

/// Create an image catalog from the `[catalog]` section.
///
/// SQL backends run their migrations here.
#[allow(clippy::unused_async)]
pub async fn create_catalog(config: &CatalogConfig) -> Result<Arc<dyn Catalog>, ServerError> {
    let catalog: Arc<dyn Catalog> = match config.backend.as_str() {
        "memory" => Arc::new(MemoryCatalog::new()),
        #[cfg(feature = "postgres")]
        "postgres" => {
            let url = config.url.clone().ok_or_else(|| {
                ServerError::Config("postgres catalog requires [catalog] url".into())
            })?;
            let pg_config = PostgresConfig {
                url,
                pool_size: config.pool_size,
                schema: config.schema.clone(),
                table_prefix: config.table_prefix.clone(),
                ssl_mode: config.ssl_mode.clone(),
                ssl_root_cert: config.ssl_root_cert.clone(),
            };
            let catalog = PostgresCatalog::new(pg_config)
                .await
                .map_err(|e| ServerError::Config(format!("catalog postgres: {e}")))?;
            Arc::new(catalog)
        }
        other => return Err(unknown("catalog", other)),
    };
    Ok(catalog)
}

/// Create the upload notification queue from the `[queue]` section.
#[allow(clippy::unused_async)]
#[cfg_attr(not(feature = "aws-sqs"), allow(unused_variables))]
pub async fn create_queue(
    config: &QueueConfig,
    aws: &AwsBaseConfig,
) -> Result<Arc<dyn MessageQueue>, ServerError> {
    let queue: Arc<dyn MessageQueue> = match config.backend.as_str() {
        "memory" => Arc::new(MemoryQueue::new()),
        #[cfg(feature = "aws-sqs")]
        "sqs" => {
            let queue_url = config
                .url
                .clone()
                .ok_or_else(|| ServerError::Config("sqs queue requires [queue] url".into()))?;
            let sqs_config = SqsConfig {
                aws: aws.clone(),
                queue_url,
                wait_time_seconds: config.wait_time_seconds,
                visibility_timeout_seconds: config.visibility_timeout_seconds,
            };
            Arc::new(SqsQueue::new(sqs_config).await)
        }
        other => return Err(unknown("queue", other)),
    };
    Ok(queue)
}

/// Create the notification topic from the `[topic]` section.
#[allow(clippy::unused_async)]
#[cfg_attr(not(feature = "aws-sns"), allow(unused_variables))]
pub async fn create_topic(
    config: &TopicConfig,
    aws: &AwsBaseConfig,
) -> Result<Arc<dyn Topic>, ServerError> {
    let topic: Arc<dyn Topic> = match config.backend.as_str() {
        "memory" => Arc::new(MemoryTopic::default()),
        #[cfg(feature = "aws-sns")]
        "sns" => {
            let topic_arn = config
                .arn
                .clone()
                .ok_or_else(|| ServerError::Config("sns topic requires [topic] arn".into()))?;
            let sns_config = SnsConfig {
                aws: aws.clone(),
                topic_arn,
            };
            Arc::new(SnsTopic::new(sns_config).await)
        }
        other => return Err(unknown("topic", other)),
    };
    Ok(topic)
}

/// Create the external function invoker from the `[function]` section.
#[allow(clippy::unused_async)]
#[cfg_attr(not(feature = "aws-lambda"), allow(unused_variables))]
pub async fn create_invoker(
    config: &FunctionConfig,
    aws: &AwsBaseConfig,
) -> Result<Arc<dyn FunctionInvoker>, ServerError> {
    let invoker: Arc<dyn FunctionInvoker> = match config.backend.as_str() {
        "memory" => Arc::new(MemoryFunctionInvoker::new()),
        #[cfg(feature = "aws-lambda")]
        "lambda" => {
            let lambda_config = LambdaConfig {
                aws: aws.clone(),
                qualifier: config.qualifier.clone(),
            };
            Arc::new(LambdaInvoker::new(lambda_config).await)
        }
        other => return Err(unknown("function", other)),
    };
    Ok(invoker)
}
