//! AWS backends for the imagecast pipeline.
//!
//! This crate provides feature-gated implementations of the backend traits:
//!
//! - **S3** (`s3` feature): [`BlobStore`](imagecast_backend::BlobStore) over S3 buckets
//! - **SQS** (`sqs` feature): [`MessageQueue`](imagecast_backend::MessageQueue) over an SQS queue
//! - **SNS** (`sns` feature): [`Topic`](imagecast_backend::Topic) over an SNS topic
//! - **Lambda** (`lambda` feature): [`FunctionInvoker`](imagecast_backend::FunctionInvoker)
//!
//! All backends share a common [`AwsBaseConfig`](config::AwsBaseConfig) for
//! region, endpoint override, and optional STS assume-role credentials.

pub mod auth;
pub mod config;
pub mod error;

#[cfg(feature = "s3")]
pub mod s3;

#[cfg(feature = "sqs")]
pub mod sqs;

#[cfg(feature = "sns")]
pub mod sns;

#[cfg(feature = "lambda")]
pub mod lambda;

// Re-exports for convenience.
pub use auth::build_sdk_config;
pub use config::AwsBaseConfig;

#[cfg(feature = "s3")]
pub use s3::{S3BlobStore, S3Config};

#[cfg(feature = "sqs")]
pub use sqs::{SqsConfig, SqsQueue};

#[cfg(feature = "sns")]
pub use sns::{SnsConfig, SnsTopic};

#[cfg(feature = "lambda")]
pub use lambda::{LambdaConfig, LambdaInvoker};
