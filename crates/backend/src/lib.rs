//! Backend abstractions for the imagecast pipeline.
//!
//! Each external dependency of the pipeline sits behind one trait so the
//! pipeline can run against in-memory, `PostgreSQL` or AWS implementations:
//!
//! - [`BlobStore`]: binary image content
//! - [`Catalog`]: image metadata records
//! - [`MessageQueue`]: the upload work queue
//! - [`Topic`]: the fan-out notification topic and its subscriptions
//! - [`FunctionInvoker`]: synchronous external function calls

pub mod error;
pub mod store;

pub use error::BackendError;
pub use store::{BlobStore, Catalog, FunctionInvoker, MessageQueue, Topic};
