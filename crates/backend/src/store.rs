use async_trait::async_trait;
use bytes::Bytes;
use imagecast_core::{BlobMetadata, FunctionResponse, Image, NewImage, QueuedMessage, Subscription};

use crate::error::BackendError;

/// Binary storage for image content.
///
/// Objects are addressed by a `path` (bucket plus directory, e.g.
/// `photos/images`) and a `key` (the file name).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` at `(path, key)` if no object exists there yet.
    ///
    /// Returns a URL the stored object can be resolved from, or
    /// [`BackendError::Conflict`] when the key is already taken. Existing
    /// objects are never overwritten.
    async fn put(
        &self,
        path: &str,
        key: &str,
        metadata: &BlobMetadata,
        data: Bytes,
    ) -> Result<String, BackendError>;

    /// URL the object at `(path, key)` resolves from, whether or not it exists.
    fn url(&self, path: &str, key: &str) -> Result<String, BackendError>;

    /// Fetch the object at `(path, key)`.
    ///
    /// Returns [`BackendError::NotFound`] when no object exists there.
    async fn get(&self, path: &str, key: &str) -> Result<Bytes, BackendError>;

    /// Delete the object at `(path, key)`. Deleting a missing object succeeds.
    async fn delete(&self, path: &str, key: &str) -> Result<(), BackendError>;
}

/// Persistent catalog of image records keyed by file name.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Insert a record and return it with its assigned id.
    ///
    /// Returns [`BackendError::Conflict`] if the file name is already taken.
    async fn save(&self, image: NewImage) -> Result<Image, BackendError>;

    /// Look up a record by its file name.
    async fn find_by_key(&self, file_name: &str) -> Result<Option<Image>, BackendError>;

    /// Delete every record with this file name. Returns how many were removed.
    async fn delete_by_key(&self, file_name: &str) -> Result<u64, BackendError>;

    /// All records, ordered by id.
    async fn find_all(&self) -> Result<Vec<Image>, BackendError>;
}

/// At-least-once work queue.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Enqueue a message body. Returns the queue-assigned message id.
    async fn send(&self, body: &str) -> Result<String, BackendError>;

    /// Receive up to `max_messages` messages. An empty queue yields an
    /// empty batch.
    async fn receive_batch(&self, max_messages: usize) -> Result<Vec<QueuedMessage>, BackendError>;

    /// Acknowledge a received message so it is not delivered again.
    async fn delete_message(&self, receipt_handle: &str) -> Result<(), BackendError>;
}

/// Fan-out notification topic.
#[async_trait]
pub trait Topic: Send + Sync {
    /// Publish a message to every subscriber. Returns the message id.
    async fn publish(&self, message: &str, subject: &str) -> Result<String, BackendError>;

    /// Confirmed subscriptions on the topic.
    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, BackendError>;

    /// Request a subscription. Returns the subscription handle, which may be
    /// a pending placeholder until the endpoint confirms.
    async fn subscribe(&self, protocol: &str, endpoint: &str) -> Result<String, BackendError>;

    /// Remove a subscription by handle.
    async fn unsubscribe(&self, handle: &str) -> Result<(), BackendError>;
}

/// Synchronous invocation of an external serverless function.
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    /// Invoke `function` with a JSON payload and wait for its response.
    async fn invoke(
        &self,
        function: &str,
        payload: &serde_json::Value,
    ) -> Result<FunctionResponse, BackendError>;
}
