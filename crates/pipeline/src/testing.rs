//! Failure-injecting backend wrappers shared by the service tests.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Notify;

use imagecast_backend::{
    BackendError, BlobStore, Catalog, FunctionInvoker, MessageQueue, Topic,
};
use imagecast_core::{
    BlobMetadata, FunctionResponse, Image, NewImage, QueuedMessage, Subscription,
};
use imagecast_memory::{MemoryBlobStore, MemoryCatalog, MemoryQueue, MemoryTopic};

/// Stalls long enough for any call policy timeout to fire first.
const STALL: Duration = Duration::from_secs(3600);

pub(crate) struct FaultyBlobStore {
    pub(crate) inner: MemoryBlobStore,
    pub(crate) fail_put: AtomicBool,
    pub(crate) fail_delete: AtomicBool,
    /// Store the object, then stall the first put before acknowledging it.
    pub(crate) stall_after_put: AtomicBool,
    pub(crate) puts: AtomicU32,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FaultyBlobStore {
    pub(crate) fn new(inner: MemoryBlobStore) -> Self {
        Self {
            inner,
            fail_put: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            stall_after_put: AtomicBool::new(false),
            puts: AtomicU32::new(0),
            gate: Mutex::new(None),
        }
    }

    /// Park puts before they write until the returned handle is notified.
    pub(crate) fn hold_puts(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }
}

#[async_trait]
impl BlobStore for FaultyBlobStore {
    async fn put(
        &self,
        path: &str,
        key: &str,
        metadata: &BlobMetadata,
        content: Bytes,
    ) -> Result<String, BackendError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(BackendError::Service("access denied".into()));
        }
        let url = self.inner.put(path, key, metadata, content).await?;
        if self.stall_after_put.swap(false, Ordering::SeqCst) {
            tokio::time::sleep(STALL).await;
        }
        Ok(url)
    }

    fn url(&self, path: &str, key: &str) -> Result<String, BackendError> {
        self.inner.url(path, key)
    }

    async fn get(&self, path: &str, key: &str) -> Result<Bytes, BackendError> {
        self.inner.get(path, key).await
    }

    async fn delete(&self, path: &str, key: &str) -> Result<(), BackendError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(BackendError::Service("access denied".into()));
        }
        self.inner.delete(path, key).await
    }
}

pub(crate) struct FaultyCatalog {
    pub(crate) inner: MemoryCatalog,
    pub(crate) fail_save: AtomicBool,
    /// Commit the first save, then stall before acknowledging it.
    pub(crate) stall_after_save: AtomicBool,
    pub(crate) saves: AtomicU32,
}

impl FaultyCatalog {
    pub(crate) fn new(inner: MemoryCatalog) -> Self {
        Self {
            inner,
            fail_save: AtomicBool::new(false),
            stall_after_save: AtomicBool::new(false),
            saves: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Catalog for FaultyCatalog {
    async fn save(&self, image: NewImage) -> Result<Image, BackendError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(BackendError::Service("relation does not exist".into()));
        }
        let stored = self.inner.save(image).await?;
        if self.stall_after_save.swap(false, Ordering::SeqCst) {
            tokio::time::sleep(STALL).await;
        }
        Ok(stored)
    }

    async fn find_by_key(&self, file_name: &str) -> Result<Option<Image>, BackendError> {
        self.inner.find_by_key(file_name).await
    }

    async fn delete_by_key(&self, file_name: &str) -> Result<u64, BackendError> {
        self.inner.delete_by_key(file_name).await
    }

    async fn find_all(&self) -> Result<Vec<Image>, BackendError> {
        self.inner.find_all().await
    }
}

pub(crate) struct FaultyQueue {
    pub(crate) inner: MemoryQueue,
    pub(crate) fail_send: AtomicBool,
    pub(crate) fail_receive: AtomicBool,
    pub(crate) fail_delete: AtomicBool,
    pub(crate) sends: AtomicU32,
}

impl FaultyQueue {
    pub(crate) fn new(inner: MemoryQueue) -> Self {
        Self {
            inner,
            fail_send: AtomicBool::new(false),
            fail_receive: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            sends: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl MessageQueue for FaultyQueue {
    async fn send(&self, body: &str) -> Result<String, BackendError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(BackendError::Connection("connection reset".into()));
        }
        self.inner.send(body).await
    }

    async fn receive_batch(&self, max_messages: usize) -> Result<Vec<QueuedMessage>, BackendError> {
        if self.fail_receive.load(Ordering::SeqCst) {
            return Err(BackendError::Service("queue does not exist".into()));
        }
        self.inner.receive_batch(max_messages).await
    }

    async fn delete_message(&self, receipt_handle: &str) -> Result<(), BackendError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(BackendError::Service("receipt handle is invalid".into()));
        }
        self.inner.delete_message(receipt_handle).await
    }
}

pub(crate) struct FaultyTopic {
    pub(crate) inner: MemoryTopic,
    pub(crate) publishes: AtomicU32,
    pub(crate) unsubscribes: AtomicU32,
    pub(crate) fail_subscribe: AtomicBool,
    pub(crate) fail_list: AtomicBool,
    failing_bodies: Mutex<Vec<String>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FaultyTopic {
    pub(crate) fn new(inner: MemoryTopic) -> Self {
        Self {
            inner,
            publishes: AtomicU32::new(0),
            unsubscribes: AtomicU32::new(0),
            fail_subscribe: AtomicBool::new(false),
            fail_list: AtomicBool::new(false),
            failing_bodies: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        }
    }

    /// Make every publish of `body` fail.
    pub(crate) fn fail_body(&self, body: &str) {
        self.failing_bodies.lock().unwrap().push(body.to_owned());
    }

    pub(crate) fn clear_failures(&self) {
        self.failing_bodies.lock().unwrap().clear();
    }

    /// Block publishes until the returned handle is notified.
    pub(crate) fn hold_publishes(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }
}

#[async_trait]
impl Topic for FaultyTopic {
    async fn publish(&self, message: &str, subject: &str) -> Result<String, BackendError> {
        self.publishes.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self
            .failing_bodies
            .lock()
            .unwrap()
            .iter()
            .any(|b| b == message)
        {
            return Err(BackendError::Service("invalid parameter".into()));
        }
        self.inner.publish(message, subject).await
    }

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, BackendError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(BackendError::Throttled);
        }
        self.inner.list_subscriptions().await
    }

    async fn subscribe(&self, protocol: &str, endpoint: &str) -> Result<String, BackendError> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(BackendError::Service("invalid endpoint".into()));
        }
        self.inner.subscribe(protocol, endpoint).await
    }

    async fn unsubscribe(&self, handle: &str) -> Result<(), BackendError> {
        self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        self.inner.unsubscribe(handle).await
    }
}

/// Invoker that sleeps before answering.
pub(crate) struct SlowInvoker {
    pub(crate) delay: Duration,
}

#[async_trait]
impl FunctionInvoker for SlowInvoker {
    async fn invoke(
        &self,
        _function: &str,
        _payload: &serde_json::Value,
    ) -> Result<FunctionResponse, BackendError> {
        tokio::time::sleep(self.delay).await;
        Ok(FunctionResponse::ok(200, None))
    }
}

/// Invoker whose transport always fails.
pub(crate) struct FailingInvoker;

#[async_trait]
impl FunctionInvoker for FailingInvoker {
    async fn invoke(
        &self,
        function: &str,
        _payload: &serde_json::Value,
    ) -> Result<FunctionResponse, BackendError> {
        Err(BackendError::NotFound(format!("function {function}")))
    }
}
