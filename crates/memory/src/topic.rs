use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use imagecast_backend::{BackendError, Topic};
use imagecast_core::Subscription;

/// A message recorded by [`MemoryTopic::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub message_id: String,
    pub subject: String,
    pub message: String,
}

/// Published messages kept by default.
pub const DEFAULT_HISTORY: usize = 1000;

/// In-memory [`Topic`] that records the most recent messages it publishes.
///
/// Subscriptions are confirmed immediately. Subscribing the same
/// protocol and endpoint twice returns the existing handle.
#[derive(Debug)]
pub struct MemoryTopic {
    name: String,
    history: usize,
    published: Mutex<VecDeque<PublishedMessage>>,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl Default for MemoryTopic {
    fn default() -> Self {
        Self::new("imagecast")
    }
}

impl MemoryTopic {
    /// Create a topic; `name` is embedded in generated handles.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            history: DEFAULT_HISTORY,
            published: Mutex::new(VecDeque::new()),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Keep at most `history` published messages; older ones are dropped.
    #[must_use]
    pub fn with_history(mut self, history: usize) -> Self {
        self.history = history;
        self
    }

    /// Retained published messages, oldest first.
    pub async fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().await.iter().cloned().collect()
    }
}

#[async_trait]
impl Topic for MemoryTopic {
    async fn publish(&self, message: &str, subject: &str) -> Result<String, BackendError> {
        let message_id = Uuid::new_v4().to_string();
        let mut published = self.published.lock().await;
        if self.history == 0 {
            return Ok(message_id);
        }
        while published.len() >= self.history {
            published.pop_front();
        }
        published.push_back(PublishedMessage {
            message_id: message_id.clone(),
            subject: subject.to_owned(),
            message: message.to_owned(),
        });
        Ok(message_id)
    }

    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, BackendError> {
        Ok(self.subscriptions.lock().await.clone())
    }

    async fn subscribe(&self, protocol: &str, endpoint: &str) -> Result<String, BackendError> {
        let mut subs = self.subscriptions.lock().await;
        if let Some(existing) = subs
            .iter()
            .find(|s| s.protocol == protocol && s.endpoint == endpoint)
        {
            return Ok(existing.handle.clone());
        }
        let handle = format!("memory:{}:{}", self.name, Uuid::new_v4());
        subs.push(Subscription {
            protocol: protocol.to_owned(),
            endpoint: endpoint.to_owned(),
            handle: handle.clone(),
        });
        Ok(handle)
    }

    async fn unsubscribe(&self, handle: &str) -> Result<(), BackendError> {
        let mut subs = self.subscriptions.lock().await;
        let before = subs.len();
        subs.retain(|s| s.handle != handle);
        if subs.len() == before {
            return Err(BackendError::NotFound(handle.to_owned()));
        }
        Ok(())
    }
}
