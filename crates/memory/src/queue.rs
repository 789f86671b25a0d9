use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use imagecast_backend::{BackendError, MessageQueue};
use imagecast_core::QueuedMessage;

#[derive(Debug)]
struct Entry {
    message_id: String,
    body: String,
    receipt_handle: Option<String>,
    invisible_until: Option<Instant>,
}

impl Entry {
    fn is_visible(&self, now: Instant) -> bool {
        self.invisible_until.is_none_or(|deadline| now >= deadline)
    }
}

/// In-memory FIFO [`MessageQueue`] with receipt handles.
///
/// A received message stays on the queue until it is deleted with its
/// latest receipt handle. Without a visibility timeout a received message
/// is eligible for redelivery on the next receive; with one it is hidden
/// until the timeout elapses.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    entries: Mutex<Vec<Entry>>,
    visibility_timeout: Option<Duration>,
}

impl MemoryQueue {
    /// Create a new, empty queue that redelivers immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hide received messages for `timeout` before redelivering them.
    #[must_use]
    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = Some(timeout);
        self
    }

    /// Number of messages still on the queue, received or not.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Bodies of every message still on the queue, in FIFO order.
    pub async fn bodies(&self) -> Vec<String> {
        self.entries
            .lock()
            .await
            .iter()
            .map(|e| e.body.clone())
            .collect()
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    async fn send(&self, body: &str) -> Result<String, BackendError> {
        let message_id = Uuid::new_v4().to_string();
        self.entries.lock().await.push(Entry {
            message_id: message_id.clone(),
            body: body.to_owned(),
            receipt_handle: None,
            invisible_until: None,
        });
        Ok(message_id)
    }

    async fn receive_batch(&self, max_messages: usize) -> Result<Vec<QueuedMessage>, BackendError> {
        let now = Instant::now();
        let invisible_until = self.visibility_timeout.map(|t| now + t);
        let mut entries = self.entries.lock().await;

        let batch = entries
            .iter_mut()
            .filter(|e| e.is_visible(now))
            .take(max_messages)
            .map(|entry| {
                let receipt = Uuid::new_v4().to_string();
                entry.receipt_handle = Some(receipt.clone());
                entry.invisible_until = invisible_until;
                QueuedMessage::new(entry.message_id.clone(), entry.body.clone(), receipt)
            })
            .collect();

        Ok(batch)
    }

    async fn delete_message(&self, receipt_handle: &str) -> Result<(), BackendError> {
        let mut entries = self.entries.lock().await;
        // Stale handles are ignored, matching hosted queue semantics.
        entries.retain(|e| e.receipt_handle.as_deref() != Some(receipt_handle));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn receive_is_fifo_and_bounded() {
        let queue = MemoryQueue::new();
        for body in ["m1", "m2", "m3"] {
            queue.send(body).await.unwrap();
        }
        let batch = queue.receive_batch(2).await.unwrap();
        let bodies: Vec<&str> = batch.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["m1", "m2"]);
    }

    #[tokio::test]
    async fn empty_queue_yields_empty_batch() {
        let queue = MemoryQueue::new();
        assert!(queue.receive_batch(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn undeleted_messages_are_redelivered() {
        let queue = MemoryQueue::new();
        queue.send("m1").await.unwrap();
        queue.send("m2").await.unwrap();

        let batch = queue.receive_batch(10).await.unwrap();
        queue.delete_message(&batch[0].receipt_handle).await.unwrap();

        let again = queue.receive_batch(10).await.unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].body, "m2");
        assert_eq!(again[0].message_id, batch[1].message_id);
        assert_ne!(again[0].receipt_handle, batch[1].receipt_handle);
    }

    #[tokio::test]
    async fn stale_receipt_does_not_delete() {
        let queue = MemoryQueue::new();
        queue.send("m1").await.unwrap();
        let first = queue.receive_batch(1).await.unwrap();
        let _second = queue.receive_batch(1).await.unwrap();

        queue.delete_message(&first[0].receipt_handle).await.unwrap();
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn visibility_timeout_hides_received_messages() {
        let queue = MemoryQueue::new().with_visibility_timeout(Duration::from_secs(30));
        queue.send("m1").await.unwrap();

        assert_eq!(queue.receive_batch(10).await.unwrap().len(), 1);
        assert!(queue.receive_batch(10).await.unwrap().is_empty());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(queue.receive_batch(10).await.unwrap().len(), 1);
    }
}
