use serde::{Deserialize, Serialize};

/// A message received from the work queue.
///
/// The `receipt_handle` identifies this particular delivery and is what the
/// queue needs to acknowledge (delete) the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedMessage {
    pub message_id: String,
    pub body: String,
    pub receipt_handle: String,
}

impl QueuedMessage {
    pub fn new(
        message_id: impl Into<String>,
        body: impl Into<String>,
        receipt_handle: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            body: body.into(),
            receipt_handle: receipt_handle.into(),
        }
    }
}
