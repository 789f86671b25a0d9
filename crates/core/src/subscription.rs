use serde::{Deserialize, Serialize};

/// Protocol name used for e-mail subscriptions on the notification topic.
pub const EMAIL_PROTOCOL: &str = "email";

/// A confirmed subscription on the notification topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub protocol: String,
    pub endpoint: String,
    /// Opaque handle (for SNS, the subscription ARN) used to unsubscribe.
    pub handle: String,
}

impl Subscription {
    /// Whether this is an e-mail subscription for exactly `address`.
    ///
    /// The protocol compares case-insensitively, the endpoint exactly.
    pub fn is_email_for(&self, address: &str) -> bool {
        self.protocol.eq_ignore_ascii_case(EMAIL_PROTOCOL) && self.endpoint == address
    }
}
