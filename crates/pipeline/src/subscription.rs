use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};

use imagecast_backend::Topic;
use imagecast_core::{EMAIL_PROTOCOL, Subscription};

use crate::error::PipelineError;
use crate::policy::CallPolicy;

/// Result of [`SubscriptionManager::unsubscribe_email`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "subscription_handle", rename_all = "snake_case")]
pub enum UnsubscribeOutcome {
    /// The subscription with this handle was removed.
    Removed(String),
    /// No e-mail subscription matched the address.
    NotSubscribed,
}

/// Manages e-mail subscriptions on the notification topic.
pub struct SubscriptionManager {
    topic: Arc<dyn Topic>,
    policy: CallPolicy,
}

impl SubscriptionManager {
    pub fn new(topic: Arc<dyn Topic>) -> Self {
        Self {
            topic,
            policy: CallPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register `address` as an e-mail endpoint and return the topic's handle.
    #[instrument(skip(self))]
    pub async fn subscribe_email(&self, address: &str) -> Result<String, PipelineError> {
        if address.trim().is_empty() {
            return Err(PipelineError::Validation("email address is empty".into()));
        }
        let handle = self
            .policy
            .call("topic.subscribe", || {
                self.topic.subscribe(EMAIL_PROTOCOL, address)
            })
            .await?;
        info!(handle = %handle, "email subscription requested");
        Ok(handle)
    }

    /// Remove the first e-mail subscription for exactly `address`.
    ///
    /// Scans the topic's current subscriptions on every call. When nothing
    /// matches, no removal is attempted.
    #[instrument(skip(self))]
    pub async fn unsubscribe_email(&self, address: &str) -> Result<UnsubscribeOutcome, PipelineError> {
        let subscriptions = self.list_subscriptions().await?;
        let Some(found) = subscriptions.into_iter().find(|s| s.is_email_for(address)) else {
            info!("no email subscription matched");
            return Ok(UnsubscribeOutcome::NotSubscribed);
        };

        self.policy
            .call("topic.unsubscribe", || self.topic.unsubscribe(&found.handle))
            .await?;
        info!(handle = %found.handle, "email subscription removed");
        Ok(UnsubscribeOutcome::Removed(found.handle))
    }

    /// Every subscription currently registered on the topic.
    pub async fn list_subscriptions(&self) -> Result<Vec<Subscription>, PipelineError> {
        self.policy
            .call("topic.list_subscriptions", || self.topic.list_subscriptions())
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use imagecast_memory::MemoryTopic;

    use super::*;
    use crate::testing::FaultyTopic;

    fn manager() -> (Arc<FaultyTopic>, SubscriptionManager) {
        let topic = Arc::new(FaultyTopic::new(MemoryTopic::default()));
        let manager = SubscriptionManager::new(Arc::clone(&topic) as Arc<dyn Topic>)
            .with_policy(CallPolicy::new(Duration::from_secs(5), Duration::from_millis(1)));
        (topic, manager)
    }

    #[tokio::test]
    async fn subscribe_registers_email_endpoint() {
        let (topic, manager) = manager();
        let handle = manager.subscribe_email("a@x.io").await.unwrap();

        let subs = topic.inner.list_subscriptions().await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].protocol, EMAIL_PROTOCOL);
        assert_eq!(subs[0].endpoint, "a@x.io");
        assert_eq!(subs[0].handle, handle);
    }

    #[tokio::test]
    async fn subscribe_rejects_empty_address() {
        let (topic, manager) = manager();
        let err = manager.subscribe_email("  ").await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert!(topic.inner.list_subscriptions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn subscribe_failure_is_external() {
        let (topic, manager) = manager();
        topic.fail_subscribe.store(true, Ordering::SeqCst);
        let err = manager.subscribe_email("a@x.io").await.unwrap_err();
        assert!(matches!(err, PipelineError::ExternalService { operation: "topic.subscribe", .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn unsubscribe_removes_matching_handle() {
        let (topic, manager) = manager();
        manager.subscribe_email("b@x.io").await.unwrap();
        let handle = manager.subscribe_email("a@x.io").await.unwrap();
        topic.inner.subscribe("sms", "a@x.io").await.unwrap();

        let outcome = manager.unsubscribe_email("a@x.io").await.unwrap();
        assert_eq!(outcome, UnsubscribeOutcome::Removed(handle));
        assert_eq!(topic.unsubscribes.load(Ordering::SeqCst), 1);

        let remaining: Vec<(String, String)> = manager
            .list_subscriptions()
            .await
            .unwrap()
            .into_iter()
            .map(|s| (s.protocol, s.endpoint))
            .collect();
        assert_eq!(
            remaining,
            [
                ("email".to_owned(), "b@x.io".to_owned()),
                ("sms".to_owned(), "a@x.io".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn unsubscribe_matches_protocol_case_insensitively() {
        let (topic, manager) = manager();
        let handle = topic.inner.subscribe("EMAIL", "a@x.io").await.unwrap();
        let outcome = manager.unsubscribe_email("a@x.io").await.unwrap();
        assert_eq!(outcome, UnsubscribeOutcome::Removed(handle));
    }

    #[tokio::test]
    async fn unsubscribe_unknown_address_skips_removal() {
        let (topic, manager) = manager();
        manager.subscribe_email("a@x.io").await.unwrap();

        let outcome = manager.unsubscribe_email("A@x.io").await.unwrap();
        assert_eq!(outcome, UnsubscribeOutcome::NotSubscribed);
        assert_eq!(topic.unsubscribes.load(Ordering::SeqCst), 0);
        assert_eq!(manager.list_subscriptions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn listing_failure_is_retried_then_surfaced() {
        let (topic, manager) = manager();
        topic.fail_list.store(true, Ordering::SeqCst);
        let err = manager.unsubscribe_email("a@x.io").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ExternalService { operation: "topic.list_subscriptions", attempts: 2, .. }
        ));
        assert_eq!(topic.unsubscribes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let removed = serde_json::to_value(UnsubscribeOutcome::Removed("h-1".into())).unwrap();
        assert_eq!(removed["status"], "removed");
        assert_eq!(removed["subscription_handle"], "h-1");
        let none = serde_json::to_value(UnsubscribeOutcome::NotSubscribed).unwrap();
        assert_eq!(none["status"], "not_subscribed");
    }
}
