use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use imagecast_backend::{MessageQueue, Topic};

use crate::error::PipelineError;
use crate::policy::CallPolicy;

/// Subject line attached to every relayed notification by default.
pub const DEFAULT_SUBJECT: &str = "New image has been uploaded";

/// Largest batch a single relay run will request.
pub const MAX_BATCH_SIZE: usize = 10;

/// Settings for the notification relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Messages requested per run, clamped to `1..=10`.
    pub batch_size: usize,
    /// Subject attached to each published message.
    pub subject: String,
    /// Time between scheduled runs.
    pub interval: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            subject: DEFAULT_SUBJECT.to_owned(),
            interval: Duration::from_secs(60),
        }
    }
}

/// Counters for a single relay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelayReport {
    pub received: usize,
    pub published: usize,
    pub publish_failures: usize,
    pub delete_failures: usize,
}

/// Result of [`NotificationRelay::try_run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Completed(RelayReport),
    /// Another run was already in progress.
    Skipped,
}

/// Clears the in-progress flag when a run ends, including on error.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drains the upload queue onto the notification topic.
///
/// A message is deleted from the queue only after its publish succeeds, so
/// delivery is at-least-once.
pub struct NotificationRelay {
    queue: Arc<dyn MessageQueue>,
    topic: Arc<dyn Topic>,
    policy: CallPolicy,
    batch_size: usize,
    subject: String,
    interval: Duration,
    in_progress: AtomicBool,
}

impl NotificationRelay {
    pub fn new(queue: Arc<dyn MessageQueue>, topic: Arc<dyn Topic>, config: &RelayConfig) -> Self {
        Self {
            queue,
            topic,
            policy: CallPolicy::default(),
            batch_size: config.batch_size.clamp(1, MAX_BATCH_SIZE),
            subject: config.subject.clone(),
            interval: config.interval,
            in_progress: AtomicBool::new(false),
        }
    }

    /// Replace the default call policy.
    #[must_use]
    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Time between scheduled runs.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one relay pass unless another is already in progress.
    ///
    /// Fails only when the batch cannot be received; individual publish or
    /// delete failures are counted in the report.
    #[instrument(skip(self))]
    pub async fn try_run(&self) -> Result<RelayOutcome, PipelineError> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("relay run already in progress, skipping");
            return Ok(RelayOutcome::Skipped);
        }
        let _guard = RunGuard(&self.in_progress);

        self.relay_batch().await.map(RelayOutcome::Completed)
    }

    async fn relay_batch(&self) -> Result<RelayReport, PipelineError> {
        let batch_size = self.batch_size;
        let messages = self
            .policy
            .call("queue.receive_batch", || self.queue.receive_batch(batch_size))
            .await?;

        let mut report = RelayReport {
            received: messages.len(),
            ..RelayReport::default()
        };
        if messages.is_empty() {
            return Ok(report);
        }

        for message in &messages {
            let published = self
                .policy
                .call("topic.publish", || {
                    self.topic.publish(&message.body, &self.subject)
                })
                .await;

            match published {
                Ok(topic_message_id) => {
                    report.published += 1;
                    debug!(
                        message_id = %message.message_id,
                        topic_message_id = %topic_message_id,
                        "notification published"
                    );
                }
                Err(e) => {
                    report.publish_failures += 1;
                    warn!(
                        message_id = %message.message_id,
                        error = %e,
                        "publish failed, message left on queue"
                    );
                    continue;
                }
            }

            if let Err(e) = self
                .policy
                .call("queue.delete_message", || {
                    self.queue.delete_message(&message.receipt_handle)
                })
                .await
            {
                report.delete_failures += 1;
                warn!(
                    message_id = %message.message_id,
                    error = %e,
                    "delete after publish failed, message will be redelivered"
                );
            }
        }

        info!(
            received = report.received,
            published = report.published,
            publish_failures = report.publish_failures,
            delete_failures = report.delete_failures,
            "relay run complete"
        );
        Ok(report)
    }
}

/// Runs a [`NotificationRelay`] on its configured interval until cancelled.
///
/// Runs are awaited inline, so they never overlap; missed ticks are skipped.
/// Cancellation is observed between runs only.
pub struct RelayScheduler {
    relay: Arc<NotificationRelay>,
    interval: Duration,
}

impl RelayScheduler {
    pub fn new(relay: Arc<NotificationRelay>) -> Self {
        let interval = relay.interval();
        Self { relay, interval }
    }

    /// Spawn the scheduler loop on the current runtime.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Drive the relay until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        info!(interval = ?self.interval, "relay scheduler started");
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("relay scheduler received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    match self.relay.try_run().await {
                        Ok(RelayOutcome::Completed(report)) if report.received > 0 => {
                            debug!(published = report.published, "scheduled relay run finished");
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!(error = %e, "relay run failed");
                        }
                    }
                }
            }
        }

        info!("relay scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering as AtomicOrdering;

    use imagecast_memory::{MemoryQueue, MemoryTopic};

    use super::*;
    use crate::testing::{FaultyQueue, FaultyTopic};

    struct Fixture {
        queue: Arc<FaultyQueue>,
        topic: Arc<FaultyTopic>,
        relay: Arc<NotificationRelay>,
    }

    fn fixture(config: &RelayConfig) -> Fixture {
        let queue = Arc::new(FaultyQueue::new(MemoryQueue::new()));
        let topic = Arc::new(FaultyTopic::new(MemoryTopic::default()));
        let relay = NotificationRelay::new(
            Arc::clone(&queue) as Arc<dyn MessageQueue>,
            Arc::clone(&topic) as Arc<dyn Topic>,
            config,
        )
        .with_policy(CallPolicy::new(Duration::from_secs(5), Duration::from_millis(1)));
        Fixture {
            queue,
            topic,
            relay: Arc::new(relay),
        }
    }

    async fn run(relay: &NotificationRelay) -> RelayReport {
        match relay.try_run().await.unwrap() {
            RelayOutcome::Completed(report) => report,
            RelayOutcome::Skipped => panic!("run unexpectedly skipped"),
        }
    }

    #[tokio::test]
    async fn relays_and_deletes_every_message() {
        let fx = fixture(&RelayConfig::default());
        for body in ["m1", "m2", "m3"] {
            fx.queue.inner.send(body).await.unwrap();
        }

        let report = run(&fx.relay).await;
        assert_eq!(
            report,
            RelayReport {
                received: 3,
                published: 3,
                publish_failures: 0,
                delete_failures: 0,
            }
        );
        assert!(fx.queue.inner.is_empty().await);

        let published = fx.topic.inner.published().await;
        let bodies: Vec<&str> = published.iter().map(|p| p.message.as_str()).collect();
        assert_eq!(bodies, ["m1", "m2", "m3"]);
        assert!(published.iter().all(|p| p.subject == DEFAULT_SUBJECT));
    }

    #[tokio::test]
    async fn failed_publish_keeps_message_for_next_run() {
        let fx = fixture(&RelayConfig::default());
        for body in ["m1", "m2", "m3"] {
            fx.queue.inner.send(body).await.unwrap();
        }
        fx.topic.fail_body("m2");

        let report = run(&fx.relay).await;
        assert_eq!(report.received, 3);
        assert_eq!(report.published, 2);
        assert_eq!(report.publish_failures, 1);
        assert_eq!(fx.queue.inner.bodies().await, ["m2"]);

        fx.topic.clear_failures();
        let report = run(&fx.relay).await;
        assert_eq!(report.received, 1);
        assert_eq!(report.published, 1);
        assert!(fx.queue.inner.is_empty().await);

        let bodies: Vec<String> = fx
            .topic
            .inner
            .published()
            .await
            .into_iter()
            .map(|p| p.message)
            .collect();
        assert_eq!(bodies, ["m1", "m3", "m2"]);
    }

    #[tokio::test]
    async fn empty_queue_is_a_no_op() {
        let fx = fixture(&RelayConfig::default());
        assert_eq!(run(&fx.relay).await, RelayReport::default());
        assert_eq!(run(&fx.relay).await, RelayReport::default());
        assert_eq!(fx.topic.publishes.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn delete_failure_is_counted_and_message_redelivered() {
        let fx = fixture(&RelayConfig::default());
        fx.queue.inner.send("m1").await.unwrap();
        fx.queue.fail_delete.store(true, AtomicOrdering::SeqCst);

        let report = run(&fx.relay).await;
        assert_eq!(report.published, 1);
        assert_eq!(report.delete_failures, 1);
        assert_eq!(fx.queue.inner.bodies().await, ["m1"]);
    }

    #[tokio::test]
    async fn batch_size_is_clamped() {
        let config = RelayConfig {
            batch_size: 50,
            ..RelayConfig::default()
        };
        let fx = fixture(&config);
        assert_eq!(fx.relay.batch_size(), MAX_BATCH_SIZE);
        for i in 0..12 {
            fx.queue.inner.send(&format!("m{i}")).await.unwrap();
        }
        assert_eq!(run(&fx.relay).await.received, 10);
        assert_eq!(run(&fx.relay).await.received, 2);

        let config = RelayConfig {
            batch_size: 0,
            ..RelayConfig::default()
        };
        assert_eq!(fixture(&config).relay.batch_size(), 1);
    }

    #[tokio::test]
    async fn custom_subject_is_used() {
        let config = RelayConfig {
            subject: "fresh pixels".into(),
            ..RelayConfig::default()
        };
        let fx = fixture(&config);
        fx.queue.inner.send("m1").await.unwrap();
        run(&fx.relay).await;
        assert_eq!(fx.topic.inner.published().await[0].subject, "fresh pixels");
    }

    #[tokio::test]
    async fn receive_failure_is_an_error() {
        let fx = fixture(&RelayConfig::default());
        fx.queue.fail_receive.store(true, AtomicOrdering::SeqCst);
        let err = fx.relay.try_run().await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ExternalService { operation: "queue.receive_batch", .. }
        ));
        // The guard is released after a failed run.
        fx.queue.fail_receive.store(false, AtomicOrdering::SeqCst);
        assert!(matches!(
            fx.relay.try_run().await.unwrap(),
            RelayOutcome::Completed(_)
        ));
    }

    #[tokio::test]
    async fn overlapping_run_is_skipped() {
        let fx = fixture(&RelayConfig::default());
        fx.queue.inner.send("m1").await.unwrap();
        let gate = fx.topic.hold_publishes();

        let relay = Arc::clone(&fx.relay);
        let first = tokio::spawn(async move { relay.try_run().await });

        // Wait until the first run is blocked inside publish.
        while fx.topic.publishes.load(AtomicOrdering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(fx.relay.try_run().await.unwrap(), RelayOutcome::Skipped);

        gate.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert!(matches!(outcome, RelayOutcome::Completed(r) if r.published == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_runs_on_interval_and_stops_on_cancel() {
        let fx = fixture(&RelayConfig {
            interval: Duration::from_secs(30),
            ..RelayConfig::default()
        });
        fx.queue.inner.send("m1").await.unwrap();

        let cancel = CancellationToken::new();
        let handle = RelayScheduler::new(Arc::clone(&fx.relay)).spawn(cancel.clone());

        // The first tick fires immediately.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(fx.topic.inner.published().await.len(), 1);

        fx.queue.inner.send("m2").await.unwrap();
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(fx.topic.inner.published().await.len(), 1);
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(fx.topic.inner.published().await.len(), 2);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler should stop after cancellation")
            .unwrap();
    }
}
