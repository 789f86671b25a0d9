use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use imagecast_backend::BackendError;

use crate::error::PipelineError;

/// Timeout and retry policy applied to every backend call.
///
/// Each attempt is bounded by `timeout`. Transient failures (timeouts,
/// connection errors, throttling) are retried up to `max_retries` times
/// after `retry_delay`; anything else surfaces immediately.
#[derive(Debug, Clone, Copy)]
pub struct CallPolicy {
    /// Upper bound on a single attempt.
    pub timeout: Duration,
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Pause before each retry.
    pub retry_delay: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_retries: 1,
            retry_delay: Duration::from_millis(200),
        }
    }
}

impl CallPolicy {
    /// Policy with a single retry and the given bounds.
    pub fn new(timeout: Duration, retry_delay: Duration) -> Self {
        Self {
            timeout,
            max_retries: 1,
            retry_delay,
        }
    }

    /// Run a backend call under this policy.
    ///
    /// `f` is invoked once per attempt. Backend `NotFound` becomes
    /// [`PipelineError::NotFound`], `Conflict` becomes
    /// [`PipelineError::Validation`], and every other failure becomes
    /// [`PipelineError::ExternalService`].
    pub async fn call<T, F, Fut>(&self, operation: &'static str, f: F) -> Result<T, PipelineError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let err = match tokio::time::timeout(self.timeout, f()).await {
                Ok(Ok(value)) => {
                    debug!(operation, attempt, "backend call succeeded");
                    return Ok(value);
                }
                Ok(Err(err)) => err,
                Err(_elapsed) => {
                    warn!(operation, attempt, timeout = ?self.timeout, "backend call timed out");
                    BackendError::Timeout
                }
            };

            if err.is_retryable() && attempt <= self.max_retries {
                warn!(
                    operation,
                    attempt,
                    error = %err,
                    delay_ms = %self.retry_delay.as_millis(),
                    "transient backend error, will retry"
                );
                tokio::time::sleep(self.retry_delay).await;
                continue;
            }

            return Err(surface(operation, attempt, err));
        }
    }
}

fn surface(operation: &'static str, attempts: u32, err: BackendError) -> PipelineError {
    match err {
        BackendError::NotFound(what) => PipelineError::NotFound(what),
        BackendError::Conflict(what) => PipelineError::Validation(what),
        other => {
            warn!(
                operation,
                attempts,
                error = %other,
                retryable = other.is_retryable(),
                "backend call failed"
            );
            PipelineError::ExternalService {
                operation,
                attempts,
                message: other.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast_policy() -> CallPolicy {
        CallPolicy::new(Duration::from_secs(5), Duration::from_millis(1))
    }

    #[tokio::test]
    async fn success_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let value = fast_policy()
            .call("test.op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, BackendError>(7) }
            })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_failure_is_retried_once() {
        let calls = AtomicU32::new(0);
        let value = fast_policy()
            .call("test.op", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(BackendError::Connection("reset".into()))
                    } else {
                        Ok("recovered")
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(value, "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn persistent_transient_failure_gives_up_after_two_attempts() {
        let calls = AtomicU32::new(0);
        let err = fast_policy()
            .call("queue.send", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(BackendError::Throttled) }
            })
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(
            err,
            PipelineError::ExternalService { operation: "queue.send", attempts: 2, .. }
        ));
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let err = fast_policy()
            .call("topic.publish", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(BackendError::Service("denied".into())) }
            })
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, PipelineError::ExternalService { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn not_found_and_conflict_are_mapped() {
        let err = fast_policy()
            .call("blob.get", || async {
                Err::<(), _>(BackendError::NotFound("a.png".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(ref m) if m == "a.png"));

        let err = fast_policy()
            .call("catalog.save", || async {
                Err::<(), _>(BackendError::Conflict("a.png".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_call_times_out_into_external_service_error() {
        let calls = AtomicU32::new(0);
        let policy = CallPolicy::new(Duration::from_millis(50), Duration::from_millis(10));
        let err = policy
            .call("catalog.find_all", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok::<_, BackendError>(())
                }
            })
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(
            err,
            PipelineError::ExternalService { operation: "catalog.find_all", attempts: 2, .. }
        ));
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let calls = AtomicU32::new(0);
        let policy = CallPolicy {
            max_retries: 0,
            ..fast_policy()
        };
        let _ = policy
            .call("test.op", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(BackendError::Timeout) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
