//! Bounded exponential backoff
//!
//! Explicit state machine (`Pending → Retrying → Succeeded | Failed`) with an
//! injectable delay function so tests can simulate timeouts without waiting.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Boxed future returned by a delay function
pub type DelayFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Delay function; the default sleeps on the tokio timer
pub type DelayFn = Arc<dyn Fn(Duration) -> DelayFuture + Send + Sync>;

/// Retry policy
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Base delay, doubled per retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the given retry (1-based retry index)
    fn backoff(&self, retry: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(retry.saturating_sub(1))
    }
}

/// Where a retried operation currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Pending,
    Retrying { attempt: u32 },
    Succeeded,
    Failed,
}

/// Retry driver for a single logical operation
pub struct Retry {
    policy: RetryPolicy,
    delay: DelayFn,
    state: RetryState,
}

impl Retry {
    /// Create a retry driver sleeping on the tokio timer
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_delay(
            policy,
            Arc::new(|d| Box::pin(tokio::time::sleep(d)) as DelayFuture),
        )
    }

    /// Create a retry driver with an injected delay function
    pub fn with_delay(policy: RetryPolicy, delay: DelayFn) -> Self {
        Self {
            policy,
            delay,
            state: RetryState::Pending,
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    /// Run `op` until it succeeds, a permanent error occurs, or attempts are
    /// exhausted. `is_transient` decides whether an error is worth retrying.
    pub async fn run<T, E, F, Fut>(
        &mut self,
        mut op: F,
        is_transient: impl Fn(&E) -> bool,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => {
                    self.state = RetryState::Succeeded;
                    return Ok(value);
                }
                Err(err) => {
                    if attempt >= self.policy.max_attempts || !is_transient(&err) {
                        self.state = RetryState::Failed;
                        return Err(err);
                    }
                    self.state = RetryState::Retrying { attempt };
                    (self.delay)(self.policy.backoff(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn instant_delay(log: Arc<Mutex<Vec<Duration>>>) -> DelayFn {
        Arc::new(move |d| {
            log.lock().unwrap().push(d);
            Box::pin(async {}) as DelayFuture
        })
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let delays = Arc::new(Mutex::new(Vec::new()));
        let mut retry = Retry::with_delay(
            RetryPolicy { max_attempts: 3, base_delay: Duration::from_millis(100) },
            instant_delay(delays.clone()),
        );

        let calls = Arc::new(AtomicU32::new(0));
        let calls_in_op = calls.clone();
        let result: Result<u32, &str> = retry
            .run(
                move || {
                    let calls = calls_in_op.clone();
                    async move {
                        if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                            Err("transient")
                        } else {
                            Ok(42)
                        }
                    }
                },
                |_| true,
            )
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(retry.state(), RetryState::Succeeded);
        // Exponential: 100ms then 200ms
        assert_eq!(
            *delays.lock().unwrap(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let delays = Arc::new(Mutex::new(Vec::new()));
        let mut retry = Retry::with_delay(RetryPolicy::default(), instant_delay(delays.clone()));

        let result: Result<(), &str> = retry.run(|| async { Err("down") }, |_| true).await;

        assert!(result.is_err());
        assert_eq!(retry.state(), RetryState::Failed);
        assert_eq!(delays.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_fails_fast() {
        let delays = Arc::new(Mutex::new(Vec::new()));
        let mut retry = Retry::with_delay(RetryPolicy::default(), instant_delay(delays.clone()));

        let result: Result<(), &str> = retry.run(|| async { Err("bad key") }, |_| false).await;

        assert!(result.is_err());
        assert!(delays.lock().unwrap().is_empty());
    }
}
