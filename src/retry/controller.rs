//! Retry controller that drives one async operation through a backoff
//! schedule.
//!
//! Every call to [`RetryController::retry`] starts a new run with its own
//! generation number. A run only writes state while it is the latest one, so
//! calling `retry()` again cancels the previous run at its next suspension
//! point (after the in-flight attempt or during its backoff sleep) and
//! restarts the attempt counter.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use super::RetryConfig;

type Operation<T, E> = dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync;

/// Observable progress of a retryable operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryState<T, E> {
    /// Result of the last successful attempt. Kept across failed runs.
    pub data: Option<T>,
    /// True while a run is in progress, backoff sleeps included.
    pub loading: bool,
    /// Final failure of the last run, after all retries were used.
    pub error: Option<E>,
    /// Index of the current (or succeeding, or last) attempt within the run.
    pub retry_count: u32,
    max_retries: u32,
}

impl<T, E> RetryState<T, E> {
    pub(crate) fn new(max_retries: u32) -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            retry_count: 0,
            max_retries,
        }
    }

    /// Whether the run has retries remaining.
    pub fn has_retries_left(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Whether the run finished, successfully or not.
    pub fn is_settled(&self) -> bool {
        !self.loading && (self.data.is_some() || self.error.is_some())
    }
}

struct Inner<T, E> {
    operation: Box<Operation<T, E>>,
    config: RetryConfig,
    generation: AtomicU64,
    state: watch::Sender<RetryState<T, E>>,
}

/// Wraps a fallible async operation with bounded, exponentially backed-off
/// retries.
///
/// Intermediate failures are logged and retried; only the failure of the
/// final attempt lands in [`RetryState::error`]. `retry()` never returns an
/// error itself.
///
/// # Example
///
/// ```ignore
/// let controller = RetryController::new(|| async { api.save_patient().await }, RetryConfig::default());
/// controller.retry().await;
/// if let Some(err) = controller.state().error { /* show it */ }
/// ```
pub struct RetryController<T, E> {
    inner: Arc<Inner<T, E>>,
}

impl<T, E> Clone for RetryController<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for RetryController<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryController")
            .field("config", &self.inner.config)
            .field("generation", &self.inner.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<T, E> RetryController<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + fmt::Display + Send + Sync + 'static,
{
    /// Creates a controller around `operation`. Nothing runs until
    /// [`retry`](Self::retry) is called.
    pub fn new<F, Fut>(operation: F, config: RetryConfig) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (state, _) = watch::channel(RetryState::new(config.max_retries));
        Self {
            inner: Arc::new(Inner {
                operation: Box::new(move || operation().boxed()),
                config,
                generation: AtomicU64::new(0),
                state,
            }),
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.inner.config
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> RetryState<T, E> {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<RetryState<T, E>> {
        self.inner.state.subscribe()
    }

    /// Runs the operation from attempt 0, retrying with backoff until it
    /// succeeds or `max_retries + 1` attempts have failed.
    ///
    /// Supersedes any run still in progress.
    pub async fn retry(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let config = &self.inner.config;

        self.update(generation, |state| {
            state.loading = true;
            state.error = None;
            state.retry_count = 0;
        });

        let mut attempt: u32 = 0;
        loop {
            debug!(generation, attempt, "retry attempt started");
            let outcome = (self.inner.operation)().await;

            if !self.is_current(generation) {
                debug!(generation, attempt, "retry run superseded");
                return;
            }

            match outcome {
                Ok(value) => {
                    debug!(generation, attempt, "retry attempt succeeded");
                    self.update(generation, |state| {
                        state.data = Some(value);
                        state.error = None;
                        state.loading = false;
                        state.retry_count = attempt;
                    });
                    return;
                }
                Err(err) if attempt < config.max_retries => {
                    let delay = config.delay_for(attempt);
                    warn!(
                        generation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, retrying after backoff"
                    );
                    self.update(generation, |state| state.retry_count = attempt + 1);

                    tokio::time::sleep(delay).await;
                    if !self.is_current(generation) {
                        debug!(generation, attempt, "retry run superseded during backoff");
                        return;
                    }
                    attempt += 1;
                }
                Err(err) => {
                    error!(generation, attempt, error = %err, "all retry attempts failed");
                    self.update(generation, |state| {
                        state.error = Some(err);
                        state.loading = false;
                        state.retry_count = attempt;
                    });
                    return;
                }
            }
        }
    }

    /// A callback that starts a retry run on the current Tokio runtime.
    ///
    /// Suitable as a toast action, e.g. the "Tentar novamente" button created
    /// by [`crate::error::NotificationErrorMapper`].
    pub fn retry_callback(&self) -> impl Fn() + Send + Sync + 'static {
        let controller = self.clone();
        move || {
            let controller = controller.clone();
            tokio::spawn(async move {
                controller.retry().await;
            });
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == generation
    }

    fn update(&self, generation: u64, apply: impl FnOnce(&mut RetryState<T, E>)) {
        self.inner.state.send_if_modified(|state| {
            if self.is_current(generation) {
                apply(state);
                true
            } else {
                false
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    type Attempts = Arc<Mutex<Vec<Instant>>>;

    fn always_failing() -> (RetryController<u32, String>, Attempts) {
        let attempts: Attempts = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&attempts);
        let controller = RetryController::new(
            move || {
                let log = Arc::clone(&log);
                async move {
                    let mut log = log.lock().unwrap();
                    log.push(Instant::now());
                    Err::<u32, String>(format!("falha {}", log.len()))
                }
            },
            RetryConfig::default(),
        );
        (controller, attempts)
    }

    fn succeeding_on(attempt: u32) -> (RetryController<u32, String>, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let controller = RetryController::new(
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n >= attempt {
                        Ok(n * 10)
                    } else {
                        Err(format!("falha {}", n))
                    }
                }
            },
            RetryConfig::default(),
        );
        (controller, calls)
    }

    #[tokio::test]
    async fn test_initial_state() {
        let (controller, _) = always_failing();
        let state = controller.state();
        assert!(state.data.is_none());
        assert!(state.error.is_none());
        assert!(!state.loading);
        assert_eq!(state.retry_count, 0);
        assert!(state.has_retries_left());
        assert!(!state.is_settled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_attempts_four_times_with_backoff() {
        let (controller, attempts) = always_failing();
        controller.retry().await;

        let attempts = attempts.lock().unwrap().clone();
        assert_eq!(attempts.len(), 4);
        let gaps: Vec<Duration> = attempts.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(
            gaps,
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(4000),
            ]
        );

        let state = controller.state();
        assert_eq!(state.error.as_deref(), Some("falha 4"));
        assert!(state.data.is_none());
        assert!(!state.loading);
        assert!(!state.has_retries_left());
        assert_eq!(state.retry_count, 3);
        assert!(state.is_settled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_failures() {
        let (controller, calls) = succeeding_on(2);
        controller.retry().await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let state = controller.state();
        assert_eq!(state.data, Some(20));
        assert!(state.error.is_none());
        assert!(!state.loading);
        assert_eq!(state.retry_count, 2);
        assert!(state.has_retries_left());
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success() {
        let (controller, calls) = succeeding_on(0);
        let started = Instant::now();
        controller.retry().await;

        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state().data, Some(0));
        assert_eq!(controller.state().retry_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_intermediate_failures_are_not_exposed() {
        let (controller, _) = always_failing();
        let runner = controller.clone();
        let handle = tokio::spawn(async move { runner.retry().await });

        tokio::time::sleep(Duration::from_millis(500)).await;
        let state = controller.state();
        assert!(state.loading);
        assert!(state.error.is_none());
        assert_eq!(state.retry_count, 1);

        handle.await.unwrap();
        assert!(controller.state().error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_restarts_counter() {
        let (controller, attempts) = always_failing();
        controller.retry().await;
        assert_eq!(controller.state().retry_count, 3);

        controller.retry().await;
        assert_eq!(attempts.lock().unwrap().len(), 8);
        assert_eq!(controller.state().error.as_deref(), Some("falha 8"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_retry_cancels_stale_run() {
        let (controller, attempts) = always_failing();
        let first = controller.clone();
        let stale = tokio::spawn(async move { first.retry().await });

        // First run: attempts at 0ms and 1000ms, then sleeps until 3000ms.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(attempts.lock().unwrap().len(), 2);

        controller.retry().await;
        stale.await.unwrap();

        // Second run made all four attempts; the stale run never resumed.
        assert_eq!(attempts.lock().unwrap().len(), 6);
        let state = controller.state();
        assert_eq!(state.error.as_deref(), Some("falha 6"));
        assert_eq!(state.retry_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_run_keeps_previous_data() {
        let healthy = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let flag = Arc::clone(&healthy);
        let controller = RetryController::new(
            move || {
                let ok = flag.load(Ordering::SeqCst);
                async move {
                    if ok {
                        Ok("paciente".to_string())
                    } else {
                        Err("offline".to_string())
                    }
                }
            },
            RetryConfig::default().with_max_retries(1),
        );

        controller.retry().await;
        healthy.store(false, Ordering::SeqCst);
        controller.retry().await;

        let state = controller.state();
        assert_eq!(state.data.as_deref(), Some("paciente"));
        assert_eq!(state.error.as_deref(), Some("offline"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_callback_spawns_run() {
        let (controller, calls) = succeeding_on(0);
        let mut rx = controller.subscribe();
        let callback = controller.retry_callback();

        callback();
        rx.wait_for(|state| state.is_settled()).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state().data, Some(0));
    }
}
