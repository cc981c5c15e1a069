//! Timeout and retry policy around another backend

use super::{Backend, BackendError, BackendRequest, BackendResponse};
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(250);
const MAX_JITTER_MS: u64 = 100;

/// Bounds every attempt with a timeout and retries read-only requests on
/// retryable failures with exponential backoff. Writes are attempted once.
pub struct RetryingBackend<B> {
    inner: B,
    timeout: Duration,
    attempts: u32,
    base_delay: Duration,
}

impl<B: Backend> RetryingBackend<B> {
    pub fn new(inner: B, timeout: Duration, attempts: u32) -> Self {
        Self {
            inner,
            timeout,
            attempts: attempts.max(1),
            base_delay: DEFAULT_BASE_DELAY,
        }
    }

    #[cfg(test)]
    fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exponential = self.base_delay * (1 << (attempt - 1).min(6));
        let jitter = rand::thread_rng().gen_range(0..=MAX_JITTER_MS);
        exponential + Duration::from_millis(jitter)
    }
}

#[async_trait]
impl<B: Backend> Backend for RetryingBackend<B> {
    async fn call(
        &self,
        user_id: i64,
        request: &BackendRequest,
    ) -> Result<BackendResponse, BackendError> {
        let mut attempt = 1;
        loop {
            let outcome =
                match tokio::time::timeout(self.timeout, self.inner.call(user_id, request)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(BackendError::Timeout(self.timeout)),
                };

            match outcome {
                Err(e) if request.is_read_only() && e.is_retryable() && attempt < self.attempts => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        user_id,
                        op = request.op(),
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "Backend call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(user_id, op = request.op(), attempt, error = %e, "Backend call failed");
                    return Err(e);
                }
                ok => return ok,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted outcomes and counts calls
    struct Flaky {
        outcomes: Mutex<VecDeque<Result<BackendResponse, BackendError>>>,
        calls: Mutex<u32>,
        stall: Option<Duration>,
    }

    impl Flaky {
        fn new(outcomes: Vec<Result<BackendResponse, BackendError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(0),
                stall: None,
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Backend for Flaky {
        async fn call(
            &self,
            _user_id: i64,
            _request: &BackendRequest,
        ) -> Result<BackendResponse, BackendError> {
            *self.calls.lock().unwrap() += 1;
            if let Some(stall) = self.stall {
                tokio::time::sleep(stall).await;
            }
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(BackendResponse::Done))
        }
    }

    fn transport() -> Result<BackendResponse, BackendError> {
        Err(BackendError::Transport("connection reset".into()))
    }

    #[tokio::test]
    async fn reads_are_retried_until_success() {
        let flaky = Flaky::new(vec![transport(), transport(), Ok(BackendResponse::Tasks(vec![]))]);
        let backend = RetryingBackend::new(flaky, Duration::from_secs(1), 3)
            .with_base_delay(Duration::from_millis(1));

        let result = backend.call(1, &BackendRequest::ListTasks).await;

        assert_eq!(result, Ok(BackendResponse::Tasks(vec![])));
        assert_eq!(backend.inner.calls(), 3);
    }

    #[tokio::test]
    async fn reads_give_up_after_the_attempt_budget() {
        let flaky = Flaky::new(vec![transport(), transport(), transport()]);
        let backend = RetryingBackend::new(flaky, Duration::from_secs(1), 2)
            .with_base_delay(Duration::from_millis(1));

        let result = backend.call(1, &BackendRequest::ListRules).await;

        assert!(matches!(result, Err(BackendError::Transport(_))));
        assert_eq!(backend.inner.calls(), 2);
    }

    #[tokio::test]
    async fn writes_are_never_repeated() {
        let flaky = Flaky::new(vec![transport()]);
        let backend = RetryingBackend::new(flaky, Duration::from_secs(1), 5)
            .with_base_delay(Duration::from_millis(1));

        let result = backend.call(1, &BackendRequest::LeaveRoom).await;

        assert!(result.is_err());
        assert_eq!(backend.inner.calls(), 1);
    }

    #[tokio::test]
    async fn domain_errors_are_not_retried() {
        let flaky = Flaky::new(vec![Err(BackendError::domain(2, "No room"))]);
        let backend = RetryingBackend::new(flaky, Duration::from_secs(1), 3)
            .with_base_delay(Duration::from_millis(1));

        let result = backend.call(1, &BackendRequest::GetRoomInfo).await;

        assert_eq!(result, Err(BackendError::domain(2, "No room")));
        assert_eq!(backend.inner.calls(), 1);
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let mut flaky = Flaky::new(vec![]);
        flaky.stall = Some(Duration::from_millis(200));
        let backend = RetryingBackend::new(flaky, Duration::from_millis(10), 1);

        let result = backend.call(1, &BackendRequest::ListOrders).await;

        assert_eq!(result, Err(BackendError::Timeout(Duration::from_millis(10))));
    }
}
