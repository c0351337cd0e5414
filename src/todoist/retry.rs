//! Bounded exponential backoff for idempotent backend calls.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::error::{ApiError, ApiResult};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// `min(base * 2^attempt, max)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. Cancellation during a backoff sleep returns
    /// [`ApiError::Cancelled`] instead of the error that triggered the retry.
    ///
    /// Never wrap a create in this: an unacknowledged create that actually
    /// landed would be duplicated.
    pub async fn run<T, F, Fut>(&self, ct: &CancellationToken, op: F) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        self.run_while(ct, op, || true).await
    }

    /// Like [`run`](Self::run), but a retry only happens while `may_retry`
    /// holds. Otherwise the transient error is returned as is.
    pub async fn run_while<T, F, Fut, G>(
        &self,
        ct: &CancellationToken,
        mut op: F,
        may_retry: G,
    ) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
        G: Fn() -> bool,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => err,
            };

            attempt += 1;
            if attempt >= attempts {
                return Err(err);
            }
            if !may_retry() {
                warn!(attempt, error = %err, "retry skipped: no spare rate limit capacity");
                return Err(err);
            }

            let delay = self.backoff(attempt - 1);
            warn!(
                attempt,
                max_attempts = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying after transient failure"
            );

            tokio::select! {
                _ = ct.cancelled() => return Err(ApiError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
