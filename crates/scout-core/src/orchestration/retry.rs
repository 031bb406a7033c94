use std::future::Future;
use std::time::Duration;

use crate::models::TransportError;
use crate::orchestration::CancellationToken;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Bounded, fixed-delay retry schedule.
///
/// Attempts run strictly one after another with `interval` between the end
/// of one attempt and the start of the next. There is no backoff.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    interval: Duration,
    retryable: fn(&TransportError) -> bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RetryError {
    Exhausted {
        attempts: u32,
        last_error: TransportError,
    },
    Rejected {
        attempt: u32,
        error: TransportError,
    },
    Cancelled,
}

fn always_retry(_: &TransportError) -> bool {
    true
}

impl RetryPolicy {
    /// Retries every failure. `max_attempts` is at least one.
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
            retryable: always_retry,
        }
    }

    pub fn with_predicate(mut self, retryable: fn(&TransportError) -> bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_retryable(&self, error: &TransportError) -> bool {
        (self.retryable)(error)
    }

    pub fn total_delay(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts.saturating_sub(1))
    }

    pub async fn run<T, F, Fut>(
        &self,
        token: &CancellationToken,
        mut operation: F,
    ) -> Result<T, RetryError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let mut attempt = 0;
        loop {
            if token.is_cancelled() {
                return Err(RetryError::Cancelled);
            }

            attempt += 1;
            let error = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !self.is_retryable(&error) {
                return Err(RetryError::Rejected { attempt, error });
            }
            if attempt >= self.max_attempts {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last_error: error,
                });
            }

            tracing::debug!(
                attempt,
                max_attempts = self.max_attempts,
                error = %error,
                "attempt failed, retrying"
            );

            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                () = token.cancelled() => return Err(RetryError::Cancelled),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL)
    }
}
