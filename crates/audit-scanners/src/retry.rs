//! Adapter-local retry with exponential backoff

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::output::RawScanOutput;

/// Exponential backoff policy for retryable adapter failures
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Cap on the backoff delay
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Policy with the given retry budget and the standard 1s..10s backoff
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }

    /// Backoff delay before retry number `retry` (0-based), doubling each
    /// time and capped at `max_delay`
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_retries(2)
    }
}

/// Run `attempt` until it succeeds, returns a non-retryable failure, or
/// the retry budget is spent. Backoff sleeps are cancel-aware: a
/// cancelled scan returns the last failure immediately instead of
/// burning the remaining budget.
pub async fn run_with_retries<F, Fut>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    mut attempt: F,
) -> RawScanOutput
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = RawScanOutput>,
{
    let mut last = attempt(0).await;

    for retry in 0..policy.max_retries {
        let retryable = match &last {
            RawScanOutput::Success { .. } => return last,
            RawScanOutput::Failure { failure } => failure.retryable,
        };
        if !retryable || cancel.is_cancelled() {
            return last;
        }

        let delay = policy.delay_for(retry);
        tracing::debug!(retry = retry + 1, delay_ms = delay.as_millis() as u64, "retrying scanner run");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => return last,
        }

        last = attempt(retry + 1).await;
    }

    last
}
