//! Retry state machine.
//!
//! # States
//! ```text
//! Attempting(n) ── Success ──────────────────────────▶ Succeeded
//!       │
//!       ├──── NonTransient ──────────────────────────▶ FailedNonTransient
//!       │
//!       └──── Transient ── n < max ── sleep(backoff) ─▶ Attempting(n+1)
//!                      └── n == max ─────────────────▶ FailedExhausted
//! ```
//!
//! Exactly one `AttemptRecord` is appended per state visit of `Attempting(n)`,
//! so the history never exceeds `max_attempts` and nothing follows a
//! `Success` or `NonTransientFail`.

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::Instant as Deadline;

use crate::dispatch::envelope::{AttemptRecord, Outcome, RetryRun};
use crate::dispatch::fault::{ExecutorFailure, FaultClass};
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::timeouts::{attempt_deadline, with_attempt_timeout};

/// Retry policy for one request. Immutable for the request's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResiliencePolicy {
    /// At least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub per_attempt_timeout: Duration,
    pub jitter: Duration,
}

/// Drive `attempt_fn` until success, a non-transient failure, or exhaustion.
///
/// `attempt_fn` receives the 1-based attempt index and the instant at which
/// the attempt will be cancelled. It must start from scratch each time.
pub async fn run_with_retries<T, F, Fut>(policy: &ResiliencePolicy, mut attempt_fn: F) -> RetryRun<T>
where
    F: FnMut(u32, Deadline) -> Fut,
    Fut: Future<Output = Result<T, ExecutorFailure>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = Vec::with_capacity(max_attempts as usize);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let started = Instant::now();
        let deadline = attempt_deadline(policy.per_attempt_timeout);
        let result = with_attempt_timeout(policy.per_attempt_timeout, deadline, attempt_fn(attempt, deadline)).await;
        let elapsed = started.elapsed();

        let failure = match result {
            Ok(value) => {
                attempts.push(AttemptRecord::new(attempt, Outcome::Success, elapsed));
                metrics::record_attempt(Outcome::Success);
                return RetryRun {
                    attempts,
                    result: Ok(value),
                };
            }
            Err(failure) => failure,
        };

        let class = failure.class();
        let outcome = Outcome::from(class);
        attempts.push(AttemptRecord::new(attempt, outcome, elapsed));
        metrics::record_attempt(outcome);

        if class == FaultClass::NonTransient {
            tracing::warn!(attempt, error = %failure, "Non-transient failure, giving up");
            return RetryRun {
                attempts,
                result: Err(failure),
            };
        }

        if attempt >= max_attempts {
            tracing::warn!(attempt, error = %failure, "Attempts exhausted");
            return RetryRun {
                attempts,
                result: Err(failure),
            };
        }

        let delay = calculate_backoff(attempt, policy.base_delay, policy.jitter);
        tracing::info!(attempt, delay = ?delay, error = %failure, "Retrying after transient failure");
        tokio::time::sleep(delay).await;
    }
}
