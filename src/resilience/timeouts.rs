//! Timeout enforcement.
//!
//! Each attempt runs until a fixed deadline. Dropping the attempt future on
//! expiry cancels it; anything it owns (clients, session guards) is released
//! by drop. The deadline is handed to the attempt too, so work that must not
//! override a decided outcome can stop waiting before it.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::dispatch::fault::ExecutorFailure;

/// Deadline for an attempt starting now.
pub fn attempt_deadline(budget: Duration) -> Instant {
    Instant::now() + budget
}

/// Run one attempt until `deadline`; expiry becomes a `Timeout` failure
/// reporting `budget`.
pub async fn with_attempt_timeout<T, F>(budget: Duration, deadline: Instant, attempt: F) -> Result<T, ExecutorFailure>
where
    F: Future<Output = Result<T, ExecutorFailure>>,
{
    match tokio::time::timeout_at(deadline, attempt).await {
        Ok(result) => result,
        Err(_) => Err(ExecutorFailure::timeout(budget)),
    }
}
