//! Exponential backoff with jitter.

use std::time::Duration;
use rand::Rng;

/// Delay to wait after failed attempt `attempt` (1-based).
///
/// `base * 2^(attempt-1)` plus a uniform jitter in `[0, jitter)`.
pub fn calculate_backoff(attempt: u32, base: Duration, jitter: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponential_base = 2u32.saturating_pow(attempt - 1);
    let delay = base.saturating_mul(exponential_base);

    let jitter_ms = jitter.as_millis() as u64;
    let jitter = if jitter_ms > 0 {
        rand::thread_rng().gen_range(0..jitter_ms)
    } else {
        0
    };

    delay.saturating_add(Duration::from_millis(jitter))
}
