//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Validated request:
//!     → retries.rs (attempt loop, outcome recording)
//!     → timeouts.rs (per-attempt deadline, expiry is Transient)
//!     → On transient failure: backoff.rs (exponential delay + jitter)
//!     → Loop ends on Success, NonTransient, or exhausted attempts
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every attempt has a deadline
//! - Attempts run sequentially, never in parallel
//! - Delay recomputed per attempt, never pre-scheduled
//! - Policy is an explicit immutable value, resolved once per request

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{run_with_retries, ResiliencePolicy};
