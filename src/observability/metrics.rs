//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): dispatched requests by executor, status
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_attempts_total` (counter): attempts by outcome
//! - `gateway_rejections_total` (counter): validation rejections by reason
//!
//! The same totals are kept in [`DispatchStats`] for the plain text
//! `/metrics` summary, which works without the Prometheus exporter.

use std::fmt::Write;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::dispatch::envelope::{Envelope, Outcome, Status};
use crate::dispatch::validator::{ExecutorKind, ValidationError};

/// Start the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install Prometheus exporter"),
    }
}

pub fn record_attempt(outcome: Outcome) {
    metrics::counter!("gateway_attempts_total", "outcome" => outcome.as_str()).increment(1);
}

pub fn record_request(kind: ExecutorKind, status: Status, started: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "executor" => kind.as_str(),
        "status" => status.as_str()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "executor" => kind.as_str())
        .record(started.elapsed().as_secs_f64());
}

pub fn record_rejection(error: &ValidationError) {
    let reason = match error {
        ValidationError::BodyTooLarge => "body_too_large",
        ValidationError::InvalidCommand => "invalid_command",
    };
    metrics::counter!("gateway_rejections_total", "reason" => reason).increment(1);
}

/// In-process request counters shared by all handlers.
#[derive(Debug, Default)]
pub struct DispatchStats {
    requests: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    attempts: AtomicU64,
}

impl DispatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_envelope(&self, envelope: &Envelope) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.attempts
            .fetch_add(envelope.attempts.len() as u64, Ordering::Relaxed);
        match envelope.status {
            Status::Success => self.succeeded.fetch_add(1, Ordering::Relaxed),
            Status::Fail => self.failed.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn record_rejection(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Plain text summary, one `Name: value` per line.
    pub fn render(&self, max_attempts: u32) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "MaxAttempts: {}", max_attempts);
        let _ = writeln!(out, "Requests: {}", self.requests());
        let _ = writeln!(out, "Success: {}", self.succeeded.load(Ordering::Relaxed));
        let _ = writeln!(out, "Failed: {}", self.failed.load(Ordering::Relaxed));
        let _ = writeln!(out, "Rejected: {}", self.rejected.load(Ordering::Relaxed));
        let _ = write!(out, "Attempts: {}", self.attempts.load(Ordering::Relaxed));
        out
    }
}
