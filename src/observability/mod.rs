//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatch path produces:
//!     → logging.rs (structured log events, request_id on every line)
//!     → metrics.rs (counters via the `metrics` facade + in-process stats)
//!
//! Consumers:
//!     → stdout (JSON or pretty)
//!     → GET /metrics (plain text counters summary)
//!     → Prometheus exporter (optional, separate listener)
//! ```
//!
//! # Design Decisions
//! - Credentials never appear in log fields
//! - Counters are atomic increments; no locks on the request path

pub mod logging;
pub mod metrics;
