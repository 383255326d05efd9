//! Resilient dispatch engine.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → validator.rs (body ceiling, sub-path, executor kind, command allowlist)
//!         └── ValidationError → 400, no attempts
//!     → executor (HTTP forward or remote command)
//!     → resilience (retry loop, per-attempt timeout, fault.rs classification)
//!     → envelope.rs (always exactly one envelope)
//! ```
//!
//! # Design Decisions
//! - A `Gateway` is an immutable snapshot built from one configuration
//! - Allowlists are compiled once per snapshot and shared read-only
//! - The resilience policy is resolved once per request and passed explicitly

pub mod allowlist;
pub mod envelope;
pub mod fault;
pub mod validator;

use std::sync::Arc;
use std::time::Duration;
use axum::body::Body;
use axum::http::Request;
use chrono::{DateTime, Utc};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::executor::{CommandBackend, CommandExecutor, Executor, RemoteCommandBackend};
use crate::resilience::run_with_retries;

pub use allowlist::Allowlists;
pub use envelope::{AttemptRecord, Envelope, Outcome, RetryRun, Status};
pub use fault::{classify, ExecutorFailure, FailureReason, FaultClass};
pub use validator::{DispatchTarget, ExecutorKind, ValidatedRequest, ValidationError};

/// Immutable dispatch state derived from one configuration.
pub struct Gateway {
    config: GatewayConfig,
    allowlists: Allowlists,
    commands: CommandExecutor,
}

impl Gateway {
    /// Build with the remote command backend named in the config.
    pub fn new(config: GatewayConfig) -> Self {
        let backend = Arc::new(RemoteCommandBackend::new(config.command.backend_url.clone()));
        Self::with_backend(config, backend)
    }

    pub fn with_backend(config: GatewayConfig, backend: Arc<dyn CommandBackend>) -> Self {
        let allowlists = Allowlists::from_config(&config);
        let commands = CommandExecutor::new(backend, config.command.stub_mode)
            .with_teardown_timeout(Duration::from_millis(config.command.teardown_timeout_ms));
        Self {
            config,
            allowlists,
            commands,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Validate and buffer an inbound request.
    pub async fn validate(&self, request: Request<Body>) -> Result<ValidatedRequest, ValidationError> {
        let (parts, body) = request.into_parts();
        validator::validate(
            parts,
            body,
            self.config.limits.max_body_size,
            &self.config.command.path_prefix,
            &self.allowlists,
        )
        .await
    }

    /// Run the retry loop for a validated request and assemble its envelope.
    pub async fn dispatch(&self, request: ValidatedRequest, request_id: Uuid, start: DateTime<Utc>) -> Envelope {
        let policy = self.config.resilience.policy();
        let executor = Executor::for_request(&request, &self.allowlists, &self.commands);
        let kind = executor.kind();

        let executor = &executor;
        let run = run_with_retries(&policy, move |attempt, deadline| {
            tracing::debug!(attempt, "Starting attempt");
            executor.execute(deadline)
        })
        .instrument(tracing::info_span!("dispatch", request_id = %request_id, executor = %kind))
        .await;

        Envelope::assemble(request_id, kind, start, run)
    }
}
