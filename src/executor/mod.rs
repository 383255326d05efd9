//! Executor subsystem.
//!
//! # Data Flow
//! ```text
//! ValidatedRequest
//!     → Executor::for_request (tagged by DispatchTarget)
//!         ├── http.rs     (forward to URL / bare host)
//!         └── command.rs  (capability → session → invoke → convert → teardown)
//!                 └── backend.rs (trait) ← remote.rs (HTTP/JSON service)
//!     → Result<Value, ExecutorFailure> per attempt
//! ```
//!
//! # Design Decisions
//! - Each attempt starts from scratch; no state crosses attempts
//! - Executors return typed failures; the resilience engine only classifies
//! - Anything acquired in an attempt is released before it returns

pub mod backend;
pub mod command;
pub mod convert;
pub mod credential;
pub mod http;
pub mod remote;

use axum::body::Bytes;
use axum::http::HeaderMap;
use serde_json::Value;
use tokio::time::Instant;

use crate::dispatch::allowlist::Allowlists;
use crate::dispatch::fault::ExecutorFailure;
use crate::dispatch::validator::{DispatchTarget, ExecutorKind, ValidatedRequest};

pub use backend::{BackendError, CommandBackend, CommandSession};
pub use command::CommandExecutor;
pub use convert::Parameters;
pub use credential::Credential;
pub use http::HttpForwarder;
pub use remote::RemoteCommandBackend;

/// The executor chosen for one request.
pub enum Executor {
    Http(HttpForwarder),
    Command {
        executor: CommandExecutor,
        name: String,
        headers: HeaderMap,
        body: Bytes,
    },
}

impl Executor {
    pub fn for_request(request: &ValidatedRequest, allowlists: &Allowlists, commands: &CommandExecutor) -> Self {
        match &request.target {
            DispatchTarget::Http { sub_path } => Executor::Http(HttpForwarder::new(
                request.method.clone(),
                sub_path.clone(),
                request.query.clone(),
                &request.headers,
                request.body.clone(),
                allowlists,
            )),
            DispatchTarget::Command { name } => Executor::Command {
                executor: commands.clone(),
                name: name.clone(),
                headers: request.headers.clone(),
                body: request.body.clone(),
            },
        }
    }

    pub fn kind(&self) -> ExecutorKind {
        match self {
            Executor::Http(_) => ExecutorKind::Http,
            Executor::Command { .. } => ExecutorKind::Command,
        }
    }

    /// Run a single attempt that will be cancelled at `deadline`.
    pub async fn execute(&self, deadline: Instant) -> Result<Value, ExecutorFailure> {
        match self {
            Executor::Http(forwarder) => forwarder.execute().await,
            Executor::Command {
                executor,
                name,
                headers,
                body,
            } => executor.execute(name, headers, body, deadline).await,
        }
    }
}
