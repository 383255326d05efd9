//! Remote command executor.
//!
//! # Stages (entered fresh on every attempt)
//! ```text
//! Idle → ImportCapability → Authenticate → Execute → ConvertResult → Teardown → Done
//! ```
//! Command allowlisting happens during validation, before the first attempt.
//! Teardown runs whatever the execute outcome and is bounded by the
//! configured teardown timeout; if the attempt is cancelled mid-flight, the
//! session guard schedules the close on drop.

use std::sync::Arc;
use std::time::Duration;
use axum::http::HeaderMap;
use serde_json::{json, Value};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::dispatch::fault::ExecutorFailure;
use crate::executor::backend::{BackendError, CommandBackend, CommandSession};
use crate::executor::convert::{parse_parameters, serialize_results, Parameters};
use crate::executor::credential::Credential;

const DEFAULT_TEARDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Teardown stops waiting this long before the attempt deadline.
const TEARDOWN_MARGIN: Duration = Duration::from_millis(10);

/// Runs allowlisted commands against a [`CommandBackend`].
#[derive(Clone)]
pub struct CommandExecutor {
    backend: Arc<dyn CommandBackend>,
    stub_mode: bool,
    teardown_timeout: Duration,
}

impl CommandExecutor {
    pub fn new(backend: Arc<dyn CommandBackend>, stub_mode: bool) -> Self {
        Self {
            backend,
            stub_mode,
            teardown_timeout: DEFAULT_TEARDOWN_TIMEOUT,
        }
    }

    /// Bound every session close, including ones left running after their attempt.
    pub fn with_teardown_timeout(mut self, teardown_timeout: Duration) -> Self {
        self.teardown_timeout = teardown_timeout;
        self
    }

    /// One attempt. Success yields `{Command, Output}` with `Output` as JSON text.
    ///
    /// `deadline` is when the caller cancels the attempt. Once the execute
    /// outcome is known, teardown is awaited only until then and otherwise
    /// finishes in the background, so a slow close never turns a decided
    /// outcome into a timeout.
    pub async fn execute(
        &self,
        command: &str,
        headers: &HeaderMap,
        body: &[u8],
        deadline: Instant,
    ) -> Result<Value, ExecutorFailure> {
        if self.stub_mode {
            return stub_result(command);
        }

        tracing::debug!(command, stage = "import_capability", "Command attempt");
        self.backend.import_capability().await?;

        tracing::debug!(command, stage = "authenticate", "Command attempt");
        let session = {
            let credential = Credential::from_headers(headers)?;
            self.backend.connect(&credential).await?
        };
        let session = SessionGuard::new(session, self.teardown_timeout);

        tracing::debug!(command, stage = "execute", "Command attempt");
        let outcome = match parse_parameters(body) {
            Ok(parameters) => run(&session, command, &parameters).await,
            Err(failure) => Err(failure),
        };

        tracing::debug!(command, stage = "teardown", "Command attempt");
        session.release(deadline.checked_sub(TEARDOWN_MARGIN).unwrap_or(deadline)).await;

        outcome
    }
}

async fn run(session: &SessionGuard, command: &str, parameters: &Parameters) -> Result<Value, ExecutorFailure> {
    let objects = session.invoke(command, parameters).await?;
    let output = serialize_results(objects)?;
    Ok(json!({ "Command": command, "Output": output }))
}

fn stub_result(command: &str) -> Result<Value, ExecutorFailure> {
    let output = serialize_results(vec![json!({
        "DisplayName": "Test Command",
        "Identity": "testcommand@example.com",
    })])?;
    Ok(json!({ "Command": command, "Output": output }))
}

/// Owns an open session and guarantees it is closed exactly once.
struct SessionGuard {
    session: Option<Box<dyn CommandSession>>,
    teardown_timeout: Duration,
}

impl SessionGuard {
    fn new(session: Box<dyn CommandSession>, teardown_timeout: Duration) -> Self {
        Self {
            session: Some(session),
            teardown_timeout,
        }
    }

    async fn invoke(&self, command: &str, parameters: &Parameters) -> Result<Vec<Value>, BackendError> {
        match &self.session {
            Some(session) => session.invoke(command, parameters).await,
            None => Err(BackendError::SessionUnavailable("session already released".to_string())),
        }
    }

    /// Close the session, waiting for it no later than `wait_until`.
    ///
    /// Teardown failures are logged and never change the outcome.
    async fn release(mut self, wait_until: Instant) {
        let Some(session) = self.session.take() else {
            return;
        };
        let close = spawn_close(session, self.teardown_timeout);
        if tokio::time::timeout_at(wait_until, close).await.is_err() {
            tracing::warn!("Session teardown still running at attempt deadline; finishing in background");
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if Handle::try_current().is_ok() {
            spawn_close(session, self.teardown_timeout);
        } else {
            tracing::warn!("Session dropped outside runtime; teardown skipped");
        }
    }
}

/// Close `session` on its own task, giving up after `limit`.
fn spawn_close(mut session: Box<dyn CommandSession>, limit: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::time::timeout(limit, session.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Session teardown failed"),
            Err(_) => tracing::warn!(limit = ?limit, "Session teardown timed out"),
        }
    })
}
