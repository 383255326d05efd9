//! Remote command capability contract.
//!
//! The command executor only needs three things from a backend: acquire the
//! capability, open a session with a credential, and run commands on that
//! session. Sessions are opened per attempt and closed before the attempt ends.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::dispatch::fault::{ExecutorFailure, FailureReason, FaultClass};
use crate::executor::convert::Parameters;
use crate::executor::credential::Credential;

/// Errors reported by a command backend, already typed by cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    #[error("session unavailable: {0}")]
    SessionUnavailable(String),

    /// `class` overrides the default (transient) classification.
    #[error("invocation failed: {message}")]
    Invocation {
        message: String,
        class: Option<FaultClass>,
    },

    #[error("teardown failed: {0}")]
    Teardown(String),
}

impl From<BackendError> for ExecutorFailure {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::CapabilityUnavailable(m) => {
                ExecutorFailure::new(FailureReason::CapabilityUnavailable, m)
            }
            BackendError::AuthRejected(m) => ExecutorFailure::new(FailureReason::AuthRejected, m),
            BackendError::SessionUnavailable(m) => {
                ExecutorFailure::new(FailureReason::SessionUnavailable, m)
            }
            BackendError::Invocation { message, class } => {
                ExecutorFailure::new(FailureReason::Invocation(class), message)
            }
            // Teardown never decides an attempt; treated like any session fault if it leaks here.
            BackendError::Teardown(m) => ExecutorFailure::new(FailureReason::SessionUnavailable, m),
        }
    }
}

#[async_trait]
pub trait CommandBackend: Send + Sync {
    /// Make sure the remote command capability is usable.
    async fn import_capability(&self) -> Result<(), BackendError>;

    /// Open a session authenticated with `credential`.
    async fn connect(&self, credential: &Credential) -> Result<Box<dyn CommandSession>, BackendError>;
}

#[async_trait]
pub trait CommandSession: Send + Sync {
    /// Run `command` and return its result objects.
    async fn invoke(&self, command: &str, parameters: &Parameters) -> Result<Vec<Value>, BackendError>;

    /// Release the session. Called exactly once.
    async fn close(&mut self) -> Result<(), BackendError>;
}
