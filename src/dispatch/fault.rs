//! Fault classification.
//!
//! Executors never encode retryability in message text. Every failure carries
//! a typed [`FailureReason`], and [`classify`] maps that reason to a
//! [`FaultClass`] exhaustively.
//!
//! ```text
//! FailureReason
//! ├── Transient
//! │   ├── UpstreamStatus(5xx)
//! │   ├── Transport              - connect/DNS/reset
//! │   ├── Timeout                - per-attempt deadline expired
//! │   ├── CapabilityUnavailable
//! │   ├── SessionUnavailable
//! │   └── Invocation(None | Some(Transient))
//! └── NonTransient
//!     ├── UpstreamStatus(other non-success)
//!     ├── InvalidTarget
//!     ├── MissingCredentials
//!     ├── AuthRejected
//!     ├── InvalidParameters
//!     └── Invocation(Some(NonTransient))
//! ```

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    Transient,
    NonTransient,
}

/// Typed cause of an executor failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Upstream answered with a non-success status code.
    UpstreamStatus(u16),
    /// The outbound request could not be delivered.
    Transport,
    /// The target URL could not be constructed.
    InvalidTarget,
    /// The attempt exceeded its deadline.
    Timeout,
    /// The remote command capability could not be acquired.
    CapabilityUnavailable,
    /// Username or secret header absent.
    MissingCredentials,
    /// The backend refused the credential.
    AuthRejected,
    /// The session could not be opened for a reason other than auth.
    SessionUnavailable,
    /// The request body is not a flat JSON object.
    InvalidParameters,
    /// Command invocation failed; the backend may supply a classification.
    Invocation(Option<FaultClass>),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::UpstreamStatus(code) => write!(f, "upstream returned {}", code),
            FailureReason::Transport => f.write_str("transport error"),
            FailureReason::InvalidTarget => f.write_str("invalid target"),
            FailureReason::Timeout => f.write_str("attempt timed out"),
            FailureReason::CapabilityUnavailable => f.write_str("capability unavailable"),
            FailureReason::MissingCredentials => f.write_str("missing credentials"),
            FailureReason::AuthRejected => f.write_str("authentication rejected"),
            FailureReason::SessionUnavailable => f.write_str("session unavailable"),
            FailureReason::InvalidParameters => f.write_str("invalid parameters"),
            FailureReason::Invocation(_) => f.write_str("invocation failed"),
        }
    }
}

/// Map a failure reason to its retry classification.
pub fn classify(reason: FailureReason) -> FaultClass {
    match reason {
        FailureReason::UpstreamStatus(code) if code >= 500 => FaultClass::Transient,
        FailureReason::UpstreamStatus(_) => FaultClass::NonTransient,
        FailureReason::Transport
        | FailureReason::Timeout
        | FailureReason::CapabilityUnavailable
        | FailureReason::SessionUnavailable => FaultClass::Transient,
        FailureReason::InvalidTarget
        | FailureReason::MissingCredentials
        | FailureReason::AuthRejected
        | FailureReason::InvalidParameters => FaultClass::NonTransient,
        FailureReason::Invocation(hint) => hint.unwrap_or(FaultClass::Transient),
    }
}

/// A classified failure produced by one executor attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}: {detail}")]
pub struct ExecutorFailure {
    pub reason: FailureReason,
    pub detail: String,
}

impl ExecutorFailure {
    pub fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }

    pub fn timeout(deadline: Duration) -> Self {
        Self::new(
            FailureReason::Timeout,
            format!("no result within {}ms", deadline.as_millis()),
        )
    }

    pub fn class(&self) -> FaultClass {
        classify(self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(classify(FailureReason::UpstreamStatus(500)), FaultClass::Transient);
        assert_eq!(classify(FailureReason::UpstreamStatus(503)), FaultClass::Transient);
        assert_eq!(classify(FailureReason::UpstreamStatus(404)), FaultClass::NonTransient);
        assert_eq!(classify(FailureReason::UpstreamStatus(401)), FaultClass::NonTransient);
        assert_eq!(classify(FailureReason::UpstreamStatus(302)), FaultClass::NonTransient);
    }

    #[test]
    fn test_command_classification() {
        assert_eq!(classify(FailureReason::CapabilityUnavailable), FaultClass::Transient);
        assert_eq!(classify(FailureReason::MissingCredentials), FaultClass::NonTransient);
        assert_eq!(classify(FailureReason::AuthRejected), FaultClass::NonTransient);
        assert_eq!(classify(FailureReason::SessionUnavailable), FaultClass::Transient);
    }

    #[test]
    fn test_invocation_defaults_to_transient() {
        assert_eq!(classify(FailureReason::Invocation(None)), FaultClass::Transient);
        assert_eq!(
            classify(FailureReason::Invocation(Some(FaultClass::NonTransient))),
            FaultClass::NonTransient
        );
    }

    #[test]
    fn test_timeout_is_transient() {
        let failure = ExecutorFailure::timeout(Duration::from_millis(250));
        assert_eq!(failure.class(), FaultClass::Transient);
        assert_eq!(failure.to_string(), "attempt timed out: no result within 250ms");
    }
}
