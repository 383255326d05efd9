//! Response envelope assembly.
//!
//! Every request that passes validation produces exactly one [`Envelope`],
//! whatever the outcome of the retry loop.

use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::dispatch::fault::{ExecutorFailure, FaultClass};
use crate::dispatch::validator::ExecutorKind;

/// Outcome of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    TransientFail,
    NonTransientFail,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "Success",
            Outcome::TransientFail => "TransientFail",
            Outcome::NonTransientFail => "NonTransientFail",
        }
    }
}

impl From<FaultClass> for Outcome {
    fn from(class: FaultClass) -> Self {
        match class {
            FaultClass::Transient => Outcome::TransientFail,
            FaultClass::NonTransient => Outcome::NonTransientFail,
        }
    }
}

/// Overall status of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Success,
    Fail,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "Success",
            Status::Fail => "Fail",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttemptRecord {
    /// 1-based attempt index.
    pub attempt: u32,
    pub outcome: Outcome,
    pub duration_ms: f64,
}

impl AttemptRecord {
    pub fn new(attempt: u32, outcome: Outcome, duration: Duration) -> Self {
        Self {
            attempt,
            outcome,
            duration_ms: duration.as_nanos() as f64 / 1_000_000.0,
        }
    }
}

/// Attempt history and final result of one retry loop.
#[derive(Debug)]
pub struct RetryRun<T> {
    pub attempts: Vec<AttemptRecord>,
    pub result: Result<T, ExecutorFailure>,
}

impl<T> RetryRun<T> {
    pub fn status(&self) -> Status {
        if self.result.is_ok() {
            Status::Success
        } else {
            Status::Fail
        }
    }
}

/// The structured response describing a whole request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Envelope {
    pub request_id: Uuid,
    pub executor_type: ExecutorKind,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: Status,
    pub attempts: Vec<AttemptRecord>,
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    /// Finalize the envelope; `end` is taken now.
    pub fn assemble(
        request_id: Uuid,
        executor_type: ExecutorKind,
        start: DateTime<Utc>,
        run: RetryRun<Value>,
    ) -> Self {
        let status = run.status();
        let (result, error) = match run.result {
            Ok(value) => (Some(value), None),
            Err(failure) => (None, Some(failure.to_string())),
        };

        Self {
            request_id,
            executor_type,
            start,
            end: Utc::now(),
            status,
            attempts: run.attempts,
            result,
            error,
        }
    }

    /// Render as JSON; falls back to a minimal `Fail` envelope if that fails.
    pub fn to_json(&self) -> Vec<u8> {
        match serde_json::to_vec(self) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(request_id = %self.request_id, error = %e, "Envelope serialization failed");
                self.minimal_json()
            }
        }
    }

    fn minimal_json(&self) -> Vec<u8> {
        json!({
            "RequestId": self.request_id,
            "ExecutorType": self.executor_type,
            "Status": Status::Fail,
            "Attempts": [],
            "Result": null,
        })
        .to_string()
        .into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::fault::FailureReason;
    use serde_json::json;

    fn record(n: u32, outcome: Outcome) -> AttemptRecord {
        AttemptRecord::new(n, outcome, Duration::from_millis(12))
    }

    #[test]
    fn test_success_envelope_shape() {
        let run = RetryRun {
            attempts: vec![record(1, Outcome::TransientFail), record(2, Outcome::Success)],
            result: Ok(json!({"Status": 200, "Body": "ok"})),
        };
        let envelope = Envelope::assemble(Uuid::new_v4(), ExecutorKind::Http, Utc::now(), run);
        let value: Value = serde_json::from_slice(&envelope.to_json()).unwrap();

        assert_eq!(value["ExecutorType"], "http");
        assert_eq!(value["Status"], "Success");
        assert_eq!(value["Attempts"][0]["Outcome"], "TransientFail");
        assert_eq!(value["Attempts"][1]["Attempt"], 2);
        assert_eq!(value["Attempts"][1]["DurationMs"], 12.0);
        assert_eq!(value["Result"]["Status"], 200);
        assert!(value.get("Error").is_none());
        assert!(envelope.end >= envelope.start);
    }

    #[test]
    fn test_failed_envelope_has_null_result() {
        let run: RetryRun<Value> = RetryRun {
            attempts: vec![record(1, Outcome::NonTransientFail)],
            result: Err(ExecutorFailure::new(FailureReason::MissingCredentials, "X-Auth-User")),
        };
        let envelope = Envelope::assemble(Uuid::new_v4(), ExecutorKind::Command, Utc::now(), run);
        let value: Value = serde_json::from_slice(&envelope.to_json()).unwrap();

        assert_eq!(value["ExecutorType"], "command");
        assert_eq!(value["Status"], "Fail");
        assert!(value["Result"].is_null());
        assert_eq!(value["Error"], "missing credentials: X-Auth-User");
    }

    #[test]
    fn test_minimal_envelope_is_valid_json() {
        let run: RetryRun<Value> = RetryRun {
            attempts: Vec::new(),
            result: Err(ExecutorFailure::new(FailureReason::Transport, "refused")),
        };
        let envelope = Envelope::assemble(Uuid::new_v4(), ExecutorKind::Http, Utc::now(), run);
        let value: Value = serde_json::from_slice(&envelope.minimal_json()).unwrap();
        assert_eq!(value["Status"], "Fail");
        assert_eq!(value["RequestId"], envelope.request_id.to_string());
    }
}
