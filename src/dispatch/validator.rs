//! Request validation and executor selection.
//!
//! # Responsibilities
//! - Enforce the body-size ceiling before any executor runs
//! - Buffer the body once so every attempt can reuse it
//! - Extract the logical sub-path after the `/api/` route prefix
//! - Select the executor kind from the command path prefix
//! - Reject commands outside the allowlist before the retry loop starts

use std::fmt;
use axum::body::{Body, Bytes};
use axum::http::{header, request::Parts, HeaderMap, Method};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dispatch::allowlist::Allowlists;

/// Fixed route prefix of the dispatch endpoint.
pub const API_PREFIX: &str = "/api/";

/// Which executor handles a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    Http,
    Command,
}

impl ExecutorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutorKind::Http => "http",
            ExecutorKind::Command => "command",
        }
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures surfaced as `400` without entering the retry loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Body too large")]
    BodyTooLarge,

    #[error("Invalid command")]
    InvalidCommand,
}

/// Where a validated request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchTarget {
    /// Forward to a URL or bare host.
    Http { sub_path: String },
    /// Run an allowlisted remote command.
    Command { name: String },
}

impl DispatchTarget {
    pub fn kind(&self) -> ExecutorKind {
        match self {
            DispatchTarget::Http { .. } => ExecutorKind::Http,
            DispatchTarget::Command { .. } => ExecutorKind::Command,
        }
    }
}

/// An inbound request that passed validation, with its body buffered.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub target: DispatchTarget,
    pub method: Method,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ValidatedRequest {
    pub fn kind(&self) -> ExecutorKind {
        self.target.kind()
    }
}

/// Portion of the path after the route prefix.
pub fn extract_sub_path(path: &str) -> &str {
    path.strip_prefix(API_PREFIX).unwrap_or("")
}

/// Pick the dispatch target for a sub-path.
///
/// Command names are percent-decoded; a name that does not decode to UTF-8
/// is kept raw and fails the allowlist.
pub fn select_target(sub_path: &str, command_prefix: &str) -> DispatchTarget {
    match sub_path.strip_prefix(command_prefix) {
        Some(rest) => {
            let raw = rest.trim_start_matches('/');
            let name = percent_decode_str(raw)
                .decode_utf8()
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| raw.to_string());
            DispatchTarget::Command { name }
        }
        None => DispatchTarget::Http {
            sub_path: sub_path.to_string(),
        },
    }
}

/// Read the whole body, rejecting anything over `max_body_size` bytes.
///
/// A declared `Content-Length` over the ceiling is rejected without reading.
pub async fn buffer_body(
    headers: &HeaderMap,
    body: Body,
    max_body_size: usize,
) -> Result<Bytes, ValidationError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > max_body_size as u64) {
        return Err(ValidationError::BodyTooLarge);
    }

    // A stream that runs past the limit fails here, whatever was declared.
    axum::body::to_bytes(body, max_body_size)
        .await
        .map_err(|_| ValidationError::BodyTooLarge)
}

/// Validate an inbound request and select its executor.
pub async fn validate(
    parts: Parts,
    body: Body,
    max_body_size: usize,
    command_prefix: &str,
    allowlists: &Allowlists,
) -> Result<ValidatedRequest, ValidationError> {
    let body = buffer_body(&parts.headers, body, max_body_size).await?;

    let target = select_target(extract_sub_path(parts.uri.path()), command_prefix);
    if let DispatchTarget::Command { name } = &target {
        if !allowlists.allows_command(name) {
            return Err(ValidationError::InvalidCommand);
        }
    }

    Ok(ValidatedRequest {
        target,
        method: parts.method,
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body,
    })
}
