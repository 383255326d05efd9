//! Outbound HTTP forward executor.
//!
//! # Responsibilities
//! - Compose the target URL from the sub-path (full URL verbatim, bare host → https)
//! - Mirror the inbound method and body
//! - Copy only allowlisted headers
//! - Classify non-success responses by status family
//!
//! # Design Decisions
//! - A fresh client per attempt; nothing pooled survives the attempt
//! - 5xx and transport errors are transient, other non-success statuses are not

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

use crate::dispatch::allowlist::Allowlists;
use crate::dispatch::fault::{ExecutorFailure, FailureReason};

/// Scheme used when the sub-path is a bare host.
pub const DEFAULT_SCHEME: &str = "https";

/// Build the outbound URL for a sub-path.
///
/// A sub-path that is already a URL is used verbatim; otherwise it is a host
/// (plus optional path) and the inbound query string is appended.
pub fn target_url(sub_path: &str, query: Option<&str>) -> Result<Url, ExecutorFailure> {
    let raw = if sub_path.starts_with("http://") || sub_path.starts_with("https://") {
        sub_path.to_string()
    } else {
        match query {
            Some(q) if !q.is_empty() => format!("{}://{}?{}", DEFAULT_SCHEME, sub_path, q),
            _ => format!("{}://{}", DEFAULT_SCHEME, sub_path),
        }
    };

    Url::parse(&raw).map_err(|e| {
        ExecutorFailure::new(FailureReason::InvalidTarget, format!("'{}': {}", raw, e))
    })
}

/// Everything needed to replay the inbound request on each attempt.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    method: Method,
    sub_path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpForwarder {
    pub fn new(
        method: Method,
        sub_path: impl Into<String>,
        query: Option<String>,
        headers: &HeaderMap,
        body: Bytes,
        allowlists: &Allowlists,
    ) -> Self {
        Self {
            method,
            sub_path: sub_path.into(),
            query,
            headers: allowlists.filter_headers(headers),
            body,
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// One attempt. Success yields `{Status, Body}`.
    pub async fn execute(&self) -> Result<Value, ExecutorFailure> {
        let url = target_url(&self.sub_path, self.query.as_deref())?;

        let client = Client::builder()
            .build()
            .map_err(|e| ExecutorFailure::new(FailureReason::Transport, e.to_string()))?;

        let mut request = client
            .request(self.method.clone(), url.clone())
            .headers(self.headers.clone());
        if !self.body.is_empty() {
            request = request.body(self.body.clone());
        }

        let response = request.send().await.map_err(|e| {
            let reason = if e.is_builder() {
                FailureReason::InvalidTarget
            } else {
                FailureReason::Transport
            };
            ExecutorFailure::new(reason, e.to_string())
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExecutorFailure::new(FailureReason::Transport, e.to_string()))?;

        if !status.is_success() {
            tracing::debug!(url = %url, status = %status, "Upstream returned non-success status");
            return Err(ExecutorFailure::new(
                FailureReason::UpstreamStatus(status.as_u16()),
                format!("{} {}", self.method, url),
            ));
        }

        Ok(json!({ "Status": status.as_u16(), "Body": body }))
    }
}
