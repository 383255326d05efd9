//! HTTP/JSON client for a remote command automation service.
//!
//! ```text
//! GET    {base}/capability                        → 2xx = available
//! POST   {base}/sessions  {"user","secret"}       → {"session": id} | 401/403
//! POST   {base}/sessions/{id}/commands/{name}     → [ {..}, .. ]
//! DELETE {base}/sessions/{id}
//! ```

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::dispatch::fault::FaultClass;
use crate::executor::backend::{BackendError, CommandBackend, CommandSession};
use crate::executor::convert::Parameters;
use crate::executor::credential::Credential;

#[derive(Debug, Clone)]
pub struct RemoteCommandBackend {
    base_url: String,
}

impl RemoteCommandBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// `base` with `segments` appended, each percent-encoded as one path segment.
fn endpoint(base: &str, segments: &[&str]) -> Result<Url, String> {
    let mut url = Url::parse(base).map_err(|e| format!("invalid backend URL '{}': {}", base, e))?;
    url.path_segments_mut()
        .map_err(|_| format!("backend URL '{}' cannot take a path", base))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[derive(Deserialize)]
struct SessionCreated {
    session: String,
}

#[async_trait]
impl CommandBackend for RemoteCommandBackend {
    async fn import_capability(&self) -> Result<(), BackendError> {
        let url = endpoint(&self.base_url, &["capability"]).map_err(BackendError::CapabilityUnavailable)?;
        let response = Client::new()
            .get(url)
            .send()
            .await
            .map_err(|e| BackendError::CapabilityUnavailable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(BackendError::CapabilityUnavailable(format!(
                "capability check returned {}",
                response.status()
            )))
        }
    }

    async fn connect(&self, credential: &Credential) -> Result<Box<dyn CommandSession>, BackendError> {
        // Session owns its client; both go away when the session is closed.
        let client = Client::new();
        let url = endpoint(&self.base_url, &["sessions"]).map_err(BackendError::SessionUnavailable)?;
        let response = client
            .post(url)
            .json(&json!({ "user": credential.user(), "secret": credential.secret() }))
            .send()
            .await
            .map_err(|e| BackendError::SessionUnavailable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BackendError::AuthRejected(format!("session refused with {}", status)));
        }
        if !status.is_success() {
            return Err(BackendError::SessionUnavailable(format!("session open returned {}", status)));
        }

        let created: SessionCreated = response
            .json()
            .await
            .map_err(|e| BackendError::SessionUnavailable(format!("malformed session reply: {}", e)))?;

        let url = endpoint(&self.base_url, &["sessions", &created.session])
            .map_err(BackendError::SessionUnavailable)?;
        tracing::debug!("Remote session opened");

        Ok(Box::new(RemoteSession { client, url }))
    }
}

struct RemoteSession {
    client: Client,
    url: Url,
}

#[async_trait]
impl CommandSession for RemoteSession {
    async fn invoke(&self, command: &str, parameters: &Parameters) -> Result<Vec<Value>, BackendError> {
        let invocation = |message: String, class: Option<FaultClass>| BackendError::Invocation { message, class };

        let mut url = self.url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.extend(["commands", command]);
        }
        let response = self
            .client
            .post(url)
            .json(parameters)
            .send()
            .await
            .map_err(|e| invocation(e.to_string(), None))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(invocation(
                format!("{} rejected with {}: {}", command, status, body),
                Some(FaultClass::NonTransient),
            ));
        }
        if !status.is_success() {
            return Err(invocation(format!("{} failed with {}", command, status), None));
        }

        match response.json::<Value>().await {
            Ok(Value::Array(objects)) => Ok(objects),
            Ok(single) => Ok(vec![single]),
            Err(e) => Err(invocation(format!("malformed result: {}", e), None)),
        }
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        let response = self
            .client
            .delete(self.url.clone())
            .send()
            .await
            .map_err(|e| BackendError::Teardown(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(BackendError::Teardown(format!("close returned {}", response.status())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_appends_to_base_path() {
        let url = endpoint("http://127.0.0.1:9400", &["capability"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9400/capability");

        let url = endpoint("http://automation.local/api", &["sessions"]).unwrap();
        assert_eq!(url.as_str(), "http://automation.local/api/sessions");
    }

    #[test]
    fn test_endpoint_encodes_each_segment() {
        let url = endpoint("http://automation.local", &["sessions", "a b/../c?d"]).unwrap();
        assert_eq!(url.path(), "/sessions/a%20b%2F..%2Fc%3Fd");
        assert!(url.query().is_none());
    }

    #[test]
    fn test_endpoint_rejects_unusable_base() {
        assert!(endpoint("not a url", &["capability"]).is_err());
        assert!(endpoint("mailto:ops@example.com", &["capability"]).is_err());
    }
}
