use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};

/// One attempt as reported by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttemptInfo {
    pub attempt: u32,
    pub outcome: String, // "Success", "TransientFail" or "NonTransientFail"
    pub duration_ms: f64,
}

/// The response envelope of a dispatched request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnvelopeInfo {
    pub request_id: String,
    pub executor_type: String,
    pub start: String,
    pub end: String,
    pub status: String,
    pub attempts: Vec<AttemptInfo>,
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl EnvelopeInfo {
    pub fn succeeded(&self) -> bool {
        self.status == "Success"
    }

    pub fn outcomes(&self) -> Vec<&str> {
        self.attempts.iter().map(|a| a.outcome.as_str()).collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    error: String,
}

/// What came back from the dispatch route.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// The request went through the retry loop.
    Envelope(EnvelopeInfo),
    /// The gateway refused the request before any attempt (`400`).
    Rejected { status: u16, error: String },
}

/// A request to send through `/api/{path}`.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl DispatchRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn credentials(self, user: &str, secret: &str) -> Self {
        self.header("X-Auth-User", user).header("X-Auth-Pass", secret)
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }
}

pub struct GatewayClient {
    client: Client,
    gateway_url: String,
}

impl GatewayClient {
    pub fn new(gateway_url: &str) -> Self {
        Self {
            client: Client::builder().no_proxy().build().unwrap_or_default(),
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn ping(&self) -> Result<String, reqwest::Error> {
        self.client
            .get(format!("{}/ping", self.gateway_url))
            .send()
            .await?
            .text()
            .await
    }

    pub async fn metrics(&self) -> Result<String, reqwest::Error> {
        self.client
            .get(format!("{}/metrics", self.gateway_url))
            .send()
            .await?
            .text()
            .await
    }

    /// Send a request through the dispatch route.
    pub async fn dispatch(&self, req: DispatchRequest) -> Result<DispatchOutcome, Box<dyn std::error::Error>> {
        let mut builder = self
            .client
            .request(req.method, format!("{}/api/{}", self.gateway_url, req.path));
        for (name, value) in req.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = req.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if status.is_success() {
            return Ok(DispatchOutcome::Envelope(serde_json::from_str(&text)?));
        }

        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => Ok(DispatchOutcome::Rejected {
                status: status.as_u16(),
                error: body.error,
            }),
            Err(_) => Err(format!("Gateway returned error status {}: {}", status, text).into()),
        }
    }
}
