//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dispatch_gateway::config::GatewayConfig;
use dispatch_gateway::executor::{BackendError, CommandBackend, CommandSession, Credential, Parameters};
use dispatch_gateway::http::HttpServer;
use dispatch_gateway::lifecycle::Shutdown;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// A request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl SeenRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Start a mock backend on an ephemeral port; `f` maps each request to a status and body.
pub async fn start_mock_backend<F>(f: F) -> SocketAddr
where
    F: Fn(SeenRequest) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request);
                        let status_text = match status {
                            200 => "200 OK",
                            201 => "201 Created",
                            204 => "204 No Content",
                            400 => "400 Bad Request",
                            401 => "401 Unauthorized",
                            403 => "403 Forbidden",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Read the request head and a `Content-Length` body.
async fn read_request(socket: &mut TcpStream) -> Option<SeenRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(SeenRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    })
}

/// A backend answering every request with the same status and body, recording what it saw.
pub async fn start_recording_backend(
    status: u16,
    body: &'static str,
) -> (SocketAddr, Arc<Mutex<Vec<SeenRequest>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let addr = start_mock_backend(move |req| {
        log.lock().unwrap().push(req);
        (status, body.to_string())
    })
    .await;
    (addr, seen)
}

/// A remote command service speaking the session protocol.
///
/// Accepts `admin`/`hunter2`; any other credential gets `401`.
pub async fn start_command_service() -> (SocketAddr, Arc<Mutex<Vec<SeenRequest>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let addr = start_mock_backend(move |req| {
        log.lock().unwrap().push(req.clone());
        match (req.method.as_str(), req.path.as_str()) {
            ("GET", "/capability") => (200, "{}".into()),
            ("POST", "/sessions") => {
                let creds: Value = serde_json::from_str(&req.body).unwrap_or(Value::Null);
                if creds["user"] == "admin" && creds["secret"] == "hunter2" {
                    (200, r#"{"session":"s-1"}"#.into())
                } else {
                    (401, "{}".into())
                }
            }
            ("POST", "/sessions/s-1/commands/Get-Mailbox") => {
                let params: Value = serde_json::from_str(&req.body).unwrap_or(Value::Null);
                let identity = params["Identity"].as_str().unwrap_or("everyone").to_string();
                (
                    200,
                    serde_json::json!([{ "DisplayName": "Mailbox", "Identity": identity }]).to_string(),
                )
            }
            ("POST", p) if p.starts_with("/sessions/s-1/commands/") => (400, "unknown command".into()),
            ("DELETE", "/sessions/s-1") => (200, "{}".into()),
            _ => (404, "{}".into()),
        }
    })
    .await;
    (addr, seen)
}

/// Config for tests: fast backoff, ephemeral bind.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.resilience.base_delay_ms = 10;
    config.resilience.jitter_ms = 5;
    config.resilience.per_attempt_timeout_ms = 2000;
    config
}

/// A running gateway.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub updates: mpsc::UnboundedSender<GatewayConfig>,
}

impl TestGateway {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn spawn_gateway(config: GatewayConfig) -> TestGateway {
    start(HttpServer::new(config)).await
}

pub async fn spawn_gateway_with_backend(
    config: GatewayConfig,
    backend: Arc<dyn CommandBackend>,
) -> TestGateway {
    start(HttpServer::with_backend(config, backend)).await
}

async fn start(server: HttpServer) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let (updates, rx) = mpsc::unbounded_channel();

    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx, signal).await;
    });

    TestGateway {
        addr,
        shutdown,
        updates,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// In-process command backend whose capability check always succeeds.
#[derive(Default)]
pub struct AcceptingBackend {
    pub connects: Mutex<u32>,
}

#[async_trait]
impl CommandBackend for AcceptingBackend {
    async fn import_capability(&self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn connect(&self, _credential: &Credential) -> Result<Box<dyn CommandSession>, BackendError> {
        *self.connects.lock().unwrap() += 1;
        Ok(Box::new(EchoSession))
    }
}

struct EchoSession;

#[async_trait]
impl CommandSession for EchoSession {
    async fn invoke(&self, command: &str, parameters: &Parameters) -> Result<Vec<Value>, BackendError> {
        Ok(vec![serde_json::json!({
            "Command": command,
            "ParameterCount": parameters.len(),
        })])
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        Ok(())
    }
}
