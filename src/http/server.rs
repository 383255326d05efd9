//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the ping, metrics and dispatch routes
//! - Wire up middleware (tracing, body limit handled by the validator)
//! - Bind server to a plain or TLS listener
//! - Swap in reloaded configuration without interrupting in-flight requests
//! - Drain in-flight requests on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::Request,
    response::Response,
    routing::get,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use chrono::Utc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::dispatch::Gateway;
use crate::executor::CommandBackend;
use crate::http::request::RequestId;
use crate::http::response;
use crate::observability::metrics::{self, DispatchStats};

/// How long TLS connections get to finish after shutdown is signalled.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Current dispatch snapshot; each request loads it once.
    pub gateway: Arc<ArcSwap<Gateway>>,
    pub stats: Arc<DispatchStats>,
}

/// HTTP server for the dispatch gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
    /// Kept across reloads when the backend was injected.
    backend_override: Option<Arc<dyn CommandBackend>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        Self::build(Gateway::new(config), None)
    }

    /// Create a server whose command executor uses `backend`.
    pub fn with_backend(config: GatewayConfig, backend: Arc<dyn CommandBackend>) -> Self {
        Self::build(Gateway::with_backend(config, backend.clone()), Some(backend))
    }

    fn build(gateway: Gateway, backend_override: Option<Arc<dyn CommandBackend>>) -> Self {
        let state = AppState {
            gateway: Arc::new(ArcSwap::from_pointee(gateway)),
            stats: Arc::new(DispatchStats::new()),
        };
        let router = Self::build_router(state.clone());
        Self {
            router,
            state,
            backend_override,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/ping", get(ping))
            .route("/metrics", get(metrics_summary))
            .route(
                "/api/{*path}",
                get(dispatch_handler)
                    .post(dispatch_handler)
                    .put(dispatch_handler)
                    .patch(dispatch_handler)
                    .delete(dispatch_handler),
            )
            .layer(DefaultBodyLimit::disable())
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let reloader = self.spawn_reloader(config_updates);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS termination on `addr`.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        let reloader = self.spawn_reloader(config_updates);

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received, draining connections");
            drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        reloader.abort();
        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    fn spawn_reloader(
        &self,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
    ) -> tokio::task::JoinHandle<()> {
        let gateway = self.state.gateway.clone();
        let backend_override = self.backend_override.clone();

        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                let next = match &backend_override {
                    Some(backend) => Gateway::with_backend(config, backend.clone()),
                    None => Gateway::new(config),
                };
                gateway.store(Arc::new(next));
                tracing::info!("Configuration reloaded");
            }
        })
    }
}

/// Liveness check.
async fn ping() -> &'static str {
    "running"
}

/// Plain text counters summary.
async fn metrics_summary(State(state): State<AppState>) -> String {
    let max_attempts = state.gateway.load().config().resilience.max_attempts;
    state.stats.render(max_attempts)
}

/// Dispatch handler for `/api/{*path}`.
///
/// Validation failures short-circuit to `400`; everything else yields an envelope.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let started = Instant::now();
    let start = Utc::now();
    let request_id = RequestId::generate();
    let gateway = state.gateway.load_full();

    tracing::info!(
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        "Dispatch started"
    );

    let validated = match gateway.validate(request).await {
        Ok(validated) => validated,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Request rejected");
            state.stats.record_rejection();
            metrics::record_rejection(&e);
            return response::bad_request(&e);
        }
    };

    let envelope = gateway
        .dispatch(validated, request_id.as_uuid(), start)
        .await;

    state.stats.record_envelope(&envelope);
    metrics::record_request(envelope.executor_type, envelope.status, started);

    tracing::info!(
        request_id = %request_id,
        executor = %envelope.executor_type,
        status = envelope.status.as_str(),
        attempts = envelope.attempts.len(),
        "Dispatch finished"
    );

    response::envelope_response(&envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn server() -> HttpServer {
        let mut config = GatewayConfig::default();
        config.command.stub_mode = true;
        config.limits.max_body_size = 16;
        HttpServer::new(config)
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let response = server()
            .router()
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "running");
    }

    #[tokio::test]
    async fn test_body_too_large_skips_envelope() {
        let server = server();
        let response = server
            .router()
            .oneshot(
                Request::post("/api/command/Get-User")
                    .body(Body::from(vec![b'{'; 17]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, r#"{"Error":"Body too large"}"#);
        assert_eq!(server.state().stats.requests(), 0);
    }

    #[tokio::test]
    async fn test_stub_dispatch_sets_request_id_header() {
        let response = server()
            .router()
            .oneshot(Request::put("/api/command/Get-Mailbox").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let header = response.headers()["x-request-id"].to_str().unwrap().to_string();

        let envelope: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(envelope["RequestId"], header);
        assert_eq!(envelope["ExecutorType"], "command");
        assert_eq!(envelope["Status"], "Success");
    }

    #[tokio::test]
    async fn test_metrics_counts_requests() {
        let server = server();
        let router = server.router();
        router
            .clone()
            .oneshot(Request::get("/api/command/Get-User").body(Body::empty()).unwrap())
            .await
            .unwrap();
        router
            .clone()
            .oneshot(Request::get("/api/command/Format-Disk").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let text = body_string(response).await;
        assert!(text.starts_with("MaxAttempts: 3\nRequests: 1\nSuccess: 1\nFailed: 0\nRejected: 1"));
    }
}
