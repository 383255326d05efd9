//! Dispatch Gateway
//!
//! Receives a generic API request on `/api/{*path}`, routes it to an outbound
//! HTTP forwarder or a remote command executor, and wraps the call in a
//! bounded retry policy.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌───────────────────────────────────────────────────────┐
//!                       │                   DISPATCH GATEWAY                     │
//!                       │                                                        │
//!   Client Request      │  ┌─────────┐   ┌───────────┐   ┌───────────────────┐  │
//!   ────────────────────┼─▶│  http   │──▶│ validator │──▶│ executor selector │  │
//!                       │  │ server  │   │ body/path │   │  Http | Command   │  │
//!                       │  └─────────┘   └─────┬─────┘   └─────────┬─────────┘  │
//!                       │                      │ 400               ▼            │
//!                       │                      │         ┌───────────────────┐  │
//!                       │                      │         │    resilience     │  │      Upstream /
//!                       │                      │         │ retry · timeout · │◀─┼───▶ Command
//!                       │                      │         │ backoff · classify│  │      Service
//!                       │                      │         └─────────┬─────────┘  │
//!   Client Response     │                      ▼                   ▼            │
//!   ◀───────────────────┼──────────────── response ◀──────── envelope          │
//!                       │                                                        │
//!                       │  config (TOML + hot reload) · observability · lifecycle│
//!                       └───────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use dispatch_gateway::config::{load_config, watcher::ConfigWatcher, GatewayConfig};
use dispatch_gateway::lifecycle::{signals, Shutdown};
use dispatch_gateway::net::load_tls_config;
use dispatch_gateway::observability::{logging, metrics};
use dispatch_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "dispatch-gateway")]
#[command(about = "Resilient dispatch gateway for HTTP and remote command executors", long_about = None)]
struct Args {
    /// Path to a TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability)?;

    tracing::info!("dispatch-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_attempts = config.resilience.max_attempts,
        per_attempt_timeout_ms = config.resilience.per_attempt_timeout_ms,
        stub_mode = config.command.stub_mode,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Hot reload only when there is a file to watch
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let addr: SocketAddr = config.listener.bind_address.parse()?;
    let tls = config.listener.tls.clone();
    let server = HttpServer::new(config);

    match tls {
        Some(tls) => {
            let rustls = load_tls_config(&tls).await?;
            server
                .run_tls(addr, rustls, config_updates, shutdown.subscribe())
                .await?;
        }
        None => {
            let listener = TcpListener::bind(addr).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, config_updates, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
