//! Resilient single-endpoint dispatch gateway.

pub mod config;
pub mod dispatch;
pub mod executor;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;

pub use config::GatewayConfig;
pub use dispatch::{Envelope, Gateway};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
