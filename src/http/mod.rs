//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, routes, graceful shutdown, config reload)
//!     → request.rs (request ID generated at entry)
//!     → dispatch engine (validate → retry loop → envelope)
//!     → response.rs (envelope JSON or 400 {Error})
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
