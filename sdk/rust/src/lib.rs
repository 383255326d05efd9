//! Typed client for the dispatch gateway.

pub mod client;

pub use client::{AttemptInfo, DispatchOutcome, DispatchRequest, EnvelopeInfo, GatewayClient};
