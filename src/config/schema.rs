//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::resilience::ResiliencePolicy;

/// Root configuration for the dispatch gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Request admission limits.
    pub limits: LimitsConfig,

    /// Retry, backoff and per-attempt timeout settings.
    pub resilience: ResilienceConfig,

    /// HTTP forward executor settings.
    pub http: HttpExecutorConfig,

    /// Command executor settings.
    pub command: CommandExecutorConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Resilience configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Maximum number of attempts per request (including the first).
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Deadline for a single attempt in milliseconds.
    pub per_attempt_timeout_ms: u64,

    /// Upper bound (exclusive) of the random jitter added to each delay.
    pub jitter_ms: u64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            per_attempt_timeout_ms: 5000,
            jitter_ms: 500,
        }
    }
}

impl ResilienceConfig {
    /// Resolve the immutable policy used for one request.
    pub fn policy(&self) -> ResiliencePolicy {
        ResiliencePolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            per_attempt_timeout: Duration::from_millis(self.per_attempt_timeout_ms),
            jitter: Duration::from_millis(self.jitter_ms),
        }
    }
}

/// HTTP forward executor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpExecutorConfig {
    /// Inbound headers that may be copied onto the outbound request.
    pub allowed_headers: Vec<String>,
}

impl Default for HttpExecutorConfig {
    fn default() -> Self {
        Self {
            allowed_headers: vec!["Authorization".to_string(), "Content-Type".to_string()],
        }
    }
}

/// Command executor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CommandExecutorConfig {
    /// Commands that may be invoked on the remote backend.
    pub allowed_commands: Vec<String>,

    /// Sub-path prefix selecting the command executor.
    pub path_prefix: String,

    /// Return a fixed result without touching the backend.
    pub stub_mode: bool,

    /// Base URL of the remote command service.
    pub backend_url: String,

    /// Upper bound on a single session close, including closes that outlive their attempt.
    pub teardown_timeout_ms: u64,
}

impl Default for CommandExecutorConfig {
    fn default() -> Self {
        Self {
            allowed_commands: vec!["Get-Mailbox".to_string(), "Get-User".to_string()],
            path_prefix: "command/".to_string(),
            stub_mode: false,
            backend_url: "http://127.0.0.1:9400".to_string(),
            teardown_timeout_ms: 10_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [resilience]
            max_attempts = 5

            [command]
            stub_mode = true
            "#,
        )
        .unwrap();

        assert_eq!(config.resilience.max_attempts, 5);
        assert_eq!(config.resilience.base_delay_ms, 1000);
        assert!(config.command.stub_mode);
        assert_eq!(config.command.allowed_commands, vec!["Get-Mailbox", "Get-User"]);
        assert_eq!(config.limits.max_body_size, 1_048_576);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn test_policy_resolution() {
        let config = ResilienceConfig {
            max_attempts: 4,
            base_delay_ms: 250,
            per_attempt_timeout_ms: 2000,
            jitter_ms: 100,
        };
        let policy = config.policy();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
        assert_eq!(policy.per_attempt_timeout, Duration::from_secs(2));
        assert_eq!(policy.jitter, Duration::from_millis(100));
    }
}
