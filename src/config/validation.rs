//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempts > 0, timeouts > 0, body ceiling > 0)
//! - Validate addresses and the command backend URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("invalid socket address for {field}: '{value}'")]
    Address { field: &'static str, value: String },

    #[error("invalid URL for {field}: '{value}'")]
    Url { field: &'static str, value: String },
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.resilience.max_attempts == 0 {
        errors.push(ValidationError::Zero { field: "resilience.max_attempts" });
    }
    if config.resilience.per_attempt_timeout_ms == 0 {
        errors.push(ValidationError::Zero { field: "resilience.per_attempt_timeout_ms" });
    }
    if config.command.teardown_timeout_ms == 0 {
        errors.push(ValidationError::Zero { field: "command.teardown_timeout_ms" });
    }
    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::Zero { field: "limits.max_body_size" });
    }
    if config.command.path_prefix.is_empty() {
        errors.push(ValidationError::Empty { field: "command.path_prefix" });
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Address {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::Address {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    let usable_base = url::Url::parse(&config.command.backend_url).is_ok_and(|u| !u.cannot_be_a_base());
    if !config.command.stub_mode && !usable_base {
        errors.push(ValidationError::Url {
            field: "command.backend_url",
            value: config.command.backend_url.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.resilience.max_attempts = 0;
        config.limits.max_body_size = 0;
        config.listener.bind_address = "not-an-address".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::Zero { field: "resilience.max_attempts" }));
        assert!(errors.contains(&ValidationError::Zero { field: "limits.max_body_size" }));
    }

    #[test]
    fn test_backend_url_ignored_in_stub_mode() {
        let mut config = GatewayConfig::default();
        config.command.backend_url = "::nope::".into();
        assert!(validate_config(&config).is_err());

        config.command.stub_mode = true;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_backend_url_must_take_path_segments() {
        let mut config = GatewayConfig::default();
        config.command.backend_url = "mailto:ops@example.com".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::Url { field: "command.backend_url", .. }));
    }

    #[test]
    fn test_zero_teardown_timeout_rejected() {
        let mut config = GatewayConfig::default();
        config.command.teardown_timeout_ms = 0;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::Zero { field: "command.teardown_timeout_ms" }]
        );
    }
}
