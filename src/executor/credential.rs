//! Per-request credential extraction.

use std::fmt;
use axum::http::HeaderMap;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::dispatch::fault::{ExecutorFailure, FailureReason};

pub const AUTH_USER_HEADER: &str = "x-auth-user";
pub const AUTH_SECRET_HEADER: &str = "x-auth-pass";

/// Username/secret pair for one session. Zeroed on drop, redacted in `Debug`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    user: String,
    secret: String,
}

impl Credential {
    pub fn new(user: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            secret: secret.into(),
        }
    }

    /// Read both parts from the inbound headers. Missing or empty is non-transient.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ExecutorFailure> {
        let user = header_value(headers, AUTH_USER_HEADER)?;
        let secret = header_value(headers, AUTH_SECRET_HEADER)?;
        Ok(Self::new(user, secret))
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, ExecutorFailure> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ExecutorFailure::new(FailureReason::MissingCredentials, format!("{} header not set", name)))
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("user", &self.user)
            .field("secret", &"[redacted]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Auth-User", HeaderValue::from_static("admin@example.com"));
        headers.insert("X-Auth-Pass", HeaderValue::from_static("hunter2"));

        let credential = Credential::from_headers(&headers).unwrap();
        assert_eq!(credential.user(), "admin@example.com");
        assert_eq!(credential.secret(), "hunter2");
    }

    #[test]
    fn test_missing_or_empty_part() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Auth-User", HeaderValue::from_static("admin"));
        let err = Credential::from_headers(&headers).unwrap_err();
        assert_eq!(err.reason, FailureReason::MissingCredentials);

        headers.insert("X-Auth-Pass", HeaderValue::from_static(""));
        assert!(Credential::from_headers(&headers).is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", Credential::new("admin", "hunter2"));
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }
}
