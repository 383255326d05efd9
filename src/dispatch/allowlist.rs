//! Allowlist store.
//!
//! Built once per configuration snapshot and shared read-only by every
//! request dispatched against that snapshot.

use std::collections::HashSet;
use axum::http::HeaderMap;

use crate::config::GatewayConfig;

/// Permitted outbound headers and permitted remote commands.
#[derive(Debug, Clone, Default)]
pub struct Allowlists {
    /// Lowercased header names; header matching is case-insensitive.
    headers: HashSet<String>,
    /// Command names; matched exactly.
    commands: HashSet<String>,
}

impl Allowlists {
    pub fn new<H, C>(headers: H, commands: C) -> Self
    where
        H: IntoIterator,
        H::Item: AsRef<str>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|h| h.as_ref().to_ascii_lowercase())
                .collect(),
            commands: commands.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            &config.http.allowed_headers,
            config.command.allowed_commands.iter().cloned(),
        )
    }

    pub fn allows_header(&self, name: &str) -> bool {
        self.headers.contains(&name.to_ascii_lowercase())
    }

    pub fn allows_command(&self, name: &str) -> bool {
        self.commands.contains(name)
    }

    /// Copy only the allowlisted headers, keeping repeated values.
    pub fn filter_headers(&self, headers: &HeaderMap) -> HeaderMap {
        let mut filtered = HeaderMap::new();
        for (name, value) in headers {
            // HeaderName is already lowercase
            if self.headers.contains(name.as_str()) {
                filtered.append(name.clone(), value.clone());
            }
        }
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_header_matching_is_case_insensitive() {
        let lists = Allowlists::new(["Authorization", "Content-Type"], Vec::<String>::new());
        assert!(lists.allows_header("authorization"));
        assert!(lists.allows_header("CONTENT-TYPE"));
        assert!(!lists.allows_header("x-auth-pass"));
    }

    #[test]
    fn test_command_matching_is_exact() {
        let lists = Allowlists::new(Vec::<String>::new(), ["Get-Mailbox"]);
        assert!(lists.allows_command("Get-Mailbox"));
        assert!(!lists.allows_command("get-mailbox"));
        assert!(!lists.allows_command("Remove-Mailbox"));
    }

    #[test]
    fn test_filter_headers() {
        let lists = Allowlists::new(["Authorization"], Vec::<String>::new());
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc"));
        headers.insert("x-auth-user", HeaderValue::from_static("admin"));
        headers.insert("cookie", HeaderValue::from_static("session=1"));

        let filtered = lists.filter_headers(&headers);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered["authorization"], "Bearer abc");
    }
}
