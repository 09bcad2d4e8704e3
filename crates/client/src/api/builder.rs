//! Builder for constructing [`ApiFetcher`] instances.
//!
//! # Invariants
//! - `host`, `username` and `password` are required.
//! - The host string is normalized to a full base URL: a missing scheme
//!   becomes `https`, and the default API port is appended only when the
//!   host carries no explicit port.

use std::time::Duration;

use secrecy::SecretString;

use crate::api::ApiFetcher;
use crate::error::{ClientError, Result};
use clusterhc_config::constants::{DEFAULT_API_PORT, DEFAULT_TIMEOUT_SECS};

/// Builder for creating a new [`ApiFetcher`].
pub struct ApiFetcherBuilder {
    host: Option<String>,
    username: Option<String>,
    password: Option<SecretString>,
    timeout: Duration,
    skip_verify: bool,
}

impl Default for ApiFetcherBuilder {
    fn default() -> Self {
        Self {
            host: None,
            username: None,
            password: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            skip_verify: false,
        }
    }
}

impl ApiFetcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// API host: a bare hostname, `host:port`, or a full URL.
    pub fn host(mut self, host: String) -> Self {
        self.host = Some(host);
        self
    }

    pub fn username(mut self, username: String) -> Self {
        self.username = Some(username);
        self
    }

    pub fn password(mut self, password: SecretString) -> Self {
        self.password = Some(password);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Skip TLS certificate verification. Control planes commonly ship
    /// self-signed certificates; only enable this knowingly.
    pub fn skip_verify(mut self, skip: bool) -> Self {
        self.skip_verify = skip;
        self
    }

    pub fn build(self) -> Result<ApiFetcher> {
        let host = self
            .host
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| ClientError::InvalidConfig("API host is required".to_string()))?;
        let username = self
            .username
            .ok_or_else(|| ClientError::InvalidConfig("API username is required".to_string()))?;
        let password = self
            .password
            .ok_or_else(|| ClientError::InvalidConfig("API password is required".to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(self.skip_verify)
            .build()?;

        Ok(ApiFetcher::new(
            http,
            normalize_base_url(&host),
            username,
            password,
        ))
    }
}

/// Normalize a configured host into the base URL requests are built on.
///
/// `cluster.local` → `https://cluster.local:9443`,
/// `cluster.local:8443` → `https://cluster.local:8443`,
/// `http://127.0.0.1:18080/` → `http://127.0.0.1:18080`.
fn normalize_base_url(host: &str) -> String {
    let (scheme, rest) = match host.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("https", host),
    };
    let rest = rest.trim_end_matches('/');
    if rest.contains(':') {
        format!("{scheme}://{rest}")
    } else {
        format!("{scheme}://{rest}:{DEFAULT_API_PORT}")
    }
}
