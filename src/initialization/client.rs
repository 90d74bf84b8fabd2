//! HTTP client initialization.
//!
//! This module builds the client used to download MTA-STS policy files.

use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::{Config, USER_AGENT};

/// Initializes the HTTP client for MTA-STS policy fetches.
///
/// Creates a `reqwest::Client` configured with:
/// - Redirects disabled (RFC 8461 forbids following them)
/// - Timeout from the configuration
/// - Rustls TLS backend with the webpki roots
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_policy_client(config: &Config) -> Result<reqwest::Client, reqwest::Error> {
    ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(config.timeout_seconds))
        .connect_timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(USER_AGENT)
        .use_rustls_tls()
        .build()
}
