//! Configuration for the API client.
//!
//! Loaded from environment variables, with defaults suitable for a
//! local development server.

use std::time::Duration;

use crate::error::ApiError;

/// Default API base URL for local development.
const DEFAULT_BASE_URL: &str = "http://localhost:5000/api/0";

/// Default request timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// API client configuration.
///
/// Environment variables:
/// - `CHANGES_API_URL` -- base URL including the `/api/0` prefix
///   (default `http://localhost:5000/api/0`)
/// - `CHANGES_REQUEST_TIMEOUT_MS` -- per-request timeout (default 10000)
/// - `CHANGES_USER_AGENT` -- override the default user agent
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the REST API, including the version prefix.
    pub base_url: String,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            user_agent: concat!("changes-client/", env!("CARGO_PKG_VERSION")).to_owned(),
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl ApiConfig {
    /// Build a configuration pointing at the given base URL, with
    /// defaults for everything else.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] when a variable is present but
    /// unparsable.
    pub fn from_env() -> Result<Self, ApiError> {
        let mut config = Self::default();

        if let Ok(base_url) = std::env::var("CHANGES_API_URL") {
            config.base_url = base_url;
        }
        if let Ok(user_agent) = std::env::var("CHANGES_USER_AGENT") {
            config.user_agent = user_agent;
        }
        if let Ok(raw) = std::env::var("CHANGES_REQUEST_TIMEOUT_MS") {
            let millis: u64 = raw
                .parse()
                .map_err(|e| ApiError::Config(format!("invalid CHANGES_REQUEST_TIMEOUT_MS: {e}")))?;
            config.request_timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_server() {
        let config = ApiConfig::default();
        assert_eq!(config.base_url, "http://localhost:5000/api/0");
        assert_eq!(config.request_timeout, Duration::from_millis(10_000));
        assert!(config.user_agent.starts_with("changes-client/"));
    }

    #[test]
    fn with_base_url_overrides_only_the_url() {
        let config = ApiConfig::with_base_url("https://ci.example.com/api/0");
        assert_eq!(config.base_url, "https://ci.example.com/api/0");
        assert_eq!(
            config.request_timeout,
            ApiConfig::default().request_timeout
        );
    }
}
