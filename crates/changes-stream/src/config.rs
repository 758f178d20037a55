//! Configuration for the event feed connection.

use std::time::Duration;

use crate::error::StreamError;

/// Default feed URL for local development.
const DEFAULT_FEED_URL: &str = "http://localhost:5000/api/0/stream/";

/// Default initial reconnect delay in milliseconds.
const DEFAULT_BACKOFF_INITIAL_MS: u64 = 500;

/// Default reconnect delay ceiling in milliseconds.
const DEFAULT_BACKOFF_MAX_MS: u64 = 30_000;

/// Default jitter added to each reconnect delay, in milliseconds.
const DEFAULT_BACKOFF_JITTER_MS: u64 = 250;

/// Event feed configuration.
///
/// Environment variables:
/// - `CHANGES_STREAM_URL` -- feed endpoint
///   (default `http://localhost:5000/api/0/stream/`)
/// - `CHANGES_STREAM_BACKOFF_MS` -- initial reconnect delay
///   (default 500; doubles per failure up to the ceiling)
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Feed endpoint URL, without the channel query string.
    pub feed_url: String,
    /// Initial reconnect delay after a transport failure.
    pub backoff_initial: Duration,
    /// Reconnect delay ceiling.
    pub backoff_max: Duration,
    /// Upper bound of the random jitter added to each delay.
    pub backoff_jitter: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_owned(),
            backoff_initial: Duration::from_millis(DEFAULT_BACKOFF_INITIAL_MS),
            backoff_max: Duration::from_millis(DEFAULT_BACKOFF_MAX_MS),
            backoff_jitter: Duration::from_millis(DEFAULT_BACKOFF_JITTER_MS),
        }
    }
}

impl StreamConfig {
    /// Build a configuration pointing at the given feed URL, with
    /// defaults for everything else.
    pub fn with_feed_url(feed_url: impl Into<String>) -> Self {
        Self {
            feed_url: feed_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Config`] when a variable is present but
    /// unparsable.
    pub fn from_env() -> Result<Self, StreamError> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("CHANGES_STREAM_URL") {
            config.feed_url = url;
        }
        if let Ok(raw) = std::env::var("CHANGES_STREAM_BACKOFF_MS") {
            let millis: u64 = raw
                .parse()
                .map_err(|e| StreamError::Config(format!("invalid CHANGES_STREAM_BACKOFF_MS: {e}")))?;
            config.backoff_initial = Duration::from_millis(millis);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = StreamConfig::default();
        assert!(config.feed_url.ends_with("/stream/"));
        assert!(config.backoff_initial < config.backoff_max);
    }

    #[test]
    fn with_feed_url_keeps_backoff_defaults() {
        let config = StreamConfig::with_feed_url("http://127.0.0.1:9/feed");
        assert_eq!(config.feed_url, "http://127.0.0.1:9/feed");
        assert_eq!(
            config.backoff_initial,
            StreamConfig::default().backoff_initial
        );
    }
}
