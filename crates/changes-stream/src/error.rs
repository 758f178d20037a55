//! Error types for the event feed layer.
//!
//! Connection-level failures never propagate to subscribers: the
//! manager logs them and re-enters its backoff loop. [`StreamError`]
//! surfaces only from construction and from the internal connect path.

/// Errors that can occur in the event feed layer.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// The feed endpoint could not be reached.
    #[error("connect error: {0}")]
    Connect(String),

    /// The feed endpoint answered with a non-success status.
    #[error("feed returned status {0}")]
    BadStatus(u16),

    /// The connection failed while streaming.
    #[error("transport error: {0}")]
    Transport(String),
}
