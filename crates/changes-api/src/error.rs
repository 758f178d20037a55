//! Error types for the API layer.
//!
//! [`ApiError`] covers the plumbing failures a request can hit. Note
//! that views never see these as propagated errors: the paged-query
//! layer records them as [`FetchState`](crate::state::FetchState) so
//! stale data stays on screen while an error is displayed alongside.

/// Errors that can occur while talking to the Changes API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request could not be sent or the connection failed mid-flight.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    ///
    /// Success is 2xx or 304; everything else lands here with the raw
    /// status code and whatever body the server sent. No further 4xx/5xx
    /// taxonomy is imposed.
    #[error("server returned {status}: {body}")]
    Status {
        /// Raw HTTP status code.
        status: u16,
        /// Response body, for display in an inline error box.
        body: String,
    },

    /// The response body could not be decoded into the expected shape.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),
}

impl ApiError {
    /// The HTTP status code, when the failure carries one.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
