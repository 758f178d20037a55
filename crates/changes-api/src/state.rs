//! Typed fetch state for view-facing async data.
//!
//! The dashboard renders every remote value through one of four states.
//! [`FetchState`] replaces the string-keyed "loading/loaded/error" bags
//! the older UI generation mutated by hand: each slot is a single typed
//! value and illegal combinations (loaded *and* errored) cannot be
//! represented.

use crate::error::ApiError;

/// Display-ready description of a failed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    /// Raw HTTP status code, when the failure carries one.
    pub status: Option<u16>,
    /// Human-readable message for an inline error box.
    pub message: String,
}

impl From<&ApiError> for FetchError {
    fn from(err: &ApiError) -> Self {
        Self {
            status: err.status(),
            message: err.to_string(),
        }
    }
}

/// The lifecycle of one remotely-fetched value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FetchState<T> {
    /// No fetch has been issued.
    #[default]
    Idle,
    /// A fetch is in flight and no result has arrived yet.
    Loading,
    /// The most recent fetch succeeded.
    Loaded(T),
    /// The most recent fetch failed.
    Errored(FetchError),
}

impl<T> FetchState<T> {
    /// Whether a fetch is currently in flight.
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Whether a value has been loaded.
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// The loaded value, if any.
    pub const fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }

    /// The fetch error, if the most recent fetch failed.
    pub const fn error(&self) -> Option<&FetchError> {
        match self {
            Self::Errored(err) => Some(err),
            _ => None,
        }
    }

    /// Build the terminal state for a completed fetch.
    pub fn from_result(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(value) => Self::Loaded(value),
            Err(err) => Self::Errored(FetchError::from(&err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_result_maps_both_arms() {
        let ok: FetchState<u32> = FetchState::from_result(Ok(7));
        assert_eq!(ok.loaded(), Some(&7));

        let err: FetchState<u32> = FetchState::from_result(Err(ApiError::Status {
            status: 503,
            body: String::from("maintenance"),
        }));
        let detail = err.error().cloned().unwrap_or_else(|| FetchError {
            status: None,
            message: String::new(),
        });
        assert_eq!(detail.status, Some(503));
        assert!(detail.message.contains("503"));
    }

    #[test]
    fn states_are_mutually_exclusive() {
        let state: FetchState<u32> = FetchState::Loading;
        assert!(state.is_loading());
        assert!(!state.is_loaded());
        assert!(state.loaded().is_none());
        assert!(state.error().is_none());
    }

    #[test]
    fn transport_errors_have_no_status() {
        let err = ApiError::Transport(String::from("connection refused"));
        let detail = FetchError::from(&err);
        assert_eq!(detail.status, None);
        assert!(detail.message.contains("connection refused"));
    }
}
