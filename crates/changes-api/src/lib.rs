//! REST fetch wrapper and pagination/query state for the Changes
//! dashboard client.
//!
//! This crate owns the HTTP side of the synchronizer:
//!
//! - [`ApiClient`] -- one `reqwest` client bound to the API base URL,
//!   classifying every response as success (2xx/304) or error
//! - [`FetchState`] -- the typed lifecycle of a view-facing remote
//!   value (idle, loading, loaded, errored)
//! - [`PagedQuery`] -- paginated, filterable list state with
//!   stale-while-refreshing semantics and newest-request-wins
//!   resolution of overlapping fetches
//! - [`link`] -- RFC 5988 `Link` header parsing into page targets
//! - typed endpoint helpers for the resource surface ([`endpoints`])
//!
//! Failures that views render are *state* ([`FetchState::Errored`]),
//! not propagated errors: a table keeps showing its last good page
//! through a failed refresh.

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod link;
pub mod paged;
pub mod state;

// Re-export primary types for convenience.
pub use client::{ApiClient, ApiPage};
pub use config::ApiConfig;
pub use error::ApiError;
pub use link::{PageLinks, PageRef, QueryParams, parse_link_header};
pub use paged::{CURSOR_PARAMS, PageView, PagedQuery};
pub use state::{FetchError, FetchState};
