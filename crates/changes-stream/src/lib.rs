//! Push-channel multiplexer over the Changes server event feed.
//!
//! The server exposes one event feed endpoint; clients name the
//! channels they care about in the query string and receive named
//! JSON events (`build.update`, `job.update`, ...) for all of them on
//! a single connection. This crate owns that connection:
//!
//! - [`StreamManager`] -- shared connection manager; one feed
//!   connection, reopened whenever the active channel set changes
//! - [`Subscription`] -- a view's handle; dropping it unsubscribes
//! - [`sse`] -- incremental parser for the `text/event-stream` wire
//!   format
//!
//! Transport failures self-heal through an exponential-backoff
//! reconnect loop; subscribers just see a gap, never an error.

pub mod config;
pub mod error;
pub mod manager;
pub mod sse;

// Re-export primary types for convenience.
pub use config::StreamConfig;
pub use error::StreamError;
pub use manager::{ConnectionStatus, StreamManager, Subscription};
pub use sse::{SseEvent, SseParser};
