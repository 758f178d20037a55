//! Ordered upsert collections kept live against the Changes event
//! feed.
//!
//! This crate is the reconciliation core of the client:
//!
//! - [`Collection`] -- an ordered container with upsert-by-key, an
//!   optional comparator, an optional size cap, and a watchable
//!   revision counter
//! - [`LiveCollection`] -- glue that applies one feed subscription's
//!   JSON payloads to a collection as upserts
//!
//! A view seeds a collection from a REST page, hands it to
//! [`LiveCollection::spawn`] with a subscription from
//! [`StreamManager`](changes_stream::StreamManager), and re-renders on
//! every revision change.

pub mod collection;
pub mod feed;

// Re-export primary types for convenience.
pub use collection::{Collection, CollectionOptions, InsertPosition};
pub use feed::LiveCollection;
