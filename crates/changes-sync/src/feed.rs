//! Live reconciliation of a collection against the event feed.
//!
//! [`LiveCollection`] couples a [`Collection`] to one feed
//! [`Subscription`]: a background task decodes each pushed payload
//! into the collection's item type and applies it as an upsert. A
//! payload that fails to decode is logged and skipped; the feed must
//! never wedge on one bad frame. Dropping the handle aborts the task
//! and (through the subscription) releases the feed channels.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use changes_stream::Subscription;
use changes_types::{Keyed, Merge};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::collection::{Collection, InsertPosition};

/// A collection kept up to date by a feed subscription.
pub struct LiveCollection<T> {
    collection: Arc<Mutex<Collection<T>>>,
    task: tokio::task::JoinHandle<()>,
}

impl<T> LiveCollection<T>
where
    T: Keyed + Merge + DeserializeOwned + Send + 'static,
{
    /// Start applying the subscription's events to the collection.
    ///
    /// New items are inserted at `insert_at`; known items are merged
    /// in place. Grab a [`Collection::revision_watch`] receiver before
    /// calling this to observe updates.
    pub fn spawn(
        collection: Collection<T>,
        mut subscription: Subscription,
        insert_at: InsertPosition,
    ) -> Self {
        let collection = Arc::new(Mutex::new(collection));
        let task_collection = Arc::clone(&collection);

        let task = tokio::spawn(async move {
            while let Some(payload) = subscription.recv().await {
                match serde_json::from_value::<T>(payload) {
                    Ok(item) => {
                        let mut collection = lock(&task_collection);
                        let merged = collection.update_with(item, true, insert_at);
                        debug!(merged = merged, len = collection.len(), "applied feed event");
                    }
                    Err(e) => {
                        warn!(error = %e, "skipping undecodable feed payload");
                    }
                }
            }
            debug!("feed subscription closed");
        });

        Self { collection, task }
    }

    /// Read the collection under its lock.
    pub fn read<R>(&self, reader: impl FnOnce(&Collection<T>) -> R) -> R {
        reader(&lock(&self.collection))
    }

    /// Mutate the collection under its lock (e.g. to apply a fresh
    /// REST page alongside the live events).
    pub fn write<R>(&self, writer: impl FnOnce(&mut Collection<T>) -> R) -> R {
        writer(&mut lock(&self.collection))
    }
}

impl<T> Drop for LiveCollection<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl<T> std::fmt::Debug for LiveCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveCollection")
            .field("finished", &self.task.is_finished())
            .finish_non_exhaustive()
    }
}

fn lock<T>(collection: &Mutex<Collection<T>>) -> MutexGuard<'_, Collection<T>> {
    collection.lock().unwrap_or_else(PoisonError::into_inner)
}
