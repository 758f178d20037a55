//! Ordered upsert container for incrementally-synchronized lists.
//!
//! A [`Collection`] is the client-side image of one server-side list:
//! builds of a project, jobs of a build, chunks of a log. The initial
//! page comes from a REST fetch; push events then upsert into it one
//! item at a time. Insertion order is significant, an optional
//! comparator keeps the list sorted through every mutation, and an
//! optional cap bounds memory for long-lived views.
//!
//! All operations are infallible local mutations. Observers watch a
//! revision counter instead of registering callbacks; every mutation
//! bumps it exactly once (a [`Collection::clear`] bumps once per
//! removed item, since it removes items one at a time).

use std::cmp::Ordering;

use changes_types::{Keyed, Merge};
use tokio::sync::watch;

/// Which end of the collection a new item enters at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertPosition {
    /// Prepend, for newest-first lists.
    Front,
    /// Append, for chronological lists.
    #[default]
    Back,
}

/// Per-instance behavior of a [`Collection`].
pub struct CollectionOptions<T> {
    limit: Option<usize>,
    comparator: Option<Box<dyn Fn(&T, &T) -> Ordering + Send + Sync>>,
    transform: Option<Box<dyn Fn(T) -> T + Send + Sync>>,
    equals: Option<Box<dyn Fn(&T, &T) -> bool + Send + Sync>>,
}

impl<T> Default for CollectionOptions<T> {
    fn default() -> Self {
        Self {
            limit: None,
            comparator: None,
            transform: None,
            equals: None,
        }
    }
}

impl<T> CollectionOptions<T> {
    /// Options with all defaults: unbounded, unsorted, key equality.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the collection at `limit` items.
    ///
    /// When an insert exceeds the cap, the items furthest from the
    /// inserted end fall off; a sorted collection drops from the back
    /// instead.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Keep the collection sorted by this comparator after every
    /// mutation.
    #[must_use]
    pub fn with_comparator(
        mut self,
        comparator: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        self.comparator = Some(Box::new(comparator));
        self
    }

    /// Apply a transform to every item entering through an insert.
    #[must_use]
    pub fn with_transform(mut self, transform: impl Fn(T) -> T + Send + Sync + 'static) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }

    /// Override the key-based equality used to match existing items.
    #[must_use]
    pub fn with_equality(
        mut self,
        equals: impl Fn(&T, &T) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.equals = Some(Box::new(equals));
        self
    }
}

impl<T> std::fmt::Debug for CollectionOptions<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionOptions")
            .field("limit", &self.limit)
            .field("sorted", &self.comparator.is_some())
            .finish_non_exhaustive()
    }
}

/// Ordered container with upsert-by-key, optional sort, and a size cap.
pub struct Collection<T> {
    items: Vec<T>,
    options: CollectionOptions<T>,
    revision: watch::Sender<u64>,
}

impl<T> Collection<T>
where
    T: Keyed + Merge,
{
    /// Create an empty collection.
    pub fn new(options: CollectionOptions<T>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            items: Vec::new(),
            options,
            revision,
        }
    }

    /// Create a collection from an initial page of items.
    ///
    /// The initial items pass through the transform, sort, and cap,
    /// but the revision stays at zero: loading the first page is not
    /// an update.
    pub fn with_items(items: Vec<T>, options: CollectionOptions<T>) -> Self {
        let mut collection = Self::new(options);
        for item in items {
            let item = collection.apply_transform(item);
            collection.items.push(item);
        }
        collection.restore_invariants(InsertPosition::Back);
        collection
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The items, in collection order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// The item at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// The first item, if any.
    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    /// Iterate over the items in collection order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// The current revision number. Starts at zero and increments on
    /// every mutation.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Observe the revision counter.
    pub fn revision_watch(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Append an item (newest-last).
    pub fn push(&mut self, item: T) {
        let item = self.apply_transform(item);
        self.items.push(item);
        self.restore_invariants(InsertPosition::Back);
        self.bump();
    }

    /// Prepend an item (newest-first).
    pub fn unshift(&mut self, item: T) {
        let item = self.apply_transform(item);
        self.items.insert(0, item);
        self.restore_invariants(InsertPosition::Front);
        self.bump();
    }

    /// Upsert: merge into the matching item, or append when absent.
    ///
    /// Returns `true` when an existing item was merged.
    pub fn update(&mut self, item: T) -> bool {
        self.update_with(item, true, InsertPosition::Back)
    }

    /// Upsert with explicit control over the miss path.
    ///
    /// When a matching item exists, the newer fields are merged into
    /// it in place and the order is re-derived. When none exists and
    /// `create_if_missing` is set, the item is inserted at `position`;
    /// otherwise the call is a no-op (no revision bump).
    pub fn update_with(
        &mut self,
        item: T,
        create_if_missing: bool,
        position: InsertPosition,
    ) -> bool {
        match self.position_of(&item) {
            Some(index) => {
                if let Some(existing) = self.items.get_mut(index) {
                    existing.merge(item);
                }
                self.restore_invariants(position);
                self.bump();
                true
            }
            None => {
                if create_if_missing {
                    match position {
                        InsertPosition::Front => self.unshift(item),
                        InsertPosition::Back => self.push(item),
                    }
                }
                false
            }
        }
    }

    /// Remove the first item equal to `item`. Returns the removed
    /// item, or `None` (without a revision bump) when nothing matched.
    pub fn pop_item(&mut self, item: &T) -> Option<T> {
        let index = self.position_of(item)?;
        let removed = self.items.remove(index);
        self.bump();
        Some(removed)
    }

    /// Remove all items, one at a time (one revision bump each).
    pub fn clear(&mut self) {
        while self.items.pop().is_some() {
            self.bump();
        }
    }

    /// Index of the first item equal to `item` under the configured
    /// equality.
    fn position_of(&self, item: &T) -> Option<usize> {
        match &self.options.equals {
            Some(equals) => self.items.iter().position(|existing| equals(existing, item)),
            None => {
                let key = item.key();
                self.items.iter().position(|existing| existing.key() == key)
            }
        }
    }

    fn apply_transform(&self, item: T) -> T {
        match &self.options.transform {
            Some(transform) => transform(item),
            None => item,
        }
    }

    /// Re-sort and re-cap after a mutation.
    fn restore_invariants(&mut self, inserted_at: InsertPosition) {
        if let Some(comparator) = &self.options.comparator {
            self.items.sort_by(|a, b| comparator(a, b));
        }
        if let Some(limit) = self.options.limit {
            if self.items.len() > limit {
                // Sorted collections keep the best-ranked prefix;
                // unsorted ones drop from the end opposite the insert.
                if self.options.comparator.is_some() || inserted_at == InsertPosition::Front {
                    self.items.truncate(limit);
                } else {
                    let excess = self.items.len().saturating_sub(limit);
                    self.items.drain(..excess);
                }
            }
        }
    }

    fn bump(&mut self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }
}

impl<T> std::fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("len", &self.items.len())
            .field("revision", &*self.revision.borrow())
            .field("options", &self.options)
            .finish()
    }
}
