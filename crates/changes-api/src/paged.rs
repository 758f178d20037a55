//! Paginated, query-parameterized data with stale-while-refreshing
//! semantics.
//!
//! [`PagedQuery`] is the state cache behind every filterable table in
//! the dashboard. It couples a list endpoint to a query-parameter map
//! and keeps two snapshots: the last successful page (`current`) and
//! the page that was on screen when a refresh started (`previous`).
//! While a fetch is in flight -- and when a fetch fails -- the previous
//! page stays visible; the view dims it or overlays an error instead
//! of blanking. Only an instance that has never fetched successfully
//! reports not-loaded.
//!
//! Overlapping refreshes are resolved by a monotonic sequence number:
//! each fetch is tagged when issued, and a completion whose tag is no
//! longer the newest is discarded. The newest *issued* request wins
//! regardless of arrival order. Superseded requests are not cancelled;
//! their results are simply dropped on arrival.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::client::ApiClient;
use crate::link::{PageLinks, PageRef, QueryParams};
use crate::state::FetchError;

/// Query parameter names that address a position within a result set.
///
/// These are cleared before merging new filters when the caller asks
/// for a page reset, so changing a filter lands on the first page.
pub const CURSOR_PARAMS: [&str; 3] = ["page", "after", "before"];

/// One rendered page: items plus the query state and pagination links
/// they were fetched under.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView<T> {
    /// The fetched items.
    pub items: Vec<T>,
    /// The query parameters this page was fetched with.
    pub params: QueryParams,
    /// Pagination targets advertised by the response.
    pub links: PageLinks,
}

struct Inner<T> {
    initialized: bool,
    /// Target parameters: what the newest issued fetch asked for.
    params: QueryParams,
    /// Last successful page.
    current: Option<PageView<T>>,
    /// The page that was shown when the newest fetch was issued.
    previous: Option<PageView<T>>,
    /// Failure of the most recent completed fetch, if it failed.
    error: Option<FetchError>,
    in_flight: bool,
    /// Tag of the newest issued fetch.
    seq: u64,
}

/// A paginated list endpoint with cached query state.
pub struct PagedQuery<T> {
    client: ApiClient,
    path: String,
    inner: Mutex<Inner<T>>,
    params_tx: watch::Sender<QueryParams>,
}

impl<T> PagedQuery<T>
where
    T: DeserializeOwned + Clone,
{
    /// Create an uninitialized query over a list endpoint path.
    pub fn new(client: ApiClient, path: impl Into<String>) -> Self {
        let (params_tx, _) = watch::channel(QueryParams::new());
        Self {
            client,
            path: path.into(),
            inner: Mutex::new(Inner {
                initialized: false,
                params: QueryParams::new(),
                current: None,
                previous: None,
                error: None,
                in_flight: false,
                seq: 0,
            }),
            params_tx,
        }
    }

    /// The endpoint path this query fetches.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Observe the target query parameters.
    ///
    /// The receiver is updated whenever the parameters change; the
    /// embedding host mirrors them into whatever surface it owns
    /// (typically the window URL).
    pub fn params_watch(&self) -> watch::Receiver<QueryParams> {
        self.params_tx.subscribe()
    }

    /// Issue the first fetch with the given parameters.
    ///
    /// Idempotent: at most one initialization takes effect per
    /// instance; later calls return without fetching.
    pub async fn initialize(&self, initial_params: QueryParams) {
        let seq = {
            let mut inner = self.lock();
            if inner.initialized {
                debug!(path = self.path, "already initialized, skipping");
                return;
            }
            inner.initialized = true;
            inner.params = initial_params;
            self.params_tx.send_replace(inner.params.clone());
            Self::issue_locked(&mut inner)
        };
        self.run_fetch(seq).await;
    }

    /// Merge new parameters into the query state and refresh.
    ///
    /// When `reset_page` is set, cursor parameters ([`CURSOR_PARAMS`])
    /// are cleared before the merge so a changed filter starts from the
    /// first page. The page on screen at call time is kept visible
    /// until the refresh resolves.
    pub async fn update_with_params(&self, new_params: QueryParams, reset_page: bool) {
        let seq = {
            let mut inner = self.lock();
            inner.initialized = true;
            if reset_page {
                for cursor in CURSOR_PARAMS {
                    inner.params.remove(cursor);
                }
            }
            inner.params.extend(new_params);
            self.params_tx.send_replace(inner.params.clone());

            // Pin whatever is currently shown; it stays visible while
            // the refresh is in flight or if the refresh fails.
            let shown = Self::shown_locked(&inner).cloned();
            if shown.is_some() {
                inner.previous = shown;
            }
            Self::issue_locked(&mut inner)
        };
        self.run_fetch(seq).await;
    }

    /// Follow a pagination target from [`Self::pagination_links`].
    pub async fn follow(&self, target: PageRef) {
        self.update_with_params(target.params, false).await;
    }

    /// The page to render: the pinned previous page while a fetch is in
    /// flight or after a failed fetch, otherwise the latest page.
    /// `None` only when no fetch has ever succeeded.
    pub fn data_to_show(&self) -> Option<PageView<T>> {
        let inner = self.lock();
        Self::shown_locked(&inner).cloned()
    }

    /// The query parameters matching [`Self::data_to_show`].
    pub fn shown_params(&self) -> Option<QueryParams> {
        let inner = self.lock();
        Self::shown_locked(&inner).map(|view| view.params.clone())
    }

    /// The target query parameters (what the newest fetch asked for).
    pub fn target_params(&self) -> QueryParams {
        self.lock().params.clone()
    }

    /// Pagination targets for the page being shown.
    pub fn pagination_links(&self) -> PageLinks {
        let inner = self.lock();
        Self::shown_locked(&inner)
            .map(|view| view.links.clone())
            .unwrap_or_default()
    }

    /// No fetch has ever succeeded for this instance.
    pub fn has_not_loaded_initial_data(&self) -> bool {
        let inner = self.lock();
        inner.current.is_none() && inner.previous.is_none()
    }

    /// A refresh of previously-loaded data is in flight.
    pub fn is_loading_updated_data(&self) -> bool {
        let inner = self.lock();
        inner.in_flight && (inner.current.is_some() || inner.previous.is_some())
    }

    /// The most recent refresh of previously-loaded data failed.
    pub fn failed_to_load_updated_data(&self) -> bool {
        let inner = self.lock();
        !inner.in_flight
            && inner.error.is_some()
            && (inner.current.is_some() || inner.previous.is_some())
    }

    /// Failure of the most recent completed fetch, if it failed.
    pub fn last_error(&self) -> Option<FetchError> {
        self.lock().error.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// What is on screen right now, given the lock.
    fn shown_locked(inner: &Inner<T>) -> Option<&PageView<T>> {
        if inner.in_flight || inner.error.is_some() {
            inner.previous.as_ref()
        } else {
            inner.current.as_ref()
        }
    }

    /// Tag a new fetch as the newest issued one.
    fn issue_locked(inner: &mut Inner<T>) -> u64 {
        inner.seq = inner.seq.wrapping_add(1);
        inner.in_flight = true;
        inner.error = None;
        inner.seq
    }

    /// Execute the fetch tagged `seq` and apply its result unless a
    /// newer fetch has been issued since.
    async fn run_fetch(&self, seq: u64) {
        let params = {
            let inner = self.lock();
            if inner.seq != seq {
                return;
            }
            inner.params.clone()
        };

        let result = self.client.get_json::<Vec<T>>(&self.path, &params).await;

        let mut inner = self.lock();
        if inner.seq != seq {
            debug!(
                path = self.path,
                seq = seq,
                newest = inner.seq,
                "discarding superseded fetch result"
            );
            return;
        }
        inner.in_flight = false;
        match result {
            Ok(page) => {
                inner.current = Some(PageView {
                    items: page.data,
                    params,
                    links: page.links,
                });
                inner.previous = None;
                inner.error = None;
            }
            Err(err) => {
                warn!(path = self.path, error = %err, "fetch failed, keeping shown page");
                inner.error = Some(FetchError::from(&err));
            }
        }
    }
}

impl<T> std::fmt::Debug for PagedQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagedQuery")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
