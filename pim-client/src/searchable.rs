//! Searchable collection
//!
//! A paginated, sorted and optionally filtered result set bound to one
//! service. The server is the source of truth for pagination: every
//! non-ids load overwrites the local counters with the response headers.
//!
//! Reloads are driven by an explicit parameter snapshot. [`Searchable::update`]
//! applies a batch of changes and reloads only if the watched parameters
//! (page, sort field, sort direction, ids, filters) differ from the last
//! snapshot. The free-text query and the page size never trigger a reload on
//! their own; callers use [`Searchable::delayed_load`] for typing.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use shared::{Filters, Pagination, SearchParameters, SortDirection};
use tokio_util::sync::CancellationToken;

use crate::abort::AbortSlot;
use crate::config::{ClientConfig, DEFAULT_PAGE_SIZE, DEFAULT_SEARCH_DEBOUNCE_MS};
use crate::error::LoadStatus;
use crate::notification::{MessageKey, NotificationSink};
use crate::service::ReadService;

/// Async callback without arguments (post-load hooks, reload hooks)
pub type LoadHook = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Default sort field
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

/// Query inputs and server-reported pagination of a collection
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    pub search_query: String,
    pub page: u32,
    /// Items per page (`-1` = unbounded)
    pub page_size: i32,
    pub total_pages: u32,
    pub total_count: u64,
    pub sort_field: String,
    pub sort_direction: SortDirection,
    /// Fixed id list; when set, pagination and search are ignored
    pub ids: Option<Vec<String>>,
    pub filters: Filters,
}

impl SearchState {
    fn new(page_size: i32) -> Self {
        Self {
            search_query: String::new(),
            page: 1,
            page_size,
            total_pages: 1,
            total_count: 0,
            sort_field: DEFAULT_SORT_FIELD.to_string(),
            sort_direction: SortDirection::Desc,
            ids: None,
            filters: Filters::new(),
        }
    }

    /// Request parameters for a paginated load
    pub fn to_params(&self) -> SearchParameters {
        SearchParameters {
            search_query: Some(self.search_query.clone()),
            page: Some(self.page),
            page_size: Some(self.page_size),
            order_by: Some(format!("{} {}", self.sort_field, self.sort_direction)),
            filters: self.filters.clone(),
        }
    }

    fn apply_pagination(&mut self, pagination: &Pagination) {
        self.page = pagination.page;
        self.total_pages = pagination.total_pages;
        self.page_size = pagination.page_size;
        self.total_count = pagination.total_count;
    }
}

/// Parameters whose change triggers a reload
#[derive(Debug, Clone, PartialEq)]
struct WatchedParams {
    page: u32,
    sort_field: String,
    sort_direction: SortDirection,
    ids: Option<Vec<String>>,
    filters: Filters,
}

impl From<&SearchState> for WatchedParams {
    fn from(state: &SearchState) -> Self {
        Self {
            page: state.page,
            sort_field: state.sort_field.clone(),
            sort_direction: state.sort_direction,
            ids: state.ids.clone(),
            filters: state.filters.clone(),
        }
    }
}

struct Inner {
    state: SearchState,
    watched: WatchedParams,
    is_loading: bool,
}

/// Builder for [`Searchable`]
pub struct SearchableBuilder<S: ReadService + ?Sized> {
    service: Arc<S>,
    notifications: Arc<dyn NotificationSink>,
    page_size: i32,
    ids: Option<Vec<String>>,
    filters: Filters,
    debounce: Duration,
    post_load: Option<LoadHook>,
}

impl<S: ReadService + ?Sized> SearchableBuilder<S> {
    /// Take page size and debounce period from the client configuration
    pub fn config(mut self, config: &ClientConfig) -> Self {
        self.page_size = config.default_page_size;
        self.debounce = config.search_debounce();
        self
    }

    /// Initial page size (`-1` = unbounded)
    pub fn page_size(mut self, page_size: i32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Fetch exactly these records instead of a page
    pub fn ids(mut self, ids: Vec<String>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    pub fn filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Awaited after every successful paginated load
    pub fn post_load(mut self, hook: LoadHook) -> Self {
        self.post_load = Some(hook);
        self
    }

    pub fn build(self) -> Searchable<S> {
        let mut state = SearchState::new(self.page_size);
        state.ids = self.ids;
        state.filters = self.filters;
        let watched = WatchedParams::from(&state);

        Searchable {
            service: self.service,
            notifications: self.notifications,
            inner: Mutex::new(Inner {
                state,
                watched,
                is_loading: false,
            }),
            records: RwLock::new(Vec::new()),
            requests: AbortSlot::new(),
            scheduled: Mutex::new(None),
            debounce: self.debounce,
            post_load: self.post_load,
        }
    }
}

/// Paginated collection bound to a service
pub struct Searchable<S: ReadService + ?Sized> {
    service: Arc<S>,
    notifications: Arc<dyn NotificationSink>,
    inner: Mutex<Inner>,
    records: RwLock<Vec<S::View>>,
    requests: AbortSlot,
    scheduled: Mutex<Option<CancellationToken>>,
    debounce: Duration,
    post_load: Option<LoadHook>,
}

impl<S: ReadService + ?Sized> Searchable<S> {
    pub fn builder(
        service: Arc<S>,
        notifications: Arc<dyn NotificationSink>,
    ) -> SearchableBuilder<S> {
        SearchableBuilder {
            service,
            notifications,
            page_size: DEFAULT_PAGE_SIZE,
            ids: None,
            filters: Filters::new(),
            debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
            post_load: None,
        }
    }

    // ========== Accessors ==========

    pub fn records(&self) -> Vec<S::View> {
        self.records.read().clone()
    }

    /// Read the records without cloning them
    pub fn with_records<R>(&self, f: impl FnOnce(&[S::View]) -> R) -> R {
        f(&self.records.read())
    }

    /// Edit loaded records in place (e.g. a value edited in a table cell)
    pub fn update_records(&self, f: impl FnOnce(&mut Vec<S::View>)) {
        f(&mut self.records.write());
    }

    pub fn state(&self) -> SearchState {
        self.inner.lock().state.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.lock().is_loading
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    // ========== Loading ==========

    /// Fetch one page, or exactly the configured ids.
    ///
    /// A load started while another is in flight cancels the older one; the
    /// cancelled load applies nothing and reports nothing.
    pub async fn load(&self) -> LoadStatus {
        let token = self.requests.start(());
        let (params, ids) = {
            let mut inner = self.inner.lock();
            inner.is_loading = true;
            (inner.state.to_params(), inner.state.ids.clone())
        };

        let result = match &ids {
            Some(ids) => token
                .run(
                    self.service
                        .get_multiple_by_ids(ids, None, token.signal()),
                )
                .await
                .map(|data| (data, None)),
            None => token
                .run(self.service.get_multiple(&params, token.signal()))
                .await
                .map(|page| (page.data, Some(page.pagination))),
        };

        let status = match result {
            Ok((data, pagination)) => {
                tracing::debug!(count = data.len(), "Records loaded");
                *self.records.write() = data;
                if let Some(pagination) = pagination {
                    let mut inner = self.inner.lock();
                    inner.state.apply_pagination(&pagination);
                    inner.watched = WatchedParams::from(&inner.state);
                }
                if ids.is_none()
                    && let Some(hook) = &self.post_load
                {
                    hook().await;
                }
                LoadStatus::Loaded
            }
            Err(e) if e.is_cancelled() => {
                tracing::debug!("Superseded load discarded");
                LoadStatus::Cancelled
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load records");
                self.notifications.error(MessageKey::DataNotLoaded);
                LoadStatus::NotLoaded
            }
        };

        if self.requests.clear(&(), &token) {
            self.inner.lock().is_loading = false;
        }
        status
    }

    /// Apply a batch of changes, reloading once if a watched parameter
    /// changed.
    ///
    /// Returns the load status when a reload ran.
    pub async fn update(&self, f: impl FnOnce(&mut SearchState)) -> Option<LoadStatus> {
        let changed = {
            let mut inner = self.inner.lock();
            f(&mut inner.state);
            let snapshot = WatchedParams::from(&inner.state);
            if snapshot == inner.watched {
                false
            } else {
                inner.watched = snapshot;
                true
            }
        };

        if changed {
            tracing::debug!("Search parameters changed, reloading");
            Some(self.load().await)
        } else {
            None
        }
    }

    pub async fn set_page(&self, page: u32) -> Option<LoadStatus> {
        self.update(|state| state.page = page.max(1)).await
    }

    pub async fn set_sort(
        &self,
        field: impl Into<String>,
        direction: SortDirection,
    ) -> Option<LoadStatus> {
        let field = field.into();
        self.update(|state| {
            state.sort_field = field;
            state.sort_direction = direction;
        })
        .await
    }

    pub async fn set_ids(&self, ids: Option<Vec<String>>) -> Option<LoadStatus> {
        self.update(|state| state.ids = ids).await
    }

    pub async fn set_filters(&self, filters: Filters) -> Option<LoadStatus> {
        self.update(|state| state.filters = filters).await
    }

    /// Change the free-text query without reloading
    pub fn set_search_query(&self, query: impl Into<String>) {
        self.inner.lock().state.search_query = query.into();
    }

    /// Drop a scheduled debounced load
    pub fn cancel_delayed_load(&self) {
        if let Some(token) = self.scheduled.lock().take() {
            token.cancel();
        }
    }
}

impl<S: ReadService + ?Sized + 'static> Searchable<S> {
    /// Schedule a single `load()` after the debounce period, replacing any
    /// load scheduled earlier.
    pub fn delayed_load(self: &Arc<Self>) {
        let token = CancellationToken::new();
        if let Some(previous) = self.scheduled.lock().replace(token.clone()) {
            previous.cancel();
        }

        let this = Arc::clone(self);
        let delay = self.debounce;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    this.load().await;
                }
            }
        });
    }
}
