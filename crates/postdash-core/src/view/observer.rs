//! Per-view subscription to one cache key at a time.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use crate::query::{CacheEvent, QueryCache, QueryError, QueryKey, QueryResult};

/// Boxed future returned by a [`Loader`].
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Produces the value for the key an observer is watching.
pub type Loader<T> = Arc<dyn Fn() -> BoxFuture<QueryResult<T>> + Send + Sync>;

/// Wraps an async closure as a [`Loader`].
pub fn loader<T, F, Fut>(load: F) -> Loader<T>
where
    T: 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = QueryResult<T>> + Send + 'static,
{
    Arc::new(move || -> BoxFuture<QueryResult<T>> { Box::pin(load()) })
}

/// What a view renders: data, loading flag and error.
#[derive(Debug)]
pub struct ViewState<T> {
    /// Latest data. While `placeholder` is set this belongs to the previous
    /// key.
    pub data: Option<Arc<T>>,
    /// A request for the current key is running.
    pub loading: bool,
    /// Error of the last request for the current key.
    pub error: Option<QueryError>,
    /// `data` is kept from the previous key while the new one loads.
    pub placeholder: bool,
}

impl<T> ViewState<T> {
    /// Returns true while there is nothing to show yet.
    #[must_use]
    pub const fn is_initial_loading(&self) -> bool {
        self.loading && self.data.is_none()
    }
}

impl<T> Clone for ViewState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            loading: self.loading,
            error: self.error.clone(),
            placeholder: self.placeholder,
        }
    }
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            placeholder: false,
        }
    }
}

/// Tracks one cache key on behalf of a view.
///
/// Switching keys starts a request for the new key; responses for any other
/// key are dropped when they arrive. An invalidation covering the current key
/// triggers a refetch. Dropping the observer stops it from applying anything.
pub struct QueryObserver<T> {
    cache: QueryCache,
    events: broadcast::Receiver<CacheEvent>,
    results_tx: mpsc::UnboundedSender<(QueryKey, QueryResult<T>)>,
    results_rx: mpsc::UnboundedReceiver<(QueryKey, QueryResult<T>)>,
    key: Option<QueryKey>,
    loader: Option<Loader<T>>,
    keep_previous: bool,
    state: ViewState<T>,
}

impl<T> fmt::Debug for QueryObserver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryObserver")
            .field("key", &self.key)
            .field("loading", &self.state.loading)
            .field("keep_previous", &self.keep_previous)
            .finish_non_exhaustive()
    }
}

impl<T: Send + Sync + 'static> QueryObserver<T> {
    /// Creates an observer that clears its data when the key changes.
    #[must_use]
    pub fn new(cache: QueryCache) -> Self {
        let events = cache.subscribe();
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            cache,
            events,
            results_tx,
            results_rx,
            key: None,
            loader: None,
            keep_previous: false,
            state: ViewState::default(),
        }
    }

    /// Keeps the previous key's data on screen while a new key loads.
    #[must_use]
    pub const fn keep_previous_data(mut self) -> Self {
        self.keep_previous = true;
        self
    }

    /// Current view state.
    #[must_use]
    pub const fn state(&self) -> &ViewState<T> {
        &self.state
    }

    /// Key being observed.
    #[must_use]
    pub const fn key(&self) -> Option<&QueryKey> {
        self.key.as_ref()
    }

    /// Switches to `key`, loading it with `loader`.
    ///
    /// Cached data for the key, fresh or stale, is shown at once while the
    /// request runs. Observing the current key again does nothing.
    pub fn observe(&mut self, key: QueryKey, loader: Loader<T>) {
        if self.key.as_ref() == Some(&key) {
            return;
        }
        debug!(%key, "Observing");

        match self.cache.peek::<T>(&key) {
            Some(cached) => {
                self.state.data = Some(cached);
                self.state.placeholder = false;
            }
            None if self.keep_previous && self.state.data.is_some() => {
                self.state.placeholder = true;
            }
            None => {
                self.state.data = None;
                self.state.placeholder = false;
            }
        }
        self.state.error = None;
        self.key = Some(key);
        self.loader = Some(loader);
        self.refetch();
    }

    /// Requests the current key again.
    pub fn refetch(&mut self) {
        let (Some(key), Some(loader)) = (self.key.clone(), self.loader.clone()) else {
            return;
        };
        self.state.loading = true;
        let tx = self.results_tx.clone();
        tokio::spawn(async move {
            let result = loader().await;
            // The observer may be gone; its result is then discarded.
            let _ = tx.send((key, result));
        });
    }

    /// Waits until the view state changes.
    pub async fn changed(&mut self) {
        loop {
            tokio::select! {
                Some((key, result)) = self.results_rx.recv() => {
                    if self.key.as_ref() == Some(&key) {
                        self.apply(result);
                        return;
                    }
                    debug!(%key, "Dropping response for a key no longer observed");
                }
                event = self.events.recv() => {
                    if self.on_event(event) {
                        return;
                    }
                }
            }
        }
    }

    fn apply(&mut self, result: QueryResult<T>) {
        self.state.loading = false;
        match result {
            Ok(data) => {
                self.state.data = Some(data);
                self.state.error = None;
                self.state.placeholder = false;
            }
            Err(e) => self.state.error = Some(e),
        }
    }

    fn on_event(&mut self, event: Result<CacheEvent, RecvError>) -> bool {
        let Some(key) = self.key.clone() else {
            return false;
        };
        match event {
            Ok(CacheEvent::Invalidated(prefix)) if key.starts_with(&prefix) => {
                debug!(%key, "Refetching after invalidation");
                self.refetch();
                true
            }
            Ok(CacheEvent::Updated(updated)) if updated == key && !self.state.loading => {
                match self.cache.peek::<T>(&key) {
                    Some(data) => {
                        self.state.data = Some(data);
                        self.state.error = None;
                        self.state.placeholder = false;
                        true
                    }
                    None => false,
                }
            }
            Ok(CacheEvent::Cleared) => {
                self.state.data = None;
                self.state.placeholder = false;
                true
            }
            Ok(_) => false,
            Err(RecvError::Lagged(skipped)) => {
                debug!(%key, skipped, "Missed cache events, refetching");
                self.refetch();
                true
            }
            // The observer holds a cache handle, so the sender outlives it.
            Err(RecvError::Closed) => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use postdash_api::ServerId;

    use super::*;
    use crate::query::RetryPolicy;

    fn counting_loader(cache: &QueryCache, key: QueryKey, value: u32, delay_ms: u64, calls: &Arc<AtomicUsize>) -> Loader<u32> {
        let cache = cache.clone();
        let calls = Arc::clone(calls);
        Arc::new(move || -> BoxFuture<QueryResult<u32>> {
            let (cache, key, calls) = (cache.clone(), key.clone(), Arc::clone(&calls));
            Box::pin(async move {
                cache
                    .fetch(key, RetryPolicy::NONE, move || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async move {
                            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                            Ok(value)
                        }
                    })
                    .await
            })
        })
    }

    fn server_key(id: &str) -> QueryKey {
        QueryKey::server(&ServerId::new(id))
    }

    #[tokio::test(start_paused = true)]
    async fn test_loads_and_settles() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut observer = QueryObserver::new(cache.clone());

        observer.observe(server_key("1"), counting_loader(&cache, server_key("1"), 7, 10, &calls));
        assert!(observer.state().is_initial_loading());

        observer.changed().await;
        assert!(!observer.state().loading);
        assert_eq!(*observer.state().data.clone().unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_for_old_key_is_dropped() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut observer = QueryObserver::new(cache.clone());

        observer.observe(server_key("1"), counting_loader(&cache, server_key("1"), 1, 500, &calls));
        observer.observe(server_key("2"), counting_loader(&cache, server_key("2"), 2, 10, &calls));

        observer.changed().await;
        assert_eq!(*observer.state().data.clone().unwrap(), 2);

        tokio::time::advance(Duration::from_secs(1)).await;
        let applied = tokio::time::timeout(Duration::from_millis(50), observer.changed()).await;
        assert!(applied.is_err());
        assert_eq!(*observer.state().data.clone().unwrap(), 2);
        // The abandoned request still populated the cache.
        assert_eq!(*cache.peek::<u32>(&server_key("1")).unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_previous_data_marks_placeholder() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut observer = QueryObserver::new(cache.clone()).keep_previous_data();

        observer.observe(server_key("1"), counting_loader(&cache, server_key("1"), 1, 10, &calls));
        observer.changed().await;

        observer.observe(server_key("2"), counting_loader(&cache, server_key("2"), 2, 10, &calls));
        assert!(observer.state().placeholder);
        assert!(observer.state().loading);
        assert_eq!(*observer.state().data.clone().unwrap(), 1);

        observer.changed().await;
        assert!(!observer.state().placeholder);
        assert_eq!(*observer.state().data.clone().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_keep_previous_data_clears() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut observer = QueryObserver::new(cache.clone());

        observer.observe(server_key("1"), counting_loader(&cache, server_key("1"), 1, 10, &calls));
        observer.changed().await;
        observer.observe(server_key("2"), counting_loader(&cache, server_key("2"), 2, 10, &calls));
        assert!(observer.state().data.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidation_triggers_refetch() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut observer = QueryObserver::new(cache.clone());

        observer.observe(server_key("1"), counting_loader(&cache, server_key("1"), 1, 10, &calls));
        observer.changed().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.invalidate(&QueryKey::servers());
        observer.changed().await;
        assert!(observer.state().loading);
        assert!(observer.state().data.is_some());

        observer.changed().await;
        assert!(!observer.state().loading);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrelated_invalidation_is_ignored() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut observer = QueryObserver::new(cache.clone());

        observer.observe(server_key("1"), counting_loader(&cache, server_key("1"), 1, 10, &calls));
        observer.changed().await;

        cache.invalidate(&QueryKey::current_user());
        let changed = tokio::time::timeout(Duration::from_millis(50), observer.changed()).await;
        assert!(changed.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_value_shows_immediately() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        cache
            .fetch(server_key("1"), RetryPolicy::NONE, || async { Ok(9_u32) })
            .await
            .unwrap();

        let mut observer = QueryObserver::new(cache.clone());
        observer.observe(server_key("1"), counting_loader(&cache, server_key("1"), 1, 10, &calls));
        assert_eq!(*observer.state().data.clone().unwrap(), 9);
        assert!(!observer.state().is_initial_loading());

        observer.changed().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
