//! Keyed response cache.
//!
//! Each key holds at most one value and at most one request in flight.
//! Concurrent reads of the same key share that request. Values stay
//! fresh for [`CacheConfig::stale_time`] unless invalidated; a stale value is
//! still returned by [`QueryCache::peek`] so views can render it while a
//! refetch runs.
//!
//! Requests run on detached tasks. A caller that stops awaiting does not
//! cancel the request, it only stops observing the result.
//!
//! Entries nobody has read for [`CacheConfig::gc_time`] are dropped the next
//! time the cache is touched, so visiting many pages or searches does not
//! grow the cache without bound.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::QueryKey;

/// Error shared by every reader of a failed request.
pub type QueryError = Arc<postdash_api::Error>;

/// Result of a cached read.
pub type QueryResult<T> = Result<Arc<T>, QueryError>;

type Value = Arc<dyn Any + Send + Sync>;
type Outcome = Result<Value, QueryError>;

const EVENT_CAPACITY: usize = 64;

/// Change notification published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// A request for this key completed and stored a new value.
    Updated(QueryKey),
    /// Every key starting with this prefix was marked stale.
    Invalidated(QueryKey),
    /// Every entry was dropped.
    Cleared,
}

/// How failed requests are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first failure.
    pub max_retries: u32,
    /// Delay before the first retry; the n-th retry waits n times this.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Never retry.
    pub const NONE: Self = Self {
        max_retries: 0,
        backoff: Duration::ZERO,
    };

    /// Creates a policy.
    #[must_use]
    pub const fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Returns true if a request that has failed `failures` times should run
    /// again. Only transient errors are retried.
    #[must_use]
    pub const fn should_retry(&self, failures: u32, error: &postdash_api::Error) -> bool {
        failures <= self.max_retries && error.is_transient()
    }

    /// Delay before the next attempt.
    #[must_use]
    pub fn delay(&self, failures: u32) -> Duration {
        self.backoff.saturating_mul(failures)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_secs(1))
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long a stored value is served without refetching.
    pub stale_time: Duration,
    /// How long an entry nobody reads is kept before it is dropped.
    pub gc_time: Duration,
    /// Retry policy for reads that allow retries.
    pub retry: RetryPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(30),
            gc_time: Duration::from_secs(300),
            retry: RetryPolicy::default(),
        }
    }
}

struct InFlight {
    ticket: u64,
    receiver: watch::Receiver<Option<Outcome>>,
    superseded: bool,
}

#[derive(Default)]
struct Entry {
    value: Option<Value>,
    updated_at: Option<Instant>,
    last_used: Option<Instant>,
    invalidated: bool,
    error: Option<QueryError>,
    in_flight: Option<InFlight>,
}

impl Entry {
    fn fresh_value(&self, stale_time: Duration) -> Option<Value> {
        if self.invalidated {
            return None;
        }
        let updated_at = self.updated_at?;
        if updated_at.elapsed() < stale_time {
            self.value.clone()
        } else {
            None
        }
    }

    /// In-flight entries are never idle.
    fn is_idle(&self, gc_time: Duration) -> bool {
        self.in_flight.is_none() && self.last_used.is_none_or(|at| at.elapsed() >= gc_time)
    }
}

#[derive(Default)]
struct State {
    entries: HashMap<QueryKey, Entry>,
    next_ticket: u64,
}

impl State {
    fn evict_idle(&mut self, gc_time: Duration) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_idle(gc_time));
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!(evicted, "Evicted idle cache entries");
        }
        evicted
    }
}

struct Inner {
    state: Mutex<State>,
    events: broadcast::Sender<CacheEvent>,
    config: CacheConfig,
}

enum Action {
    Join(watch::Receiver<Option<Outcome>>),
    WaitSuperseded(watch::Receiver<Option<Outcome>>),
    Spawn {
        ticket: u64,
        sender: watch::Sender<Option<Outcome>>,
        receiver: watch::Receiver<Option<Outcome>>,
    },
}

/// Shared response cache. Cloning is cheap and every clone sees the same
/// entries.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl QueryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                events,
                config,
            }),
        }
    }

    /// Cache configuration.
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Subscribes to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    /// Returns the value for `key`, running `fetcher` only when no fresh
    /// value is stored and no request is already in flight.
    ///
    /// If the in-flight request was started before an invalidation of its
    /// key, this waits for it to finish and then issues a new one, so the
    /// result always postdates the invalidation.
    ///
    /// # Errors
    ///
    /// Returns the shared error of the request this call observed.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, retry: RetryPolicy, fetcher: F) -> QueryResult<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = postdash_api::Result<T>> + Send + 'static,
    {
        let (receiver, spawn) = loop {
            let action = {
                let mut guard = self.lock();
                let state = &mut *guard;
                state.evict_idle(self.inner.config.gc_time);
                let ticket = state.next_ticket;
                state.next_ticket += 1;
                let entry = state.entries.entry(key.clone()).or_default();
                entry.last_used = Some(Instant::now());

                if let Some(value) = entry.fresh_value(self.inner.config.stale_time) {
                    debug!(%key, "Cache hit");
                    return downcast(value);
                }

                match &entry.in_flight {
                    Some(flight) if flight.superseded => Action::WaitSuperseded(flight.receiver.clone()),
                    Some(flight) => Action::Join(flight.receiver.clone()),
                    None => {
                        let (sender, receiver) = watch::channel(None);
                        entry.in_flight = Some(InFlight {
                            ticket,
                            receiver: receiver.clone(),
                            superseded: false,
                        });
                        Action::Spawn {
                            ticket,
                            sender,
                            receiver,
                        }
                    }
                }
            };

            match action {
                Action::Join(receiver) => {
                    debug!(%key, "Joining in-flight request");
                    break (receiver, None);
                }
                Action::WaitSuperseded(receiver) => {
                    debug!(%key, "Waiting for superseded request");
                    wait(receiver).await.ok();
                }
                Action::Spawn {
                    ticket,
                    sender,
                    receiver,
                } => break (receiver, Some((ticket, sender))),
            }
        };

        if let Some((ticket, sender)) = spawn {
            self.spawn_fetch(key, ticket, retry, fetcher, sender);
        }
        downcast(wait(receiver).await?)
    }

    fn spawn_fetch<T, F, Fut>(
        &self,
        key: QueryKey,
        ticket: u64,
        retry: RetryPolicy,
        fetcher: F,
        sender: watch::Sender<Option<Outcome>>,
    ) where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = postdash_api::Result<T>> + Send + 'static,
    {
        debug!(%key, "Fetching");
        let cache = self.clone();
        tokio::spawn(async move {
            let mut failures = 0;
            let result = loop {
                match fetcher().await {
                    Ok(value) => break Ok(value),
                    Err(e) => {
                        failures += 1;
                        if !retry.should_retry(failures, &e) {
                            break Err(e);
                        }
                        let delay = retry.delay(failures);
                        warn!(%key, attempt = failures, "Request failed, retrying in {delay:?}: {e}");
                        tokio::time::sleep(delay).await;
                    }
                }
            };

            let outcome: Outcome = match result {
                Ok(value) => Ok(Arc::new(value)),
                Err(e) => Err(Arc::new(e)),
            };
            cache.complete(&key, ticket, &outcome);
            sender.send_replace(Some(outcome));
        });
    }

    fn complete(&self, key: &QueryKey, ticket: u64, outcome: &Outcome) {
        let mut state = self.lock();
        let Some(entry) = state.entries.get_mut(key) else {
            debug!(%key, "Discarding response for cleared entry");
            return;
        };
        let Some(flight) = entry.in_flight.take_if(|flight| flight.ticket == ticket) else {
            debug!(%key, "Discarding response for replaced request");
            return;
        };

        match outcome {
            Ok(value) => {
                let now = Instant::now();
                entry.value = Some(Arc::clone(value));
                entry.updated_at = Some(now);
                entry.last_used = Some(now);
                entry.invalidated = flight.superseded;
                entry.error = None;
                drop(state);
                self.emit(CacheEvent::Updated(key.clone()));
            }
            Err(e) => {
                warn!(%key, "Request failed: {e}");
                entry.error = Some(Arc::clone(e));
                entry.invalidated |= flight.superseded;
            }
        }
    }

    /// Returns the stored value for `key`, fresh or stale, without fetching.
    #[must_use]
    pub fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let mut state = self.lock();
        let entry = state.entries.get_mut(key)?;
        entry.last_used = Some(Instant::now());
        let value = entry.value.clone()?;
        drop(state);
        value.downcast().ok()
    }

    /// Returns true if `key` holds a value that would be served without a
    /// request.
    #[must_use]
    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        self.lock()
            .entries
            .get(key)
            .and_then(|entry| entry.fresh_value(self.inner.config.stale_time))
            .is_some()
    }

    /// Returns true if a request for `key` is in flight.
    #[must_use]
    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.lock()
            .entries
            .get(key)
            .is_some_and(|entry| entry.in_flight.is_some())
    }

    /// Error of the most recent failed request for `key`, cleared by the
    /// next success.
    #[must_use]
    pub fn last_error(&self, key: &QueryKey) -> Option<QueryError> {
        self.lock().entries.get(key)?.error.clone()
    }

    /// Number of keys with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns true if the cache has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Marks every key starting with `prefix` as stale and notifies
    /// subscribers once. Stored values are kept.
    ///
    /// Returns the number of entries affected.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut affected = 0;
        {
            let mut state = self.lock();
            state.evict_idle(self.inner.config.gc_time);
            for (_, entry) in state
                .entries
                .iter_mut()
                .filter(|(key, _)| key.starts_with(prefix))
            {
                entry.invalidated = true;
                if let Some(flight) = entry.in_flight.as_mut() {
                    flight.superseded = true;
                }
                affected += 1;
            }
        }
        debug!(%prefix, affected, "Invalidated");
        self.emit(CacheEvent::Invalidated(prefix.clone()));
        affected
    }

    /// Drops entries that have not been read for [`CacheConfig::gc_time`]
    /// and have no request in flight.
    ///
    /// Returns the number of entries dropped.
    pub fn evict_idle(&self) -> usize {
        self.lock().evict_idle(self.inner.config.gc_time)
    }

    /// Drops every entry. Requests already in flight still answer their
    /// waiters but store nothing.
    pub fn clear(&self) {
        let removed = {
            let mut state = self.lock();
            let removed = state.entries.len();
            state.entries.clear();
            removed
        };
        debug!(removed, "Cleared cache");
        self.emit(CacheEvent::Cleared);
    }

    fn emit(&self, event: CacheEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

async fn wait(mut receiver: watch::Receiver<Option<Outcome>>) -> Outcome {
    let outcome = receiver
        .wait_for(Option::is_some)
        .await
        .ok()
        .and_then(|outcome| outcome.clone());
    outcome.unwrap_or_else(|| {
        Err(Arc::new(postdash_api::Error::InvalidResponse(
            "request abandoned".to_string(),
        )))
    })
}

fn downcast<T: Send + Sync + 'static>(value: Value) -> QueryResult<T> {
    value.downcast::<T>().map_err(|_| {
        Arc::new(postdash_api::Error::InvalidResponse(
            "cached value has an unexpected type".to_string(),
        ))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use postdash_api::{ApiClient, Error, ReportingPeriod, ServerId};

    use super::*;

    fn counting(
        calls: &Arc<AtomicUsize>,
        value: u32,
    ) -> impl Fn() -> std::pin::Pin<Box<dyn Future<Output = postdash_api::Result<u32>> + Send>>
    + Send
    + 'static {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(value)
            })
        }
    }

    fn failing(
        calls: &Arc<AtomicUsize>,
        status: u16,
    ) -> impl Fn() -> std::pin::Pin<Box<dyn Future<Output = postdash_api::Result<u32>> + Send>>
    + Send
    + 'static {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Err(Error::api(status, "boom")) })
        }
    }

    fn key() -> QueryKey {
        QueryKey::servers()
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_reads_share_one_request() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            cache.fetch(key(), RetryPolicy::NONE, counting(&calls, 1)),
            cache.fetch(key(), RetryPolicy::NONE, counting(&calls, 2)),
        );

        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*a, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_value_is_served_without_request() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));

        cache.fetch(key(), RetryPolicy::NONE, counting(&calls, 1)).await.unwrap();
        let again = cache.fetch(key(), RetryPolicy::NONE, counting(&calls, 2)).await.unwrap();

        assert_eq!(*again, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_fresh(&key()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_value_is_refetched() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));

        cache.fetch(key(), RetryPolicy::NONE, counting(&calls, 1)).await.unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(!cache.is_fresh(&key()));
        assert_eq!(*cache.peek::<u32>(&key()).unwrap(), 1);

        let value = cache.fetch(key(), RetryPolicy::NONE, counting(&calls, 2)).await.unwrap();
        assert_eq!(*value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_matches_prefix_only() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let id = ServerId::new("1");
        let detail = QueryKey::server(&id);
        let bounces = QueryKey::bounce_breakdown(&id, ReportingPeriod::Today);

        cache.fetch(key(), RetryPolicy::NONE, counting(&calls, 1)).await.unwrap();
        cache.fetch(detail.clone(), RetryPolicy::NONE, counting(&calls, 1)).await.unwrap();
        cache.fetch(bounces.clone(), RetryPolicy::NONE, counting(&calls, 1)).await.unwrap();

        assert_eq!(cache.invalidate(&QueryKey::servers()), 2);
        assert!(!cache.is_fresh(&key()));
        assert!(!cache.is_fresh(&detail));
        assert!(cache.is_fresh(&bounces));
        assert_eq!(*cache.peek::<u32>(&detail).unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_notifies_once() {
        let cache = QueryCache::default();
        let mut events = cache.subscribe();
        let calls = Arc::new(AtomicUsize::new(0));

        cache.fetch(key(), RetryPolicy::NONE, counting(&calls, 1)).await.unwrap();
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Updated(key()));

        cache.invalidate(&QueryKey::servers());
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Invalidated(key()));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_after_invalidation_mid_flight_is_refetched() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = {
            let cache = cache.clone();
            let fetcher = counting(&calls, 1);
            tokio::spawn(async move { cache.fetch(key(), RetryPolicy::NONE, fetcher).await })
        };
        tokio::task::yield_now().await;
        assert!(cache.is_fetching(&key()));

        cache.invalidate(&QueryKey::servers());
        let second = cache.fetch(key(), RetryPolicy::NONE, counting(&calls, 2)).await.unwrap();

        assert_eq!(*first.await.unwrap().unwrap(), 1);
        assert_eq!(*second, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_previous_value() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));

        cache.fetch(key(), RetryPolicy::NONE, counting(&calls, 1)).await.unwrap();
        cache.invalidate(&key());
        let err = cache.fetch(key(), RetryPolicy::NONE, failing(&calls, 500)).await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert_eq!(*cache.peek::<u32>(&key()).unwrap(), 1);
        assert_eq!(cache.last_error(&key()).unwrap().status(), Some(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_errors_are_not_retried() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let err = cache
            .fetch(key(), RetryPolicy::default(), failing(&calls, 401))
            .await
            .unwrap_err();

        assert!(err.is_auth());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_network_errors_are_retried() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        // Nothing listens on the discard port.
        let client = ApiClient::new("http://127.0.0.1:9/api").unwrap();

        let fetcher = {
            let calls = Arc::clone(&calls);
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                let client = client.clone();
                async move { client.list_servers().await }
            }
        };
        let err = cache
            .fetch(key(), RetryPolicy::new(2, Duration::from_millis(5)), fetcher)
            .await
            .unwrap_err();

        assert!(err.is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_discards_in_flight_result() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut events = cache.subscribe();

        let pending = {
            let cache = cache.clone();
            let fetcher = counting(&calls, 1);
            tokio::spawn(async move { cache.fetch(key(), RetryPolicy::NONE, fetcher).await })
        };
        tokio::task::yield_now().await;
        cache.clear();

        assert_eq!(*pending.await.unwrap().unwrap(), 1);
        assert!(cache.peek::<u32>(&key()).is_none());
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Cleared);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_type_mismatch_is_an_error() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        cache.fetch(key(), RetryPolicy::NONE, counting(&calls, 1)).await.unwrap();

        let result = cache
            .fetch(key(), RetryPolicy::NONE, || async { Ok(String::from("x")) })
            .await;
        assert!(result.is_err());
        assert!(cache.peek::<String>(&key()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_entries_are_evicted() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));

        for i in 0..50 {
            let id = ServerId::new(i.to_string());
            cache
                .fetch(QueryKey::server(&id), RetryPolicy::NONE, counting(&calls, i))
                .await
                .unwrap();
        }
        assert_eq!(cache.len(), 50);

        tokio::time::advance(Duration::from_secs(24 * 60 * 60)).await;
        cache.fetch(key(), RetryPolicy::NONE, counting(&calls, 1)).await.unwrap();

        assert_eq!(cache.len(), 1);
        assert!(cache.peek::<u32>(&QueryKey::server(&ServerId::new("0"))).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recently_read_entries_survive_eviction() {
        let cache = QueryCache::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let detail = QueryKey::server(&ServerId::new("1"));

        cache.fetch(key(), RetryPolicy::NONE, counting(&calls, 1)).await.unwrap();
        cache.fetch(detail.clone(), RetryPolicy::NONE, counting(&calls, 2)).await.unwrap();

        tokio::time::advance(Duration::from_secs(200)).await;
        assert_eq!(*cache.peek::<u32>(&detail).unwrap(), 2);
        tokio::time::advance(Duration::from_secs(200)).await;

        assert_eq!(cache.evict_idle(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(*cache.peek::<u32>(&detail).unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_entries_are_not_evicted() {
        let cache = QueryCache::new(CacheConfig {
            gc_time: Duration::ZERO,
            ..CacheConfig::default()
        });
        let calls = Arc::new(AtomicUsize::new(0));

        let pending = {
            let cache = cache.clone();
            let fetcher = counting(&calls, 7);
            tokio::spawn(async move { cache.fetch(key(), RetryPolicy::NONE, fetcher).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(cache.evict_idle(), 0);
        assert!(cache.is_fetching(&key()));

        assert_eq!(*pending.await.unwrap().unwrap(), 7);
    }

    #[test]
    fn test_retry_policy() {
        let policy = RetryPolicy::default();
        let auth = Error::api(401, "no");
        assert!(!policy.should_retry(1, &auth));
        assert_eq!(policy.delay(2), Duration::from_secs(2));
        assert!(!RetryPolicy::NONE.should_retry(1, &auth));
    }
}
