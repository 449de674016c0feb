//! Query and mutation dispatcher
//!
//! [`QueryClient`] is the public entry point. It resolves queries to cache
//! entries, collapses concurrent fetches of the same key into one network
//! call, runs mutations and applies their tag invalidations, and drives the
//! subscription lifecycle.
//!
//! All cache state sits behind one mutex that is never held across an await
//! point. Fetches and GC timers run as Tokio tasks and re-enter the state
//! through weak references, so a dropped client never keeps them alive.

use crate::cache::config::CacheConfig;
use crate::cache::entry::{QuerySnapshot, QueryStatus, Transition};
use crate::cache::invalidation::{InvalidationEvent, InvalidationReason};
use crate::cache::key::QueryKey;
use crate::cache::store::CacheStore;
use crate::cache::subscription::{SubscriptionId, SubscriptionManager};
use crate::cache::tags::{Tag, TagContext};
use crate::cache::types::CacheStats;
use crate::endpoint::{BoundQuery, MutationEndpoint, QueryEndpoint};
use crate::error::{CacheError, QueryError, Result};
use crate::fetcher::{fetch_with_retry, Fetcher};
use futures::FutureExt;
use parking_lot::{Mutex, MutexGuard};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Handle to the shared query cache. Cheap to clone.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: CacheConfig,
    fetcher: Arc<dyn Fetcher>,
    runtime: Handle,
    state: Mutex<CacheState>,
}

struct CacheState {
    store: CacheStore,
    subscriptions: SubscriptionManager,
    /// One entry per key with a fetch outstanding
    in_flight: HashMap<QueryKey, InFlight>,
    stats: CacheStats,
    metrics: bool,
    next_flight: u64,
    shut_down: bool,
}

struct InFlight {
    id: u64,
    handle: JoinHandle<()>,
    /// Tags of this key were invalidated while the fetch was outstanding
    invalidated: bool,
}

/// Result of a successful mutation
#[derive(Debug, Clone)]
pub struct MutationOutcome<T> {
    pub data: T,
    pub mutation_id: Uuid,
    pub invalidation: InvalidationEvent,
}

impl QueryClient {
    /// Create a client with the default configuration.
    ///
    /// Must be called from within a Tokio runtime; background fetches and
    /// GC timers are spawned onto it.
    pub fn new(fetcher: impl Fetcher) -> Result<Self> {
        Self::with_config(fetcher, CacheConfig::default())
    }

    /// Create a client with a custom configuration
    pub fn with_config(fetcher: impl Fetcher, config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| {
            CacheError::ConfigError("QueryClient must be created inside a Tokio runtime".to_string())
        })?;

        info!("Initializing query client with config: {:?}", config);

        let state = CacheState {
            store: CacheStore::new(),
            subscriptions: SubscriptionManager::new(),
            in_flight: HashMap::new(),
            stats: CacheStats::default(),
            metrics: config.enable_metrics,
            next_flight: 0,
            shut_down: false,
        };

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                fetcher: Arc::new(fetcher),
                runtime,
                state: Mutex::new(state),
            }),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Resolve a query to its cache entry without subscribing.
    ///
    /// Starts a fetch when the entry is new or stale and none is in flight.
    /// The returned view follows the entry as it changes.
    pub fn query<A, T>(&self, endpoint: &QueryEndpoint<A, T>, args: &A) -> Result<QueryView<T>>
    where
        A: Serialize,
        T: DeserializeOwned,
    {
        let (key, origin) = bind(endpoint, args)?;
        let rx = {
            let mut guard = self.inner.lock();
            let state = &mut *guard;
            state.ensure_running()?;
            self.inner
                .dispatch(state, &key, &origin, self.inner.config.refetch_on_error)
        };
        Ok(QueryView::new(self.inner.clone(), key, origin, rx))
    }

    /// Subscribe to a query. The entry stays cached while the returned
    /// handle is alive and is refetched whenever its tags are invalidated.
    pub fn subscribe<A, T>(
        &self,
        endpoint: &QueryEndpoint<A, T>,
        args: &A,
    ) -> Result<QuerySubscription<T>>
    where
        A: Serialize,
        T: DeserializeOwned,
    {
        let (key, origin) = bind(endpoint, args)?;
        let (id, rx) =
            self.inner
                .subscribe_bound(&key, &origin, self.inner.config.refetch_on_error)?;
        Ok(QuerySubscription {
            view: QueryView::new(self.inner.clone(), key, origin, rx),
            id,
        })
    }

    /// Query and wait for the entry to settle
    pub async fn fetch<A, T>(&self, endpoint: &QueryEndpoint<A, T>, args: &A) -> Result<T>
    where
        A: Serialize,
        T: DeserializeOwned,
    {
        let mut view = self.query(endpoint, args)?;
        view.settled().await
    }

    /// Run a mutation. On success its declared tags are invalidated before
    /// this returns; on failure the cache is left untouched.
    pub async fn mutate<A, T>(
        &self,
        endpoint: &MutationEndpoint<A, T>,
        args: &A,
    ) -> Result<MutationOutcome<T>>
    where
        A: Serialize,
        T: DeserializeOwned,
    {
        self.inner.lock().ensure_running()?;

        let args = serde_json::to_value(args).map_err(|e| {
            CacheError::SerializationError(format!(
                "cannot serialize arguments for {}: {}",
                endpoint.name(),
                e
            ))
        })?;
        let request = endpoint.descriptor.request(&args)?;
        let mutation_id = Uuid::new_v4();
        let span = info_span!("mutation", endpoint = endpoint.name(), %mutation_id);

        async move {
            debug!("Dispatching {} {}", request.method, request.path);

            let data = match self.inner.fetcher.fetch(request).await {
                Ok(data) => data,
                Err(error) => {
                    warn!("Mutation failed: {}", error);
                    self.inner.count(|stats| stats.mutation_failures += 1);
                    return Err(error.into());
                }
            };

            let tags = endpoint.invalidates.resolve(&TagContext {
                result: Some(&data),
                error: None,
                args: &args,
            });
            let reason = InvalidationReason::Mutation {
                endpoint: endpoint.name().to_string(),
                mutation_id,
            };
            let invalidation = self.inner.finish_mutation(&tags, reason);

            let data = serde_json::from_value(data).map_err(|e| {
                CacheError::SerializationError(format!(
                    "cannot decode {} response: {}",
                    endpoint.name(),
                    e
                ))
            })?;

            Ok(MutationOutcome {
                data,
                mutation_id,
                invalidation,
            })
        }
        .instrument(span)
        .await
    }

    /// Invalidate tags directly, as if a mutation had declared them
    pub fn invalidate_tags(&self, tags: &[Tag]) -> Result<InvalidationEvent> {
        let mut guard = self.inner.lock();
        let state = &mut *guard;
        state.ensure_running()?;
        Ok(self.inner.invalidate(state, tags, InvalidationReason::Manual))
    }

    /// Force a refetch of a cached entry. Returns false when the key is not cached.
    pub fn refetch(&self, key: &QueryKey) -> Result<bool> {
        let mut guard = self.inner.lock();
        let state = &mut *guard;
        state.ensure_running()?;

        let Some(origin) = state.store.get(key).map(|entry| entry.origin.clone()) else {
            return Ok(false);
        };
        self.inner.refetch_in(state, key, &origin);
        Ok(true)
    }

    /// Current state of a cached entry
    pub fn snapshot(&self, key: &QueryKey) -> Option<QuerySnapshot> {
        self.inner.lock().store.snapshot(key)
    }

    /// Keys of all cached entries
    pub fn keys(&self) -> Vec<QueryKey> {
        self.inner.lock().store.keys()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let state = self.inner.lock();
        let mut stats = state.stats.clone();
        stats.entries = state.store.len();
        stats.subscriptions = state.subscriptions.active();
        stats.in_flight = state.in_flight.len();
        stats
    }

    /// Drop every entry, aborting in-flight fetches and GC timers.
    /// The client stays usable.
    pub fn clear(&self) {
        let mut guard = self.inner.lock();
        let (entries, flights, timers) = guard.abort_all();
        info!(
            "Cleared {} entries from cache ({} fetches aborted, {} GC timers cancelled)",
            entries, flights, timers
        );
    }

    /// Abort all background work, drop every entry and reject further
    /// dispatches with [`CacheError::ShutdownError`]
    pub fn shutdown(&self) {
        let mut guard = self.inner.lock();
        if guard.shut_down {
            return;
        }
        guard.shut_down = true;
        let (entries, flights, timers) = guard.abort_all();
        info!(
            "Query client shut down ({} entries dropped, {} fetches aborted, {} GC timers cancelled)",
            entries, flights, timers
        );
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.lock().shut_down
    }
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

fn bind<A: Serialize, T>(
    endpoint: &QueryEndpoint<A, T>,
    args: &A,
) -> Result<(QueryKey, Arc<BoundQuery>)> {
    let value = serde_json::to_value(args).map_err(|e| {
        CacheError::SerializationError(format!(
            "cannot key arguments for {}: {}",
            endpoint.name(),
            e
        ))
    })?;
    let key = QueryKey::from_value(endpoint.name(), &value);
    let origin = BoundQuery::new(&endpoint.descriptor, value, endpoint.provides.clone())?;
    Ok((key, Arc::new(origin)))
}

impl CacheState {
    fn ensure_running(&self) -> Result<()> {
        if self.shut_down {
            Err(CacheError::ShutdownError)
        } else {
            Ok(())
        }
    }

    fn count(&mut self, update: impl FnOnce(&mut CacheStats)) {
        if self.metrics {
            update(&mut self.stats);
        }
    }

    /// Returns (entries dropped, fetches aborted, timers cancelled)
    fn abort_all(&mut self) -> (usize, usize, usize) {
        let flights = self.in_flight.len();
        for (_, flight) in self.in_flight.drain() {
            flight.handle.abort();
        }
        let timers = self.subscriptions.clear();
        let entries = self.store.clear();
        (entries, flights, timers)
    }
}

impl ClientInner {
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock()
    }

    fn count(&self, update: impl FnOnce(&mut CacheStats)) {
        self.lock().count(update);
    }

    /// Query path: find or create the entry and fetch if it needs data.
    /// A rejected entry is only fetched again when `retry_rejected` is set.
    fn dispatch(
        self: &Arc<Self>,
        state: &mut CacheState,
        key: &QueryKey,
        origin: &Arc<BoundQuery>,
        retry_rejected: bool,
    ) -> watch::Receiver<QuerySnapshot> {
        let in_flight = state.in_flight.contains_key(key);
        let (entry, _) = state.store.get_or_create(key, origin);
        let rx = entry.watch();

        let needs_fetch = !in_flight
            && match entry.status {
                QueryStatus::Uninitialized | QueryStatus::Pending => true,
                QueryStatus::Rejected => retry_rejected,
                QueryStatus::Fulfilled => false,
            };

        if needs_fetch {
            debug!("Cache miss: {}", key);
            state.count(|stats| stats.misses += 1);
            self.start_fetch(state, key);
        } else if in_flight {
            debug!("Joining in-flight fetch: {}", key);
            state.count(|stats| stats.deduplicated += 1);
        } else {
            debug!("Cache hit: {}", key);
            state.count(|stats| stats.hits += 1);
        }

        rx
    }

    /// Dispatch and register a subscriber in one critical section
    fn subscribe_bound(
        self: &Arc<Self>,
        key: &QueryKey,
        origin: &Arc<BoundQuery>,
        retry_rejected: bool,
    ) -> Result<(SubscriptionId, watch::Receiver<QuerySnapshot>)> {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.ensure_running()?;

        let rx = self.dispatch(state, key, origin, retry_rejected);
        let id = state
            .subscriptions
            .subscribe(&mut state.store, key)
            .ok_or_else(|| CacheError::ConfigError(format!("no cache entry for {}", key)))?;
        Ok((id, rx))
    }

    /// Release a subscriber, scheduling GC when it was the last one
    fn release(self: &Arc<Self>, id: SubscriptionId) {
        let mut guard = self.lock();
        let state = &mut *guard;

        if let Some((key, 0)) = state.subscriptions.unsubscribe(&mut state.store, id) {
            if !state.shut_down {
                self.schedule_gc(state, &key);
            }
        }
    }

    /// Force a fetch unless one is already in flight
    fn refetch_in(
        self: &Arc<Self>,
        state: &mut CacheState,
        key: &QueryKey,
        origin: &Arc<BoundQuery>,
    ) -> watch::Receiver<QuerySnapshot> {
        let (entry, _) = state.store.get_or_create(key, origin);
        let rx = entry.watch();
        if state.in_flight.contains_key(key) {
            debug!("Refetch joins in-flight fetch: {}", key);
            state.count(|stats| stats.deduplicated += 1);
        } else {
            self.start_fetch(state, key);
        }
        rx
    }

    fn start_fetch(self: &Arc<Self>, state: &mut CacheState, key: &QueryKey) {
        let Some(entry) = state.store.get_mut(key) else {
            return;
        };
        let origin = entry.origin.clone();
        entry.apply(Transition::Pending);

        state.next_flight += 1;
        let flight_id = state.next_flight;
        state.count(|stats| stats.fetches += 1);

        debug!(
            "Fetching {} {} for {}",
            origin.request.method, origin.request.path, key
        );

        let weak: Weak<ClientInner> = Arc::downgrade(self);
        let fetcher = self.fetcher.clone();
        let config = self.config.clone();
        let flight_key = key.clone();
        let handle = self.runtime.spawn(async move {
            let fetch = fetch_with_retry(fetcher.as_ref(), origin.request.clone(), &config);
            let result = match AssertUnwindSafe(fetch).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => Err(QueryError::NetworkError(format!(
                    "fetcher panicked: {}",
                    panic_message(panic.as_ref())
                ))),
            };
            if let Some(inner) = weak.upgrade() {
                inner.complete_fetch(&flight_key, flight_id, result);
            }
        });

        state.in_flight.insert(
            key.clone(),
            InFlight {
                id: flight_id,
                handle,
                invalidated: false,
            },
        );
    }

    fn complete_fetch(
        self: &Arc<Self>,
        key: &QueryKey,
        flight_id: u64,
        result: std::result::Result<Value, QueryError>,
    ) {
        let mut guard = self.lock();
        let state = &mut *guard;

        let flight = match state.in_flight.remove(key) {
            Some(flight) if flight.id == flight_id => flight,
            Some(other) => {
                state.in_flight.insert(key.clone(), other);
                return;
            }
            None => return,
        };

        let Some(entry) = state.store.get(key) else {
            return;
        };
        let origin = entry.origin.clone();

        if flight.invalidated {
            // The response may predate the invalidating mutation
            debug!("Discarding superseded response for {}", key);
            // Subscribers asked for this fetch, so it is replaced even when
            // invalidation refetching is disabled
            if entry.subscriber_count > 0 {
                state.count(|stats| stats.refetches += 1);
                self.start_fetch(state, key);
                return;
            }
        } else {
            let tags = match &result {
                Ok(data) => origin.provides.resolve(&TagContext {
                    result: Some(data),
                    error: None,
                    args: &origin.args,
                }),
                Err(error) => origin.provides.resolve(&TagContext {
                    result: None,
                    error: Some(error),
                    args: &origin.args,
                }),
            };

            match result {
                Ok(data) => {
                    debug!("Fetched {}", key);
                    state.store.update(key, Transition::Fulfilled(data));
                }
                Err(error) => {
                    warn!("Fetch failed for {}: {}", key, error);
                    state.store.update(key, Transition::Rejected(error));
                }
            }
            state.store.set_provided_tags(key, tags);
        }

        let (subscribers, gc_due) = match state.store.get(key) {
            Some(entry) => (entry.subscriber_count, entry.gc_due),
            None => return,
        };
        if subscribers == 0 {
            if gc_due {
                self.evict(state, key);
            } else if !state.subscriptions.has_pending_gc(key) {
                self.schedule_gc(state, key);
            }
        }
    }

    fn schedule_gc(self: &Arc<Self>, state: &mut CacheState, key: &QueryKey) {
        let weak: Weak<ClientInner> = Arc::downgrade(self);
        let delay = self.config.gc_delay;
        let runtime = &self.runtime;
        let timer_key = key.clone();

        state.subscriptions.schedule_gc(key, |token| {
            runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                if let Some(inner) = weak.upgrade() {
                    inner.collect(&timer_key, token);
                }
            })
        });
        debug!("Scheduled GC for {} in {:?}", key, delay);
    }

    /// GC timer fired
    fn collect(self: &Arc<Self>, key: &QueryKey, token: u64) {
        let mut guard = self.lock();
        let state = &mut *guard;

        if !state.subscriptions.take_fired_timer(key, token) {
            return;
        }
        let in_flight = state.in_flight.contains_key(key);
        let Some(entry) = state.store.get_mut(key) else {
            return;
        };
        if entry.subscriber_count > 0 {
            return;
        }
        if in_flight {
            debug!("Deferring GC of {} until its fetch lands", key);
            entry.gc_due = true;
            return;
        }
        self.evict(state, key);
    }

    fn evict(&self, state: &mut CacheState, key: &QueryKey) {
        if state.store.remove(key).is_some() {
            info!("Evicted unused cache entry: {}", key);
            state.count(|stats| stats.evictions_gc += 1);
        }
    }

    fn finish_mutation(self: &Arc<Self>, tags: &[Tag], reason: InvalidationReason) -> InvalidationEvent {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.count(|stats| stats.mutations += 1);
        self.invalidate(state, tags, reason)
    }

    /// Mark every entry providing one of `tags` stale and refetch the
    /// subscribed ones
    fn invalidate(
        self: &Arc<Self>,
        state: &mut CacheState,
        tags: &[Tag],
        reason: InvalidationReason,
    ) -> InvalidationEvent {
        let mut event = InvalidationEvent::new(reason, tags.to_vec());
        if tags.is_empty() {
            return event;
        }

        let mut keys: Vec<QueryKey> = state.store.keys_for_tags(tags).into_iter().collect();
        keys.sort();

        for key in keys {
            state.count(|stats| stats.invalidations += 1);
            state.store.update(&key, Transition::Invalidated);

            if let Some(flight) = state.in_flight.get_mut(&key) {
                flight.invalidated = true;
                event.refetched.push(key.clone());
            } else {
                let subscribers = state
                    .store
                    .get(&key)
                    .map(|entry| entry.subscriber_count)
                    .unwrap_or(0);
                if subscribers > 0 && self.config.refetch_on_invalidate {
                    state.count(|stats| stats.refetches += 1);
                    self.start_fetch(state, &key);
                    event.refetched.push(key.clone());
                }
            }
            event.keys.push(key);
        }

        let tag_list: Vec<String> = tags.iter().map(ToString::to_string).collect();
        info!(
            "Invalidated {} entries with tags [{}] ({}), {} refetching",
            event.keys.len(),
            tag_list.join(", "),
            event.reason,
            event.refetched.len()
        );
        event
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for (_, flight) in state.in_flight.drain() {
            flight.handle.abort();
        }
        state.subscriptions.abort_timers();
    }
}

/// Live, read-only view of one cache entry
pub struct QueryView<T> {
    inner: Arc<ClientInner>,
    key: QueryKey,
    origin: Arc<BoundQuery>,
    rx: watch::Receiver<QuerySnapshot>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> QueryView<T> {
    fn new(
        inner: Arc<ClientInner>,
        key: QueryKey,
        origin: Arc<BoundQuery>,
        rx: watch::Receiver<QuerySnapshot>,
    ) -> Self {
        Self {
            inner,
            key,
            origin,
            rx,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Latest published state of the entry
    pub fn snapshot(&self) -> QuerySnapshot {
        self.rx.borrow().clone()
    }

    pub fn status(&self) -> QueryStatus {
        self.rx.borrow().status
    }

    pub fn error(&self) -> Option<QueryError> {
        self.rx.borrow().error.clone()
    }

    /// Wait for the next change. False once the entry has been evicted or cleared.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Force a refetch (joining one already in flight).
    /// Re-creates the entry if it has been evicted.
    pub fn refetch(&mut self) -> Result<()> {
        let mut guard = self.inner.lock();
        let state = &mut *guard;
        state.ensure_running()?;
        self.rx = self.inner.refetch_in(state, &self.key, &self.origin);
        Ok(())
    }
}

impl<T: DeserializeOwned> QueryView<T> {
    /// Last successful data, decoded
    pub fn data(&self) -> Result<Option<T>> {
        let snapshot = self.rx.borrow();
        snapshot
            .data
            .as_ref()
            .map(|data| decode(&self.key, data))
            .transpose()
    }

    /// Wait until the entry is fulfilled or rejected.
    ///
    /// Holds a subscription while waiting, so a stale entry is refetched and
    /// an invalidation during the wait is followed through. An entry that is
    /// already rejected returns its error without another fetch.
    pub async fn settled(&mut self) -> Result<T> {
        loop {
            // A rejection already recorded is the answer; do not refetch it
            let (id, rx) = self.inner.subscribe_bound(&self.key, &self.origin, false)?;
            let _release = ReleaseOnDrop {
                inner: self.inner.clone(),
                id,
            };
            self.rx = rx;

            loop {
                {
                    let snapshot = self.rx.borrow_and_update();
                    match (snapshot.status, &snapshot.data, &snapshot.error) {
                        (QueryStatus::Fulfilled, Some(data), _) => return decode(&self.key, data),
                        (QueryStatus::Rejected, _, Some(error)) => return Err(error.clone().into()),
                        _ => {}
                    }
                }
                if self.rx.changed().await.is_err() {
                    // Entry cleared underneath us; dispatch again
                    break;
                }
            }
        }
    }
}

impl<T> Clone for QueryView<T> {
    fn clone(&self) -> Self {
        Self::new(
            self.inner.clone(),
            self.key.clone(),
            self.origin.clone(),
            self.rx.clone(),
        )
    }
}

impl<T> fmt::Debug for QueryView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryView")
            .field("key", &self.key)
            .field("status", &self.status())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

fn decode<T: DeserializeOwned>(key: &QueryKey, data: &Value) -> Result<T> {
    serde_json::from_value(data.clone()).map_err(|e| {
        CacheError::SerializationError(format!("cannot decode cached data for {}: {}", key, e))
    })
}

/// Scoped subscription: the entry stays cached and live while this exists.
/// Dropping it (or calling [`release`](Self::release)) unsubscribes.
pub struct QuerySubscription<T> {
    view: QueryView<T>,
    id: SubscriptionId,
}

impl<T> QuerySubscription<T> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// A view that outlives this subscription
    pub fn view(&self) -> QueryView<T> {
        self.view.clone()
    }

    /// Unsubscribe now
    pub fn release(self) {}
}

impl<T> Deref for QuerySubscription<T> {
    type Target = QueryView<T>;

    fn deref(&self) -> &Self::Target {
        &self.view
    }
}

impl<T> DerefMut for QuerySubscription<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.view
    }
}

impl<T> Drop for QuerySubscription<T> {
    fn drop(&mut self) {
        self.view.inner.release(self.id);
    }
}

impl<T> fmt::Debug for QuerySubscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySubscription")
            .field("id", &self.id)
            .field("view", &self.view)
            .finish()
    }
}

struct ReleaseOnDrop {
    inner: Arc<ClientInner>,
    id: SubscriptionId,
}

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        self.inner.release(self.id);
    }
}
