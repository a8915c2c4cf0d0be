// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Query cache with request coalescing and tag invalidation.
//!
//! # Architecture
//!
//! ```text
//! subscribe(def, params)
//!      |
//!      v
//!   CacheKey (command, canonical params)
//!      |
//!   entry absent/uninitialized --> start_fetch --> spawn(gateway round trip)
//!   entry loading/refetching   --> attach (no second call)
//!   entry ready, stale         --> start_fetch (background refresh)
//!      |                                              |
//!      v                                              v
//!  QuerySubscription <--- watch channel <--- resolve(key, seq, result)
//!                                              seq <= applied   -> discard
//!                                              seq <= cancelled -> discard
//!                                              ok  -> replace data, Ready
//!                                              err -> keep data, Errored
//!
//! invalidate(tags) --> TagIndex --> keys --> stale + refetch if subscribed
//! last unsubscribe --> cancel in-flight results --> evict after grace period
//! ```
//!
//! # Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`QueryCache`] | Shared handle to all entries |
//! | [`QueryDef`] | Command name, provided tags and normalizer of a query |
//! | [`QuerySubscription`] | RAII subscriber of one entry |
//! | [`QueryState`] | Typed view of an entry: status, data, error |
//! | [`Tag`] | Invalidation label |
//! | [`CacheEvent`] | Transition notifications for diagnostics |
//!
//! All state sits behind one mutex that is never held across an `.await`;
//! the only suspension point is the gateway round trip, which runs in a
//! spawned task and re-enters through `resolve`.

mod entry;
pub mod events;
mod key;
pub mod options;
mod subscription;
mod tags;

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::FutureExt;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::entity::{EntityAdapter, EntityState};
use crate::error::{GatewayError, GatewayResult, StateError, StateResult};
use crate::gateway::{CommandGateway, Params, with_timeout};

use entry::{AnyData, CacheEntry, Fetcher};
use tags::TagIndex;

pub use entry::QueryStatus;
pub use events::{CacheEvent, DiscardReason};
pub use key::CacheKey;
pub use options::{CacheOptions, EvictionPolicy};
pub use subscription::{QueryState, QuerySubscription};
pub use tags::Tag;

/// Static description of a list query.
pub struct QueryDef<T> {
    command: &'static str,
    provides: &'static [Tag],
    adapter: EntityAdapter<T>,
}

impl<T> QueryDef<T> {
    #[must_use]
    pub const fn new(command: &'static str, provides: &'static [Tag], adapter: EntityAdapter<T>) -> Self {
        Self {
            command,
            provides,
            adapter,
        }
    }

    #[must_use]
    pub const fn command(&self) -> &'static str {
        self.command
    }

    #[must_use]
    pub const fn provides(&self) -> &'static [Tag] {
        self.provides
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    tags: TagIndex,
    closed: bool,
}

struct Inner {
    gateway: Arc<dyn CommandGateway>,
    options: CacheOptions,
    state: Mutex<CacheState>,
    events: events::EventBus,
    /// Last request sequence number issued by any entry.
    last_seq: AtomicU64,
}

/// Shared handle to the query cache.
///
/// Cloning is cheap; all clones see the same entries.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("QueryCache")
            .field("entries", &state.entries.len())
            .field("closed", &state.closed)
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl QueryCache {
    /// Creates an empty cache in front of `gateway`.
    #[must_use]
    pub fn new(gateway: Arc<dyn CommandGateway>, options: CacheOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                gateway,
                options,
                state: Mutex::new(CacheState::default()),
                events: events::EventBus::default(),
                last_seq: AtomicU64::new(0),
            }),
        }
    }

    /// The gateway requests are sent through.
    #[must_use]
    pub fn gateway(&self) -> Arc<dyn CommandGateway> {
        Arc::clone(&self.inner.gateway)
    }

    #[must_use]
    pub fn options(&self) -> &CacheOptions {
        &self.inner.options
    }

    /// Subscribes to the entry for `(def.command, params)`.
    ///
    /// Issues a gateway call only if the entry has none in flight and needs
    /// data; concurrent subscribers to the same key share one call.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Shutdown`] once the cache has been shut down,
    /// or [`StateError::NoRuntime`] if a fetch must be started outside of a
    /// tokio runtime.
    pub fn subscribe<T>(&self, def: &QueryDef<T>, params: Params) -> StateResult<QuerySubscription<T>>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let key = CacheKey::new(def.command, &params);
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        if state.closed {
            return Err(StateError::Shutdown);
        }

        if !state.entries.contains_key(&key) {
            let fetch = self.fetcher(def, params);
            state.tags.insert(&key, def.provides);
            state.entries.insert(
                key.clone(),
                CacheEntry::new(
                    def.provides,
                    TypeId::of::<EntityState<T>>(),
                    fetch,
                    self.inner.last_seq.load(Ordering::Relaxed),
                ),
            );
            tracing::trace!(key = %key, "Created cache entry");
        }
        let Some(entry) = state.entries.get_mut(&key) else {
            return Err(StateError::Other("cache entry vanished".into()));
        };

        if entry.data_type != TypeId::of::<EntityState<T>>() {
            tracing::warn!(key = %key, "Subscribed with a different entity type than the entry holds");
        }

        entry.subscribers += 1;
        if let Some(token) = entry.eviction.take() {
            token.cancel();
        }

        let should_fetch = match entry.status {
            QueryStatus::Uninitialized => true,
            QueryStatus::Loading | QueryStatus::Refetching => false,
            QueryStatus::Ready | QueryStatus::Errored => {
                entry.stale && self.inner.options.refetch_stale_on_subscribe()
            }
        };
        tracing::debug!(
            key = %key,
            subscribers = entry.subscribers,
            status = %entry.status,
            fetch = should_fetch,
            "Subscribed"
        );

        let rx = entry.tx.subscribe();
        if should_fetch && let Err(err) = start_fetch(&self.inner, &key, entry) {
            entry.subscribers -= 1;
            if entry.subscribers == 0 && entry.status == QueryStatus::Uninitialized {
                evict(&self.inner, state, &key);
            }
            return Err(err);
        }
        drop(guard);

        Ok(QuerySubscription::new(self.clone(), key, rx))
    }

    /// Builds the closure that performs one fetch of `def` with `params`.
    fn fetcher<T>(&self, def: &QueryDef<T>, params: Params) -> Fetcher
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let gateway = Arc::clone(&self.inner.gateway);
        let timeout = self.inner.options.request_timeout();
        let command = def.command;
        let adapter = def.adapter;

        Arc::new(move || {
            let gateway = Arc::clone(&gateway);
            let params = params.clone();
            async move {
                let future = gateway.invoke(command, params);
                let value = with_timeout(command.to_string(), future, timeout).await?;
                let items: Vec<T> =
                    serde_json::from_value(value).map_err(|e| GatewayError::decode(command, &e))?;
                let data: AnyData = Arc::new(adapter.normalize(items));
                Ok(data)
            }
            .boxed()
        })
    }

    /// Marks every entry providing one of `tags` as stale and refetches the
    /// ones that have subscribers.
    ///
    /// Returns the number of refetches started. An entry providing several
    /// of the tags is refetched once.
    pub fn invalidate(&self, tags: &[Tag]) -> usize {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let keys = state.tags.keys_for(tags);

        let mut refetching = 0;
        let mut marked = 0;
        for key in &keys {
            let Some(entry) = state.entries.get_mut(key) else {
                continue;
            };
            entry.stale = true;
            if entry.subscribers == 0 {
                entry.publish();
                marked += 1;
            } else if let Err(err) = start_fetch(&self.inner, key, entry) {
                tracing::warn!(key = %key, error = %err, "Refetch not started; entry left stale");
                entry.publish();
                marked += 1;
            } else {
                refetching += 1;
            }
        }

        tracing::info!(?tags, refetching, marked, "Invalidated tags");
        self.inner.events.emit(&CacheEvent::Invalidated {
            tags: tags.to_vec(),
            refetching,
            marked,
        });
        refetching
    }

    /// Starts a new request for `key` even if one is in flight.
    ///
    /// Returns `false` if the entry does not exist, has no subscribers, or
    /// no tokio runtime is available to run the request.
    pub fn refetch(&self, key: &CacheKey) -> bool {
        let mut state = self.inner.state.lock();
        match state.entries.get_mut(key) {
            Some(entry) if entry.subscribers > 0 => match start_fetch(&self.inner, key, entry) {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "Refetch not started");
                    false
                }
            },
            _ => false,
        }
    }

    /// Status of the entry for `key`, if it exists.
    #[must_use]
    pub fn status(&self, key: &CacheKey) -> Option<QueryStatus> {
        self.inner.state.lock().entries.get(key).map(|e| e.status)
    }

    /// Number of subscribers of `key`.
    #[must_use]
    pub fn subscriber_count(&self, key: &CacheKey) -> usize {
        self.inner
            .state
            .lock()
            .entries
            .get(key)
            .map_or(0, |e| e.subscribers)
    }

    /// Whether the entry for `key` exists.
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.state.lock().entries.contains_key(key)
    }

    /// Number of entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries that provide `tag`.
    #[must_use]
    pub fn tagged(&self, tag: Tag) -> usize {
        self.inner.state.lock().tags.count(tag)
    }

    /// Registers a listener for cache transitions.
    #[must_use]
    pub fn events(&self) -> flume::Receiver<CacheEvent> {
        self.inner.events.listen()
    }

    /// Fails once the cache has been shut down.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Shutdown`] after [`QueryCache::shutdown`].
    pub fn ensure_open(&self) -> StateResult<()> {
        if self.inner.state.lock().closed {
            Err(StateError::Shutdown)
        } else {
            Ok(())
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Drops every entry and refuses new subscriptions.
    ///
    /// In-flight transport calls and pending evictions are aborted. Live
    /// subscriptions observe their channel closing.
    pub fn shutdown(&self) {
        let mut state = self.inner.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        for entry in state.entries.values_mut() {
            entry.cancel_in_flight(true);
            if let Some(token) = entry.eviction.take() {
                token.cancel();
            }
        }
        let dropped = state.entries.len();
        state.entries.clear();
        state.tags.clear();
        tracing::info!(entries = dropped, "Query cache shut down");
    }

    /// Detaches one subscriber from `key`.
    pub(crate) fn unsubscribe(&self, key: &CacheKey) {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let Some(entry) = state.entries.get_mut(key) else {
            return;
        };
        entry.subscribers = entry.subscribers.saturating_sub(1);
        tracing::debug!(key = %key, subscribers = entry.subscribers, "Unsubscribed");
        if entry.subscribers > 0 {
            return;
        }

        if !entry.in_flight.is_empty() {
            tracing::debug!(key = %key, through = entry.next_seq, "Cancelling in-flight results");
            entry.cancel_in_flight(self.inner.options.abort_on_cancel());
            // The requested refresh never landed.
            entry.stale = entry.data.is_some();
            entry.status = entry.idle_status();
            entry.publish();
        }

        match self.inner.options.eviction() {
            EvictionPolicy::Never => {}
            EvictionPolicy::After(grace) if grace.is_zero() => {
                evict(&self.inner, state, key);
            }
            EvictionPolicy::After(grace) => match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let token = CancellationToken::new();
                    entry.eviction = Some(token.clone());
                    let inner = Arc::clone(&self.inner);
                    let key = key.clone();
                    handle.spawn(async move {
                        tokio::select! {
                            () = token.cancelled() => {}
                            () = tokio::time::sleep(grace) => evict_if_unused(&inner, &key, &token),
                        }
                    });
                }
                Err(_) => evict(&self.inner, state, key),
            },
        }
    }
}

/// Issues a new request for `entry`, superseding any in flight.
///
/// Leaves the entry untouched if there is no runtime to spawn on.
fn start_fetch(inner: &Arc<Inner>, key: &CacheKey, entry: &mut CacheEntry) -> StateResult<()> {
    let runtime = tokio::runtime::Handle::try_current().map_err(|_| StateError::NoRuntime)?;
    let seq = inner.last_seq.fetch_add(1, Ordering::Relaxed) + 1;
    entry.next_seq = seq;
    entry.status = entry.fetching_status();
    entry.publish();

    let future = (entry.fetch)();
    let task_inner = Arc::clone(inner);
    let task_key = key.clone();
    let handle = runtime.spawn(async move {
        let result = future.await;
        resolve(&task_inner, &task_key, seq, result);
    });
    entry.in_flight.insert(seq, handle.abort_handle());

    tracing::debug!(key = %key, seq, status = %entry.status, "Fetch started");
    inner
        .events
        .emit(&CacheEvent::FetchStarted { key: key.clone(), seq });
    Ok(())
}

/// Applies the outcome of request `seq` unless it has been superseded.
fn resolve(inner: &Inner, key: &CacheKey, seq: u64, result: GatewayResult<AnyData>) {
    let mut state = inner.state.lock();
    let Some(entry) = state.entries.get_mut(key) else {
        tracing::debug!(key = %key, seq, "Discarding result for evicted entry");
        inner.events.emit(&CacheEvent::Discarded {
            key: key.clone(),
            seq,
            reason: DiscardReason::Evicted,
        });
        return;
    };
    if seq <= entry.created_after {
        tracing::debug!(key = %key, seq, "Discarding result issued before the entry was recreated");
        inner.events.emit(&CacheEvent::Discarded {
            key: key.clone(),
            seq,
            reason: DiscardReason::Evicted,
        });
        return;
    }
    entry.in_flight.remove(&seq);

    let reason = if seq <= entry.discard_through {
        Some(DiscardReason::Cancelled)
    } else if seq <= entry.applied_seq {
        Some(DiscardReason::OutOfOrder)
    } else {
        None
    };
    if let Some(reason) = reason {
        tracing::debug!(key = %key, seq, applied = entry.applied_seq, ?reason, "Discarding result");
        if entry.in_flight.is_empty() && entry.status.is_fetching() {
            entry.status = entry.idle_status();
            entry.publish();
        }
        inner.events.emit(&CacheEvent::Discarded {
            key: key.clone(),
            seq,
            reason,
        });
        return;
    }

    entry.applied_seq = seq;
    let event = match result {
        Ok(data) => {
            entry.data = Some(data);
            entry.error = None;
            if seq == entry.next_seq {
                entry.stale = false;
            }
            tracing::debug!(key = %key, seq, "Applied result");
            CacheEvent::Applied {
                key: key.clone(),
                seq,
            }
        }
        Err(err) => {
            tracing::warn!(key = %key, seq, kind = %err.kind(), error = %err, "Query failed");
            let kind = err.kind();
            entry.error = Some(err);
            CacheEvent::Failed {
                key: key.clone(),
                seq,
                kind,
            }
        }
    };
    entry.status = if entry.in_flight.is_empty() {
        entry.idle_status()
    } else {
        entry.fetching_status()
    };
    entry.publish();
    inner.events.emit(&event);
}

fn evict_if_unused(inner: &Inner, key: &CacheKey, token: &CancellationToken) {
    let mut guard = inner.state.lock();
    let state = &mut *guard;
    let unused = state
        .entries
        .get(key)
        .is_some_and(|entry| entry.subscribers == 0 && !token.is_cancelled());
    if unused {
        evict(inner, state, key);
    }
}

fn evict(inner: &Inner, state: &mut CacheState, key: &CacheKey) {
    if let Some(entry) = state.entries.remove(key) {
        state.tags.remove(key, entry.provides);
        tracing::debug!(key = %key, "Evicted cache entry");
        inner
            .events
            .emit(&CacheEvent::Evicted { key: key.clone() });
    }
}

#[cfg(test)]
mod tests;
