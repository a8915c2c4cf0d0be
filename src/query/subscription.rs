// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Subscriber handles.

use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::watch;

use super::entry::Published;
use super::{CacheKey, QueryCache, QueryStatus};
use crate::entity::EntityState;
use crate::error::GatewayError;

/// Typed snapshot of a cache entry.
#[derive(Debug)]
pub struct QueryState<T> {
    pub status: QueryStatus,
    pub data: Option<Arc<EntityState<T>>>,
    pub error: Option<GatewayError>,
    /// Data is kept but known to be outdated.
    pub stale: bool,
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            stale: self.stale,
        }
    }
}

impl<T> QueryState<T> {
    /// No data yet and a request is in flight (or about to be).
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.data.is_none() && matches!(self.status, QueryStatus::Loading | QueryStatus::Uninitialized)
    }

    #[must_use]
    pub const fn is_fetching(&self) -> bool {
        self.status.is_fetching()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.data.is_some() && self.error.is_none()
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Normalized data, if any has been applied.
    #[must_use]
    pub fn data(&self) -> Option<&Arc<EntityState<T>>> {
        self.data.as_ref()
    }
}

/// One subscriber of a cache entry.
///
/// Dropping the handle detaches the subscriber; once the last one leaves,
/// results still in flight are discarded and the entry becomes eligible
/// for eviction.
pub struct QuerySubscription<T> {
    cache: QueryCache,
    key: CacheKey,
    rx: watch::Receiver<Published>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for QuerySubscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySubscription")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl<T> QuerySubscription<T> {
    pub(crate) const fn new(cache: QueryCache, key: CacheKey, rx: watch::Receiver<Published>) -> Self {
        Self {
            cache,
            key,
            rx,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Forces a new request for this entry.
    pub fn refetch(&self) -> bool {
        self.cache.refetch(&self.key)
    }
}

impl<T: Send + Sync + 'static> QuerySubscription<T> {

    /// The latest published state.
    #[must_use]
    pub fn current(&self) -> QueryState<T> {
        let published = self.rx.borrow().clone();
        self.typed(published)
    }

    /// Waits for the next published state.
    ///
    /// Returns `None` once the entry is gone (cache shut down).
    pub async fn changed(&mut self) -> Option<QueryState<T>> {
        self.rx.changed().await.ok()?;
        let published = self.rx.borrow_and_update().clone();
        Some(self.typed(published))
    }

    /// Waits until no request is in flight and the entry has resolved.
    ///
    /// Returns `None` once the entry is gone.
    pub async fn settled(&mut self) -> Option<QueryState<T>> {
        let published = self
            .rx
            .wait_for(|p| p.status.is_settled())
            .await
            .ok()?
            .clone();
        Some(self.typed(published))
    }

    fn typed(&self, published: Published) -> QueryState<T> {
        let data = published.data.and_then(|any| match any.downcast::<EntityState<T>>() {
            Ok(data) => Some(data),
            Err(_) => {
                tracing::warn!(key = %self.key, "Cached data has an unexpected entity type");
                None
            }
        });
        QueryState {
            status: published.status,
            data,
            error: published.error,
            stale: published.stale,
        }
    }
}

impl<T> Drop for QuerySubscription<T> {
    fn drop(&mut self) {
        self.cache.unsubscribe(&self.key);
    }
}
