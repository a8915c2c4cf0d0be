// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tunables of the query cache.

use std::time::Duration;

use bon::Builder;

/// Default grace period before an unused entry is evicted.
pub const DEFAULT_KEEP_UNUSED_FOR: Duration = Duration::from_secs(60);

/// What happens to an entry once its last subscriber detaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Keep unused entries until the cache is shut down.
    Never,
    /// Evict after the grace period; a zero period evicts immediately.
    After(Duration),
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self::After(DEFAULT_KEEP_UNUSED_FOR)
    }
}

/// Configuration for [`QueryCache`](super::QueryCache).
#[derive(Debug, Clone, Builder)]
pub struct CacheOptions {
    #[builder(setters(name = with_eviction), default)]
    eviction: EvictionPolicy,
    #[builder(setters(name = with_request_timeout))]
    request_timeout: Option<Duration>,
    #[builder(setters(name = with_abort_on_cancel), default = false)]
    abort_on_cancel: bool,
    #[builder(setters(name = with_refetch_stale_on_subscribe), default = true)]
    refetch_stale_on_subscribe: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CacheOptions {
    #[must_use]
    pub const fn eviction(&self) -> EvictionPolicy {
        self.eviction
    }

    /// Upper bound for one gateway round trip; `None` waits indefinitely.
    #[must_use]
    pub const fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// Whether cancelling the last subscriber also aborts the transport call.
    #[must_use]
    pub const fn abort_on_cancel(&self) -> bool {
        self.abort_on_cancel
    }

    /// Whether subscribing to a stale, idle entry triggers a refetch.
    #[must_use]
    pub const fn refetch_stale_on_subscribe(&self) -> bool {
        self.refetch_stale_on_subscribe
    }
}
