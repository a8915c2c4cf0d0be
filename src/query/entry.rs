// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Per-key cache entry.
//!
//! ```text
//!                  subscribe
//! Uninitialized ------------> Loading ----ok----> Ready
//!       ^                       |                 |  ^
//!       | last subscriber       | err   invalidate|  | ok
//!       | left, no data         v                 v  |
//!       +------------------- Errored <--err-- Refetching
//!                       (keeps last good data)
//! ```
//!
//! Sequence numbers are drawn from one counter shared by every entry, so a
//! key that is evicted and recreated never reuses one. `created_after` is
//! the counter value when the entry was made: anything at or below it
//! belongs to an earlier entry for the same key. `next_seq` is the last
//! issued request, `applied_seq` the last applied resolution,
//! `discard_through` the last request whose result must be dropped because
//! every subscriber left.

use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

use super::Tag;
use crate::error::{GatewayError, GatewayResult};

/// Type-erased normalized result.
pub(crate) type AnyData = Arc<dyn Any + Send + Sync>;

/// Performs one round trip and normalizes the response.
pub(crate) type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, GatewayResult<AnyData>> + Send + Sync>;

/// Lifecycle status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryStatus {
    /// No request has been issued yet.
    Uninitialized,
    /// First request in flight, no data yet.
    Loading,
    /// Data available, nothing in flight.
    Ready,
    /// Data available and a refresh in flight.
    Refetching,
    /// The last resolution failed; earlier data may still be present.
    Errored,
}

impl QueryStatus {
    /// Whether a request is in flight.
    #[must_use]
    pub const fn is_fetching(self) -> bool {
        matches!(self, Self::Loading | Self::Refetching)
    }

    /// Whether the entry has resolved at least once and is idle.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Ready | Self::Errored)
    }
}

impl std::fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Refetching => "refetching",
            Self::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// What subscribers observe through the watch channel.
#[derive(Clone)]
pub(crate) struct Published {
    pub(crate) status: QueryStatus,
    pub(crate) data: Option<AnyData>,
    pub(crate) error: Option<GatewayError>,
    pub(crate) stale: bool,
}

pub(crate) struct CacheEntry {
    pub(crate) provides: &'static [Tag],
    pub(crate) data_type: TypeId,
    pub(crate) fetch: Fetcher,
    pub(crate) status: QueryStatus,
    pub(crate) data: Option<AnyData>,
    pub(crate) error: Option<GatewayError>,
    pub(crate) stale: bool,
    pub(crate) subscribers: usize,
    pub(crate) created_after: u64,
    pub(crate) next_seq: u64,
    pub(crate) applied_seq: u64,
    pub(crate) discard_through: u64,
    pub(crate) in_flight: BTreeMap<u64, AbortHandle>,
    pub(crate) eviction: Option<CancellationToken>,
    pub(crate) tx: watch::Sender<Published>,
}

impl CacheEntry {
    pub(crate) fn new(
        provides: &'static [Tag],
        data_type: TypeId,
        fetch: Fetcher,
        created_after: u64,
    ) -> Self {
        let (tx, _) = watch::channel(Published {
            status: QueryStatus::Uninitialized,
            data: None,
            error: None,
            stale: false,
        });
        Self {
            provides,
            data_type,
            fetch,
            status: QueryStatus::Uninitialized,
            data: None,
            error: None,
            stale: false,
            subscribers: 0,
            created_after,
            next_seq: created_after,
            applied_seq: created_after,
            discard_through: created_after,
            in_flight: BTreeMap::new(),
            eviction: None,
            tx,
        }
    }

    /// Status while requests are still in flight.
    pub(crate) const fn fetching_status(&self) -> QueryStatus {
        if self.data.is_some() {
            QueryStatus::Refetching
        } else {
            QueryStatus::Loading
        }
    }

    /// Status once nothing is in flight.
    pub(crate) const fn idle_status(&self) -> QueryStatus {
        if self.error.is_some() {
            QueryStatus::Errored
        } else if self.data.is_some() {
            QueryStatus::Ready
        } else {
            QueryStatus::Uninitialized
        }
    }

    /// Pushes the current state to subscribers.
    pub(crate) fn publish(&self) {
        self.tx.send_replace(Published {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            stale: self.stale,
        });
    }

    /// Drops every in-flight request, aborting the transport calls if asked.
    pub(crate) fn cancel_in_flight(&mut self, abort: bool) {
        self.discard_through = self.next_seq;
        for (_, handle) in std::mem::take(&mut self.in_flight) {
            if abort {
                handle.abort();
            }
        }
    }
}
