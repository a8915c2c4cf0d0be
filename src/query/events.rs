// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Cache transition events for diagnostics.
//!
//! Each listener owns an unbounded flume receiver; listeners whose receiver
//! was dropped are pruned on the next emit.

use parking_lot::Mutex;

use super::{CacheKey, Tag};
use crate::error::ErrorKind;

/// Why a resolved response was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// A newer response for the same key was already applied.
    OutOfOrder,
    /// Every subscriber detached while the request was in flight.
    Cancelled,
    /// The entry no longer exists.
    Evicted,
}

/// A cache state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    FetchStarted { key: CacheKey, seq: u64 },
    Applied { key: CacheKey, seq: u64 },
    Failed { key: CacheKey, seq: u64, kind: ErrorKind },
    Discarded { key: CacheKey, seq: u64, reason: DiscardReason },
    Invalidated { tags: Vec<Tag>, refetching: usize, marked: usize },
    Evicted { key: CacheKey },
}

#[derive(Default)]
pub(crate) struct EventBus {
    listeners: Mutex<Vec<flume::Sender<CacheEvent>>>,
}

impl EventBus {
    pub(crate) fn listen(&self) -> flume::Receiver<CacheEvent> {
        let (tx, rx) = flume::unbounded();
        self.listeners.lock().push(tx);
        rx
    }

    pub(crate) fn emit(&self, event: &CacheEvent) {
        let mut listeners = self.listeners.lock();
        if listeners.is_empty() {
            return;
        }
        listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
