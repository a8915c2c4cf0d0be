// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Reactive bindings: a query subscription plus a derived view.
//!
//! ```text
//! QuerySubscription<T> --(state changes)--> project(&EntityState<T>) --> O
//!                                                     |
//!                                  differs from last delivered? --> deliver
//! ```
//!
//! [`Binding::next`] delivers every change of status, error or derived value.
//! [`Binding::next_value`] ignores status-only changes, so a refetch that
//! returns data deriving to the same value does not wake the consumer.

use std::sync::Arc;

use crate::entity::EntityState;
use crate::error::GatewayError;
use crate::query::{QueryState, QueryStatus, QuerySubscription};

type Projection<T, O> = Box<dyn Fn(&Arc<EntityState<T>>) -> O + Send + Sync>;

/// A derived value together with the status of the query it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound<O> {
    pub status: QueryStatus,
    /// `None` until the query has data.
    pub value: Option<O>,
    pub error: Option<GatewayError>,
}

impl<O> Bound<O> {
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.value.is_none() && matches!(self.status, QueryStatus::Uninitialized | QueryStatus::Loading)
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Maps the derived value, keeping status and error.
    pub fn map<U>(self, f: impl FnOnce(O) -> U) -> Bound<U> {
        Bound {
            status: self.status,
            value: self.value.map(f),
            error: self.error,
        }
    }
}

/// Derived, deduplicated view of one query.
pub struct Binding<T, O> {
    subscription: QuerySubscription<T>,
    project: Projection<T, O>,
    last: Option<Bound<O>>,
}

impl<T, O: std::fmt::Debug> std::fmt::Debug for Binding<T, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("key", self.subscription.key())
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

impl<T, O> Binding<T, O>
where
    T: Send + Sync + 'static,
    O: Clone + PartialEq,
{
    pub fn new<F>(subscription: QuerySubscription<T>, project: F) -> Self
    where
        F: Fn(&Arc<EntityState<T>>) -> O + Send + Sync + 'static,
    {
        Self {
            subscription,
            project: Box::new(project),
            last: None,
        }
    }

    /// The underlying subscription.
    #[must_use]
    pub const fn subscription(&self) -> &QuerySubscription<T> {
        &self.subscription
    }

    /// Derives the current value without marking it delivered.
    #[must_use]
    pub fn current(&self) -> Bound<O> {
        self.derive(self.subscription.current())
    }

    /// Waits for the next value that differs from the last delivered one.
    ///
    /// The first call delivers immediately. Returns `None` once the cache
    /// has been shut down.
    pub async fn next(&mut self) -> Option<Bound<O>> {
        let mut bound = self.current();
        loop {
            if self.last.as_ref() != Some(&bound) {
                self.last = Some(bound.clone());
                return Some(bound);
            }
            let state = self.subscription.changed().await?;
            bound = self.derive(state);
        }
    }

    /// Waits for the next value whose derived value or error differs from
    /// the last delivered one.
    ///
    /// Status-only transitions (`Ready` to `Refetching` and back) are
    /// skipped. The first call delivers immediately.
    pub async fn next_value(&mut self) -> Option<Bound<O>> {
        let mut bound = self.current();
        loop {
            let differs = self
                .last
                .as_ref()
                .is_none_or(|last| last.value != bound.value || last.error != bound.error);
            if differs {
                self.last = Some(bound.clone());
                return Some(bound);
            }
            let state = self.subscription.changed().await?;
            bound = self.derive(state);
        }
    }

    /// Waits until the query has settled and delivers its value.
    pub async fn settled(&mut self) -> Option<Bound<O>> {
        let state = self.subscription.settled().await?;
        let bound = self.derive(state);
        self.last = Some(bound.clone());
        Some(bound)
    }

    /// Forces a new request for the underlying query.
    pub fn refetch(&self) -> bool {
        self.subscription.refetch()
    }

    fn derive(&self, state: QueryState<T>) -> Bound<O> {
        Bound {
            status: state.status,
            value: state.data.as_ref().map(|data| (self.project)(data)),
            error: state.error,
        }
    }
}

#[cfg(test)]
mod tests;
