// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Memoized selectors over an [`EntityState`].
//!
//! ```text
//! select_x(&Arc<state>, arg)
//!        |
//!        v
//!   Memo slot: (state ptr, arg) equal to last call?
//!      yes -> cached output (cheap Arc clone)
//!      no  -> recompute, replace slot
//! ```
//!
//! Each selector keeps a single slot, so alternating arguments recompute.
//! Selectors are total: a missing entity is `None` or is dropped from the
//! output list, never a panic.

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::EntityState;

/// Selector output for list-shaped views.
pub type EntityList<T> = Arc<[Arc<T>]>;

struct Slot<S, A, O> {
    state: Arc<S>,
    arg: A,
    output: O,
}

/// Single-slot memo keyed by state identity and argument equality.
pub(crate) struct Memo<S, A, O> {
    slot: Mutex<Option<Slot<S, A, O>>>,
    recomputations: AtomicUsize,
}

impl<S, A, O> Default for Memo<S, A, O> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
            recomputations: AtomicUsize::new(0),
        }
    }
}

impl<S, A, O: Clone> Memo<S, A, O> {
    pub(crate) fn get_or_compute<Q>(
        &self,
        state: &Arc<S>,
        arg: &Q,
        compute: impl FnOnce(&S, &Q) -> O,
    ) -> O
    where
        A: Borrow<Q>,
        Q: ?Sized + PartialEq + ToOwned<Owned = A>,
    {
        let mut slot = self.slot.lock();
        if let Some(hit) = slot.as_ref()
            && Arc::ptr_eq(&hit.state, state)
            && <A as Borrow<Q>>::borrow(&hit.arg) == arg
        {
            return hit.output.clone();
        }

        let output = compute(state.as_ref(), arg);
        self.recomputations.fetch_add(1, Ordering::Relaxed);
        *slot = Some(Slot {
            state: Arc::clone(state),
            arg: arg.to_owned(),
            output: output.clone(),
        });
        output
    }

    pub(crate) fn recomputations(&self) -> usize {
        self.recomputations.load(Ordering::Relaxed)
    }
}

type StateOf<T, K> = EntityState<T, K>;

/// The selector set for one entity type.
pub struct EntitySelectors<T, K = String> {
    all: Memo<StateOf<T, K>, (), EntityList<T>>,
    by_id: Memo<StateOf<T, K>, K, Option<Arc<T>>>,
    nth: Memo<StateOf<T, K>, usize, Option<Arc<T>>>,
    by_ids: Memo<StateOf<T, K>, Vec<K>, EntityList<T>>,
    by_prefix: Memo<StateOf<T, K>, String, EntityList<T>>,
    not_in: Memo<StateOf<T, K>, Vec<K>, EntityList<T>>,
}

impl<T, K> Default for EntitySelectors<T, K> {
    fn default() -> Self {
        Self {
            all: Memo::default(),
            by_id: Memo::default(),
            nth: Memo::default(),
            by_ids: Memo::default(),
            by_prefix: Memo::default(),
            not_in: Memo::default(),
        }
    }
}

impl<T, K> std::fmt::Debug for EntitySelectors<T, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitySelectors")
            .field("recomputations", &self.recomputations())
            .finish()
    }
}

impl<T, K> EntitySelectors<T, K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of recomputations across all selectors.
    #[must_use]
    pub fn recomputations(&self) -> usize {
        self.all.recomputations()
            + self.by_id.recomputations()
            + self.nth.recomputations()
            + self.by_ids.recomputations()
            + self.by_prefix.recomputations()
            + self.not_in.recomputations()
    }
}

impl<T, K: Clone + Eq + Hash> EntitySelectors<T, K> {
    /// All entities in `ids` order.
    pub fn select_all(&self, state: &Arc<EntityState<T, K>>) -> EntityList<T> {
        self.all
            .get_or_compute(state, &(), |state, _| state.iter().cloned().collect())
    }

    /// Ids in display order.
    pub fn select_ids<'a>(&self, state: &'a EntityState<T, K>) -> &'a [K] {
        state.ids()
    }

    /// Number of ids.
    pub fn select_total(&self, state: &EntityState<T, K>) -> usize {
        state.len()
    }

    /// One entity by id.
    pub fn select_by_id(&self, state: &Arc<EntityState<T, K>>, id: &K) -> Option<Arc<T>> {
        self.by_id
            .get_or_compute(state, id, |state, id| state.get(id).cloned())
    }

    /// The entity at `index` in `ids`.
    ///
    /// `None` for an out-of-range index, an empty state, or an id that no
    /// longer resolves to an entity.
    pub fn select_nth(&self, state: &Arc<EntityState<T, K>>, index: usize) -> Option<Arc<T>> {
        self.nth.get_or_compute(state, &index, |state, &index| {
            state
                .ids()
                .get(index)
                .and_then(|id| state.get(id))
                .cloned()
        })
    }

    /// Entities for `ids` in the requested order; absent ids are dropped.
    pub fn select_by_ids(&self, state: &Arc<EntityState<T, K>>, ids: &[K]) -> EntityList<T> {
        self.by_ids.get_or_compute(state, ids, |state, ids| {
            ids.iter().filter_map(|id| state.get(id)).cloned().collect()
        })
    }

    /// Entities whose id is not in `exclude`, in `ids` order.
    pub fn select_not_in(&self, state: &Arc<EntityState<T, K>>, exclude: &[K]) -> EntityList<T> {
        self.not_in.get_or_compute(state, exclude, |state, exclude| {
            state
                .ids()
                .iter()
                .filter(|id| !exclude.contains(id))
                .filter_map(|id| state.get(id))
                .cloned()
                .collect()
        })
    }
}

impl<T, K: Clone + Eq + Hash + AsRef<str>> EntitySelectors<T, K> {
    /// Entities whose id starts with `prefix`, in `ids` order.
    ///
    /// Plain string comparison: `"a/b"` is a prefix of `"a/bc"`.
    pub fn select_by_prefix(&self, state: &Arc<EntityState<T, K>>, prefix: &str) -> EntityList<T> {
        self.by_prefix.get_or_compute(state, prefix, |state, prefix| {
            state
                .ids()
                .iter()
                .filter(|id| <K as AsRef<str>>::as_ref(id).starts_with(prefix))
                .filter_map(|id| state.get(id))
                .cloned()
                .collect()
        })
    }
}
