// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Entity normalization.
//!
//! ```text
//! [e1, e2, e1', e3]            response list (backend order)
//!        |
//!        v  EntityAdapter::add_many (select_id once per element)
//!   ids:      [id1, id2, id3]  first position wins
//!   entities: {id1: e1', id2: e2, id3: e3}  last write wins
//! ```
//!
//! A state is never edited in place. Every ingestion produces a new
//! [`EntityState`]; the cache swaps the whole `Arc` on each resolution.

pub mod selectors;

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

pub use selectors::{EntityList, EntitySelectors};

/// Normalized snapshot: ordered ids plus an id-indexed map.
#[derive(Debug)]
pub struct EntityState<T, K = String> {
    ids: Vec<K>,
    entities: HashMap<K, Arc<T>>,
}

impl<T, K> Default for EntityState<T, K> {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            entities: HashMap::new(),
        }
    }
}

impl<T, K: Clone> Clone for EntityState<T, K> {
    fn clone(&self) -> Self {
        Self {
            ids: self.ids.clone(),
            entities: self.entities.clone(),
        }
    }
}

impl<T: PartialEq, K: Eq + Hash> PartialEq for EntityState<T, K> {
    fn eq(&self, other: &Self) -> bool {
        self.ids == other.ids && self.entities == other.entities
    }
}

impl<T, K: Eq + Hash> EntityState<T, K> {
    /// Assembles a state from raw parts without validating them.
    ///
    /// `ids` may name keys that are missing from `entities`; selectors
    /// treat such dangling ids as absent.
    #[must_use]
    pub const fn from_parts(ids: Vec<K>, entities: HashMap<K, Arc<T>>) -> Self {
        Self { ids, entities }
    }

    /// Ids in display order.
    #[must_use]
    pub fn ids(&self) -> &[K] {
        &self.ids
    }

    /// The id-indexed entity map.
    #[must_use]
    pub const fn entities(&self) -> &HashMap<K, Arc<T>> {
        &self.entities
    }

    /// Looks up one entity.
    #[must_use]
    pub fn get(&self, id: &K) -> Option<&Arc<T>> {
        self.entities.get(id)
    }

    /// Number of ids in the order sequence.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterates entities in `ids` order, skipping dangling ids.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<T>> {
        self.ids.iter().filter_map(|id| self.entities.get(id))
    }
}

/// Generic normalizer parameterized by an identity extractor.
pub struct EntityAdapter<T, K = String> {
    select_id: fn(&T) -> K,
}

impl<T, K> Clone for EntityAdapter<T, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, K> Copy for EntityAdapter<T, K> {}

impl<T, K> std::fmt::Debug for EntityAdapter<T, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityAdapter").finish_non_exhaustive()
    }
}

impl<T, K: Clone + Eq + Hash> EntityAdapter<T, K> {
    /// Creates an adapter keyed by `select_id`.
    #[must_use]
    pub const fn new(select_id: fn(&T) -> K) -> Self {
        Self { select_id }
    }

    /// Returns the identity of an entity.
    pub fn select_id(&self, entity: &T) -> K {
        (self.select_id)(entity)
    }

    /// An empty state.
    #[must_use]
    pub fn initial_state(&self) -> EntityState<T, K> {
        EntityState::default()
    }

    /// Adds `items` on top of `state`, returning a new state.
    ///
    /// Order is preserved. A repeated id replaces the stored entity but keeps
    /// the position of its first occurrence.
    pub fn add_many<I>(&self, state: &EntityState<T, K>, items: I) -> EntityState<T, K>
    where
        I: IntoIterator<Item = T>,
    {
        let mut next = state.clone();
        for item in items {
            let id = self.select_id(&item);
            if !next.entities.contains_key(&id) {
                next.ids.push(id.clone());
            }
            next.entities.insert(id, Arc::new(item));
        }
        next
    }

    /// Normalizes a full response list into a fresh state.
    pub fn normalize<I>(&self, items: I) -> EntityState<T, K>
    where
        I: IntoIterator<Item = T>,
    {
        self.add_many(&self.initial_state(), items)
    }
}
