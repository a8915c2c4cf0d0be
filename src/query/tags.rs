// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Invalidation tags and the tag → key index.
//!
//! ```text
//! query   provides   [Stacks]            --> index[Stacks] += key
//! mutation invalidates [StackBranches, Commits]
//!        |
//!        v
//!   keys_for(tags) = union of index sets (each key once)
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};

use super::CacheKey;

/// Coarse label shared by queries and mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
    Stacks,
    StackBranches,
    Commits,
    CommitChanges,
}

impl Tag {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stacks => "Stacks",
            Self::StackBranches => "StackBranches",
            Self::Commits => "Commits",
            Self::CommitChanges => "CommitChanges",
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which cache entries provide which tag.
#[derive(Debug, Default)]
pub(crate) struct TagIndex {
    keys: HashMap<Tag, HashSet<CacheKey>>,
}

impl TagIndex {
    pub(crate) fn insert(&mut self, key: &CacheKey, tags: &[Tag]) {
        for tag in tags {
            self.keys.entry(*tag).or_default().insert(key.clone());
        }
    }

    pub(crate) fn remove(&mut self, key: &CacheKey, tags: &[Tag]) {
        for tag in tags {
            if let Some(keys) = self.keys.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.keys.remove(tag);
                }
            }
        }
    }

    /// Keys providing any of `tags`, each once, in key order.
    pub(crate) fn keys_for(&self, tags: &[Tag]) -> BTreeSet<CacheKey> {
        tags.iter()
            .filter_map(|tag| self.keys.get(tag))
            .flatten()
            .cloned()
            .collect()
    }

    pub(crate) fn count(&self, tag: Tag) -> usize {
        self.keys.get(&tag).map_or(0, HashSet::len)
    }

    pub(crate) fn clear(&mut self) {
        self.keys.clear();
    }
}
