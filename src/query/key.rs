// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Cache keys.

use std::sync::Arc;

use serde_json::Value;

use crate::gateway::Params;

/// Identity of a cache entry: command name plus canonical params.
///
/// Object keys are sorted before serializing, so two parameter maps with the
/// same content always produce the same key regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    command: Arc<str>,
    params: Arc<str>,
}

impl CacheKey {
    #[must_use]
    pub fn new(command: &str, params: &Params) -> Self {
        Self {
            command: Arc::from(command),
            params: Arc::from(canonical(&Value::Object(params.clone())).to_string()),
        }
    }

    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The serialized parameter tuple.
    #[must_use]
    pub fn params(&self) -> &str {
        &self.params
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.command, self.params)
    }
}

fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort();
            Value::Object(
                keys.into_iter()
                    .map(|k| (k.clone(), canonical(&map[k])))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}
