// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Mutation executor.
//!
//! ```text
//! run(def, params)
//!    |
//!    v
//! gateway.invoke (once, no retry)
//!    |
//!    +-- Err --> return error, nothing invalidated
//!    |
//!    +-- Ok  --> cache.invalidate(def.invalidates)
//!                   |
//!                   v
//!               decode result as R (a decode failure is reported after
//!               the invalidation, the write already happened)
//! ```
//!
//! Mutations never patch cached data; they only invalidate tags. Concurrent
//! mutations are not serialized.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{GatewayError, StateResult};
use crate::gateway::{Params, with_timeout};
use crate::query::{QueryCache, Tag};

/// Static description of a mutation returning `R`.
///
/// Mutations without a meaningful result use [`serde::de::IgnoredAny`].
pub struct MutationDef<R> {
    command: &'static str,
    invalidates: &'static [Tag],
    _result: PhantomData<fn() -> R>,
}

impl<R> MutationDef<R> {
    #[must_use]
    pub const fn new(command: &'static str, invalidates: &'static [Tag]) -> Self {
        Self {
            command,
            invalidates,
            _result: PhantomData,
        }
    }

    #[must_use]
    pub const fn command(&self) -> &'static str {
        self.command
    }

    #[must_use]
    pub const fn invalidates(&self) -> &'static [Tag] {
        self.invalidates
    }
}

/// Runs mutations against the cache's gateway.
#[derive(Debug, Clone)]
pub struct MutationExecutor {
    cache: QueryCache,
}

impl MutationExecutor {
    #[must_use]
    pub const fn new(cache: QueryCache) -> Self {
        Self { cache }
    }

    /// Invokes `command` once and invalidates `invalidates` on success.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged, or [`StateError::Shutdown`]
    /// when the cache is closed.
    ///
    /// [`StateError::Shutdown`]: crate::error::StateError::Shutdown
    pub async fn mutate(&self, command: &str, params: Params, invalidates: &[Tag]) -> StateResult<Value> {
        self.cache.ensure_open()?;
        tracing::debug!(command, ?invalidates, "Running mutation");

        let future = self.cache.gateway().invoke(command, params);
        let result = with_timeout(command.to_string(), future, self.cache.options().request_timeout()).await;

        match result {
            Ok(value) => {
                let refetching = self.cache.invalidate(invalidates);
                tracing::info!(command, refetching, "Mutation succeeded");
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(command, kind = %err.kind(), error = %err, "Mutation failed");
                Err(err.into())
            }
        }
    }

    /// Runs a typed mutation.
    ///
    /// # Errors
    ///
    /// As [`MutationExecutor::mutate`]; additionally a decode error if the
    /// result does not match `R`, in which case the tags have already been
    /// invalidated.
    pub async fn run<R: DeserializeOwned>(&self, def: &MutationDef<R>, params: Params) -> StateResult<R> {
        let value = self.mutate(def.command, params, def.invalidates).await?;
        serde_json::from_value(value).map_err(|e| {
            let err = GatewayError::decode(def.command, &e);
            tracing::warn!(command = def.command, error = %err, "Mutation result could not be decoded");
            err.into()
        })
    }
}
