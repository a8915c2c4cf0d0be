// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Process-scoped client state.
//!
//! ```text
//! ClientState::new(gateway, options)      ClientState::from_config(&config)
//!        |                                        |
//!        +------------------+---------------------+
//!                           v
//!                      QueryCache  <---- MutationExecutor
//!                           ^
//!                           |
//!                     StackService (views + mutations)
//!                           |
//!                       shutdown()
//! ```
//!
//! One `ClientState` is created at start and shut down at exit; clones share
//! the same cache.


use std::sync::Arc;

use crate::config::Config;
use crate::error::StateResult;
use crate::gateway::{CommandGateway, HttpGateway};
use crate::mutation::MutationExecutor;
use crate::query::{CacheOptions, QueryCache};
use crate::service::StackService;

/// The store and everything built on it.
#[derive(Debug, Clone)]
pub struct ClientState {
    cache: QueryCache,
    mutations: MutationExecutor,
    stacks: StackService,
}

impl ClientState {
    #[must_use]
    pub fn new(gateway: Arc<dyn CommandGateway>, options: CacheOptions) -> Self {
        let cache = QueryCache::new(gateway, options);
        tracing::debug!(options = ?cache.options(), "Client state created");
        Self {
            mutations: MutationExecutor::new(cache.clone()),
            stacks: StackService::new(cache.clone()),
            cache,
        }
    }

    /// State talking to the configured HTTP backend.
    ///
    /// # Errors
    ///
    /// Returns `StateError::Config` if the configuration is invalid.
    pub fn from_config(config: &Config) -> StateResult<Self> {
        config.validate()?;
        let gateway = HttpGateway::new(config.gateway.url.clone());
        tracing::info!(url = %gateway.url(), "Using HTTP gateway");
        Ok(Self::new(Arc::new(gateway), config.cache_options()))
    }

    #[must_use]
    pub const fn cache(&self) -> &QueryCache {
        &self.cache
    }

    #[must_use]
    pub const fn mutations(&self) -> &MutationExecutor {
        &self.mutations
    }

    #[must_use]
    pub const fn stacks(&self) -> &StackService {
        &self.stacks
    }

    /// Tears the store down. Later subscriptions and mutations fail with
    /// `StateError::Shutdown`.
    pub fn shutdown(&self) {
        self.cache.shutdown();
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.cache.is_closed()
    }
}
