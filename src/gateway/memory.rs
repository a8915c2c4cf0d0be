// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! In-process gateway backed by registered handlers.
//!
//! Used to embed a backend in the same process and to script backends in
//! tests. Every invocation is logged before its handler runs, so call
//! counts include calls that are still pending. An embedded backend that
//! runs for the life of the process should use
//! [`MemoryGateway::without_call_log`] or drain the log with
//! [`MemoryGateway::clear_calls`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use super::{CommandGateway, GatewayFuture, Params};
use crate::error::{GatewayError, GatewayResult};

type Handler = Arc<dyn Fn(Params) -> GatewayFuture + Send + Sync>;

/// Gateway dispatching to in-process handlers.
#[derive(Default)]
pub struct MemoryGateway {
    handlers: RwLock<HashMap<String, Handler>>,
    calls: Mutex<Vec<(String, Params)>>,
    no_call_log: bool,
}

impl std::fmt::Debug for MemoryGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut commands: Vec<_> = self.handlers.read().keys().cloned().collect();
        commands.sort();
        f.debug_struct("MemoryGateway")
            .field("commands", &commands)
            .field("calls", &self.calls.lock().len())
            .field("call_log", &!self.no_call_log)
            .finish()
    }
}

impl MemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway that does not record invocations.
    ///
    /// [`call_count`](Self::call_count) and [`calls`](Self::calls) stay empty.
    #[must_use]
    pub fn without_call_log(mut self) -> Self {
        self.no_call_log = true;
        self
    }

    /// Registers an async handler, replacing any previous one.
    pub fn register<F, Fut>(&self, command: impl Into<String>, handler: F)
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult<Value>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |params| handler(params).boxed());
        self.handlers.write().insert(command.into(), handler);
    }

    /// Registers a handler that answers immediately.
    pub fn register_sync<F>(&self, command: impl Into<String>, handler: F)
    where
        F: Fn(&Params) -> GatewayResult<Value> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        self.register(command, move |params| {
            let result = handler(&params);
            async move { result }
        });
    }

    /// Number of invocations of `command` so far.
    #[must_use]
    pub fn call_count(&self, command: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(name, _)| name == command)
            .count()
    }

    /// All invocations in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, Params)> {
        self.calls.lock().clone()
    }

    /// Empties the call log and returns what it held.
    pub fn clear_calls(&self) -> Vec<(String, Params)> {
        std::mem::take(&mut *self.calls.lock())
    }
}

impl CommandGateway for MemoryGateway {
    fn invoke(&self, command: &str, params: Params) -> GatewayFuture {
        if !self.no_call_log {
            self.calls.lock().push((command.to_string(), params.clone()));
        }

        let handler = self.handlers.read().get(command).cloned();
        match handler {
            Some(handler) => handler(params),
            None => {
                let err = GatewayError::UnknownCommand {
                    command: command.to_string(),
                };
                async move { Err(err) }.boxed()
            }
        }
    }
}
