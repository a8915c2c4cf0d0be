// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Command gateway: the boundary to the backend.
//!
//! ```text
//! invoke("stacks", {projectId}) --> BoxFuture<Result<Value, GatewayError>>
//!        |
//!   +----+----------------+
//!   v                     v
//! HttpGateway          MemoryGateway
//! POST {command,       registered handlers,
//!       params}        per-command call log
//! ```
//!
//! The cache only ever suspends at this boundary.

pub mod http;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::error::{GatewayError, GatewayResult};

pub use http::HttpGateway;
pub use memory::MemoryGateway;

/// Named command parameters.
pub type Params = serde_json::Map<String, Value>;

/// Future returned by [`CommandGateway::invoke`].
pub type GatewayFuture = BoxFuture<'static, GatewayResult<Value>>;

/// Executes a named backend command.
pub trait CommandGateway: Send + Sync {
    /// Invokes `command` with `params`.
    ///
    /// The returned future owns everything it needs so that it can be
    /// spawned and outlive the call site.
    fn invoke(&self, command: &str, params: Params) -> GatewayFuture;
}

impl<G: CommandGateway + ?Sized> CommandGateway for Arc<G> {
    fn invoke(&self, command: &str, params: Params) -> GatewayFuture {
        (**self).invoke(command, params)
    }
}

/// Converts a JSON object into [`Params`].
///
/// Anything other than an object yields empty params.
#[must_use]
pub fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

/// Bounds `future` by `timeout`, if one is configured.
pub(crate) async fn with_timeout(
    command: String,
    future: GatewayFuture,
    timeout: Option<Duration>,
) -> GatewayResult<Value> {
    let Some(timeout) = timeout else {
        return future.await;
    };
    tokio::time::timeout(timeout, future)
        .await
        .unwrap_or_else(|_| {
            Err(GatewayError::Timeout {
                command,
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })
        })
}
