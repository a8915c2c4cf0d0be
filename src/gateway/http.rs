// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! HTTP transport for the command gateway.
//!
//! ```text
//! POST <url>  {"command": "stacks", "params": {"projectId": "p1"}}
//!        |
//!   2xx          -> body is the result (empty body -> null)
//!   400/404/422  -> InvalidParams / UnknownCommand
//!   other        -> Rejected
//!   connect err  -> Unreachable
//!   timeout      -> Timeout
//!
//! Global client: OnceLock, connection pool, keep-alive
//! ```

use std::sync::OnceLock;
use std::time::Duration;

use futures_util::FutureExt;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use super::{CommandGateway, GatewayFuture, Params};
use crate::error::GatewayError;

/// Global HTTP client - initialized once, reused across all gateways.
/// Falls back to a basic client if custom configuration fails.
fn global_client() -> &'static Client {
    static CLIENT: OnceLock<Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        Client::builder()
            .user_agent(format!("stack-cache/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new())
    })
}

/// Gateway posting commands to a backend over HTTP.
///
/// # Example
/// ```ignore
/// use stack_cache::gateway::{CommandGateway, HttpGateway, params};
///
/// let gateway = HttpGateway::new("http://127.0.0.1:6978/invoke");
/// let stacks = gateway
///     .invoke("stacks", params(serde_json::json!({ "projectId": "p1" })))
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    url: String,
    timeout: Option<Duration>,
}

impl HttpGateway {
    /// Create a gateway for the given endpoint.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: global_client().clone(),
            url: url.into(),
            timeout: None,
        }
    }

    /// Set a per-request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl CommandGateway for HttpGateway {
    fn invoke(&self, command: &str, params: Params) -> GatewayFuture {
        let mut request = self
            .client
            .post(&self.url)
            .json(&json!({ "command": command, "params": params }));
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        let command = command.to_string();
        let timeout = self.timeout;

        async move {
            let response = request
                .send()
                .await
                .map_err(|e| transport_error(&command, &e, timeout))?;
            let status = response.status();
            let body = response
                .bytes()
                .await
                .map_err(|e| transport_error(&command, &e, timeout))?;

            if !status.is_success() {
                return Err(status_error(&command, status, &body));
            }
            if body.is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_slice(&body).map_err(|e| GatewayError::decode(&command, &e))
        }
        .boxed()
    }
}

fn transport_error(command: &str, err: &reqwest::Error, timeout: Option<Duration>) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout {
            command: command.to_string(),
            timeout_ms: timeout
                .and_then(|t| u64::try_from(t.as_millis()).ok())
                .unwrap_or(0),
        }
    } else {
        GatewayError::Unreachable {
            command: command.to_string(),
            message: err.to_string(),
        }
    }
}

fn status_error(command: &str, status: StatusCode, body: &[u8]) -> GatewayError {
    let command = command.to_string();
    let message = error_message(status, body);
    match status {
        StatusCode::NOT_FOUND => GatewayError::UnknownCommand { command },
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            GatewayError::InvalidParams { command, message }
        }
        _ => GatewayError::Rejected { command, message },
    }
}

/// Prefers the `message` field of a JSON error body over the raw text.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    let parsed = serde_json::from_slice::<Value>(body).ok();
    if let Some(message) = parsed
        .as_ref()
        .and_then(|value| value.get("message"))
        .and_then(Value::as_str)
    {
        return message.to_string();
    }

    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        format!("http status {}", status.as_u16())
    } else {
        text
    }
}
