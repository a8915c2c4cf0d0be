// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration sections.
//!
//! ```text
//! [gateway]  url, timeout_ms
//! [cache]    evict_unused, keep_unused_for_ms, abort_on_cancel,
//!            refetch_stale_on_subscribe
//! [log]      level, file_level, file, format
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::logging::{LogFormat, LogLevel};
use crate::query::{CacheOptions, EvictionPolicy};

/// Endpoint used when no `[gateway] url` is configured.
pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:6978/invoke";

/// Backend connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    /// URL commands are posted to.
    pub url: String,
    /// Per-request timeout; unset waits indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
            timeout_ms: None,
        }
    }
}

impl GatewayConfig {
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Checks that the URL is usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an empty or non-HTTP URL, or
    /// a zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                section: "gateway".to_string(),
                key: "url".to_string(),
                message: format!("expected an http(s) URL, got '{}'", self.url),
            });
        }
        if self.timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue {
                section: "gateway".to_string(),
                key: "timeout_ms".to_string(),
                message: "timeout must be positive; omit it to wait indefinitely".to_string(),
            });
        }
        Ok(())
    }
}

/// Query cache tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Evict entries without subscribers.
    pub evict_unused: bool,
    /// Grace period before an unused entry is evicted; 0 evicts at once.
    pub keep_unused_for_ms: u64,
    /// Abort the transport call when the last subscriber leaves.
    pub abort_on_cancel: bool,
    /// Refetch stale data when a new subscriber arrives.
    pub refetch_stale_on_subscribe: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            evict_unused: true,
            keep_unused_for_ms: 60_000,
            abort_on_cancel: false,
            refetch_stale_on_subscribe: true,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub const fn eviction(&self) -> EvictionPolicy {
        if self.evict_unused {
            EvictionPolicy::After(Duration::from_millis(self.keep_unused_for_ms))
        } else {
            EvictionPolicy::Never
        }
    }

    /// Cache options for these settings and an optional request timeout.
    #[must_use]
    pub fn to_options(&self, request_timeout: Option<Duration>) -> CacheOptions {
        CacheOptions::builder()
            .with_eviction(self.eviction())
            .maybe_with_request_timeout(request_timeout)
            .with_abort_on_cancel(self.abort_on_cancel)
            .with_refetch_stale_on_subscribe(self.refetch_stale_on_subscribe)
            .build()
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    /// Console log level, 0-6 or a name such as `debug`.
    pub level: LogLevel,
    /// File log level (0-6).
    pub file_level: LogLevel,
    /// Log file; unset disables file logging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Format of the log file.
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::WARN,
            file_level: LogLevel::DEBUG,
            file: None,
            format: LogFormat::Text,
        }
    }
}
