// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration management for stack-cache.
//!
//! # Configuration Hierarchy
//!
//! ```text
//! Priority (low → high)
//! 1. defaults
//! 2. stack-cache.toml (cwd, optional)
//! 3. --config FILE (repeatable)
//! 4. STACK_CACHE_* env vars
//! 5. --set section.key=value
//! 6. dedicated CLI flags (--url, --log-level, ...)
//! ```
//!
//! # Environment Variable Mapping
//!
//! ```text
//! STACK_CACHE_GATEWAY__URL=http://host:1/invoke  → gateway.url
//! STACK_CACHE_GATEWAY__TIMEOUT_MS=5000           → gateway.timeout_ms
//! STACK_CACHE_CACHE__KEEP_UNUSED_FOR_MS=0        → cache.keep_unused_for_ms
//! STACK_CACHE_LOG__LEVEL=4                       → log.level
//! ```

pub mod loader;
pub mod types;


use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::logging::LogFormat;
use crate::query::{CacheOptions, EvictionPolicy};

pub use loader::{ConfigLoader, ConfigSource};
pub use types::{CacheConfig, DEFAULT_GATEWAY_URL, GatewayConfig, LogSettings};

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "stack-cache.toml";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "STACK_CACHE";

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub cache: CacheConfig,
    pub log: LogSettings,
}

impl Config {
    /// Create a new configuration builder.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stack_cache::config::Config;
    ///
    /// let config = Config::builder()
    ///     .add_toml_file_optional("stack-cache.toml")
    ///     .with_env_prefix("STACK_CACHE")
    ///     .build()?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    #[must_use]
    pub fn builder() -> ConfigLoader {
        ConfigLoader::new()
    }

    /// Load configuration from a single TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, contains invalid TOML, or
    /// does not match the `Config` structure.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::builder().add_toml_file(path).build()
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid TOML or does not match the
    /// `Config` structure.
    pub fn parse(content: &str) -> Result<Self> {
        Self::builder().add_toml_str(content).build()
    }

    /// Checks values the type system cannot.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.gateway.validate()
    }

    /// Cache options derived from `[cache]` and the gateway timeout.
    #[must_use]
    pub fn cache_options(&self) -> CacheOptions {
        self.cache.to_options(self.gateway.timeout())
    }

    /// Format configuration options for display.
    ///
    /// Output is ordered by key and aligned on `=`.
    #[must_use]
    pub fn format_options(&self) -> Vec<String> {
        let mut options = BTreeMap::new();
        self.format_gateway_options(&mut options);
        self.format_cache_options(&mut options);
        self.format_log_options(&mut options);

        let max_key_len = options.keys().map(String::len).max().unwrap_or(0);

        options
            .into_iter()
            .map(|(key, value)| format!("{key:<max_key_len$} = {value}"))
            .collect()
    }

    fn format_gateway_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert("gateway.url".into(), self.gateway.url.clone());
        options.insert(
            "gateway.timeout_ms".into(),
            self.gateway
                .timeout_ms
                .map_or_else(|| "none".to_string(), |ms| ms.to_string()),
        );
    }

    fn format_cache_options(&self, options: &mut BTreeMap<String, String>) {
        let eviction = match self.cache.eviction() {
            EvictionPolicy::Never => "never".to_string(),
            EvictionPolicy::After(grace) => format!("after {} ms", grace.as_millis()),
        };
        options.insert("cache.eviction".into(), eviction);
        options.insert(
            "cache.abort_on_cancel".into(),
            self.cache.abort_on_cancel.to_string(),
        );
        options.insert(
            "cache.refetch_stale_on_subscribe".into(),
            self.cache.refetch_stale_on_subscribe.to_string(),
        );
    }

    fn format_log_options(&self, options: &mut BTreeMap<String, String>) {
        options.insert("log.level".into(), self.log.level.to_string());
        options.insert("log.file_level".into(), self.log.file_level.to_string());
        options.insert(
            "log.format".into(),
            match self.log.format {
                LogFormat::Text => "text",
                LogFormat::Json => "json",
            }
            .to_string(),
        );
        options.insert(
            "log.file".into(),
            self.log
                .file
                .as_ref()
                .map_or_else(String::new, |p| p.display().to_string()),
        );
    }
}
