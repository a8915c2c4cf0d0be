// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Configuration loading from multiple sources.
//!
//! # Loader Pipeline
//!
//! ```text
//! ConfigLoader::new()
//!   .add_toml_file(req)
//!   .add_toml_file_optional(opt)
//!   .add_toml_str()
//!   .with_env_prefix()
//!   .set() / .set_assignment("section.key=value")
//!        |
//!        v
//!    build() --> Config (validated)
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::Config;
use crate::error::{ConfigError, Result};

/// A configuration file or string added to a [`ConfigLoader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `--config` file; missing is an error.
    File(PathBuf),
    /// Default file that was present when added.
    Optional(PathBuf),
    /// Inline TOML.
    Inline,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "[file] {}", path.display()),
            Self::Optional(path) => write!(f, "[optional] {}", path.display()),
            Self::Inline => f.write_str("[string] <inline>"),
        }
    }
}

/// Builder for loading configuration from multiple sources.
pub struct ConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env_prefix: Option<String>,
    sources: Vec<ConfigSource>,
}

impl std::fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("env_prefix", &self.env_prefix)
            .field("sources", &self.sources)
            .finish_non_exhaustive()
    }
}

impl ConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            builder: config::Config::builder(),
            env_prefix: None,
            sources: Vec::new(),
        }
    }

    /// Adds a TOML configuration file to the loader.
    ///
    /// The file will be read when `build()` is called. If the file doesn't exist
    /// or contains invalid TOML, `build()` will return an error.
    #[must_use]
    pub fn add_toml_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        use config::{File, FileFormat};
        let p = path.as_ref();
        self.builder = self
            .builder
            .add_source(File::from(p).format(FileFormat::Toml).required(true));
        self.sources.push(ConfigSource::File(p.to_path_buf()));
        self
    }

    #[must_use]
    pub fn add_toml_file_optional<P: AsRef<Path>>(mut self, path: P) -> Self {
        use config::{File, FileFormat};
        let p = path.as_ref();
        self.builder = self
            .builder
            .add_source(File::from(p).format(FileFormat::Toml).required(false));
        if p.exists() {
            self.sources.push(ConfigSource::Optional(p.to_path_buf()));
        }
        self
    }

    #[must_use]
    pub fn add_toml_str(mut self, content: &str) -> Self {
        use config::{File, FileFormat};
        self.builder = self
            .builder
            .add_source(File::from_str(content, FileFormat::Toml));
        self.sources.push(ConfigSource::Inline);
        self
    }

    /// Reads `PREFIX_SECTION__KEY` environment variables.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self
    }

    /// Sets a configuration override.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or if the value cannot be converted
    /// to a configuration value.
    pub fn set<T: Into<config::Value>>(mut self, key: &str, value: T) -> Result<Self> {
        self.builder = self
            .builder
            .set_override(key, value)
            .map_err(|e| anyhow::anyhow!("Config error: {e}"))?;
        Ok(self)
    }

    /// Applies a `section.key=value` override as given on the command line.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` if the assignment is malformed.
    pub fn set_assignment(self, assignment: &str) -> Result<Self> {
        let (key, value) = parse_assignment(assignment)?;
        self.set(key, value)
    }

    /// Builds the configuration from all added sources.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required configuration files are missing.
    /// - Configuration files have invalid TOML syntax.
    /// - Environment variables cannot be parsed.
    /// - The merged configuration cannot be deserialized into the `Config` struct.
    /// - A value fails validation.
    pub fn build(self) -> Result<Config> {
        let builder = match &self.env_prefix {
            Some(prefix) => self.builder.add_source(
                config::Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            ),
            None => self.builder,
        };
        let cfg = builder.build().context("failed to read configuration")?;
        let config: Config = cfg
            .try_deserialize()
            .context("invalid configuration")?;
        config.validate()?;
        tracing::debug!(sources = self.sources.len(), url = %config.gateway.url, "Configuration loaded");
        Ok(config)
    }

    /// Sources in the order they were added; later ones win.
    #[must_use]
    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    #[must_use]
    pub fn format_loaded_files(&self) -> Vec<String> {
        self.sources
            .iter()
            .enumerate()
            .map(|(i, source)| format!("{}. {source}", i + 1))
            .collect()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits `section.key=value` into key and value.
///
/// # Errors
///
/// Returns `ConfigError::ParseError` if there is no `=`, the key is empty, or
/// the key has no section.
pub fn parse_assignment(assignment: &str) -> std::result::Result<(&str, &str), ConfigError> {
    let malformed = |message: &str| ConfigError::ParseError {
        source_name: "--set".to_string(),
        message: format!("{message}: '{assignment}'"),
    };
    let (key, value) = assignment
        .split_once('=')
        .ok_or_else(|| malformed("expected section.key=value"))?;
    let key = key.trim();
    match key.split_once('.') {
        Some((section, name)) if !section.is_empty() && !name.is_empty() => {
            Ok((key, value.trim()))
        }
        _ => Err(malformed("key must name a section and a key")),
    }
}
