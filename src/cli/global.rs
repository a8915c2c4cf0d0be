// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Global CLI options available for all commands.
//!
//! # Option Precedence
//!
//! ```text
//! --config FILE       ← Additional config files (can repeat)
//! --url URL           ← gateway.url override
//! --timeout-ms MS     ← gateway.timeout_ms override
//! --log-level N       ← Console verbosity (0-6)
//! --file-log-level N  ← File verbosity (defaults to --log-level)
//! --log-file FILE     ← log.file override
//! --set KEY=VAL       ← Direct config override
//!
//! Precedence: CLI flags > --set > env > --config > stack-cache.toml > defaults
//! ```

use std::path::PathBuf;

use clap::Args;

/// Global options available for all commands.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalOptions {
    /// Path to additional TOML configuration file(s).
    /// Can be specified multiple times.
    #[arg(short = 'c', long = "config", value_name = "FILE", action = clap::ArgAction::Append)]
    pub configs: Vec<PathBuf>,

    /// Does not load `stack-cache.toml` from the current directory.
    #[arg(long = "no-default-config")]
    pub no_default_config: bool,

    /// Backend endpoint commands are posted to.
    #[arg(short = 'u', long = "url", value_name = "URL")]
    pub url: Option<String>,

    /// Per-request timeout in milliseconds.
    #[arg(long = "timeout-ms", value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_ms: Option<u64>,

    /// Console log level (0=silent, 1=errors, 2=warnings, 3=info, 4=debug, 5=trace, 6=dump).
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = clap::value_parser!(u8).range(0..=6)
    )]
    pub log_level: Option<u8>,

    /// File log level, overrides --log-level for the log file.
    #[arg(long = "file-log-level", value_name = "LEVEL", value_parser = clap::value_parser!(u8).range(0..=6)
    )]
    pub file_log_level: Option<u8>,

    /// Path to log file.
    #[arg(long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Sets an option, such as 'cache.keep_unused_for_ms=0'.
    /// Can be specified multiple times.
    #[arg(short = 's', long = "set", value_name = "OPTION", action = clap::ArgAction::Append)]
    pub options: Vec<String>,
}

impl GlobalOptions {
    /// Converts command-line options to `section.key=value` overrides.
    ///
    /// `--set` entries come first so that dedicated flags win.
    #[must_use]
    pub fn to_config_overrides(&self) -> Vec<String> {
        let mut overrides = self.options.clone();

        if let Some(ref url) = self.url {
            overrides.push(format!("gateway.url={url}"));
        }

        if let Some(ms) = self.timeout_ms {
            overrides.push(format!("gateway.timeout_ms={ms}"));
        }

        if let Some(level) = self.log_level {
            overrides.push(format!("log.level={level}"));
        }

        // file_log_level falls back to log_level if not specified
        if let Some(level) = self.file_log_level.or(self.log_level) {
            overrides.push(format!("log.file_level={level}"));
        }

        if let Some(ref path) = self.log_file {
            overrides.push(format!("log.file={}", path.display()));
        }

        overrides
    }
}
