// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Integration tests for CLI parsing.
//!
//! Tests the CLI module with realistic command-line argument patterns and the
//! configuration the global options produce.

use clap::Parser;
use stack_cache::cli::{Cli, Command};
use stack_cache::config::ConfigLoader;
use stack_cache::logging::LogLevel;

fn config_from(cli: &Cli) -> stack_cache::config::Config {
    let mut loader = ConfigLoader::new();
    for assignment in cli.global.to_config_overrides() {
        loader = loader.set_assignment(&assignment).unwrap();
    }
    loader.build().unwrap()
}

// =============================================================================
// Global options
// =============================================================================

#[test]
fn cli_flags_reach_config() {
    let cli = Cli::try_parse_from([
        "stack-cache",
        "--url",
        "https://backend.example/invoke",
        "--timeout-ms",
        "1500",
        "-l",
        "3",
        "--set",
        "cache.evict_unused=false",
        "options",
    ])
    .unwrap();

    let config = config_from(&cli);
    assert_eq!(config.gateway.url, "https://backend.example/invoke");
    assert_eq!(config.gateway.timeout_ms, Some(1500));
    assert_eq!(config.log.level, LogLevel::INFO);
    assert_eq!(config.log.file_level, LogLevel::INFO);
    assert!(!config.cache.evict_unused);
}

#[test]
fn cli_dedicated_flag_beats_set() {
    let cli = Cli::try_parse_from([
        "stack-cache",
        "--set",
        "gateway.url=http://from-set/invoke",
        "--url",
        "http://from-flag/invoke",
        "options",
    ])
    .unwrap();

    assert_eq!(config_from(&cli).gateway.url, "http://from-flag/invoke");
}

#[test]
fn cli_zero_timeout_rejected() {
    let result = Cli::try_parse_from(["stack-cache", "--timeout-ms", "0", "options"]);
    assert!(result.is_err());
}

#[test]
fn cli_repeated_config_files() {
    let cli = Cli::try_parse_from(["stack-cache", "-c", "a.toml", "-c", "b.toml", "configs"]).unwrap();
    assert_eq!(cli.global.configs.len(), 2);
    assert!(matches!(cli.command, Some(Command::Configs)));
}

// =============================================================================
// Commands
// =============================================================================

#[test]
fn cli_changes_with_path() {
    let cli = Cli::try_parse_from(["stack-cache", "changes", "-p", "p1", "abc123", "--path", "src/lib.rs"])
        .unwrap();
    let Some(Command::Changes(args)) = cli.command else {
        panic!("expected changes");
    };
    assert_eq!(args.commit, "abc123");
    assert_eq!(args.path.as_deref(), Some("src/lib.rs"));
}

#[test]
fn cli_reword_requires_message() {
    let result = Cli::try_parse_from(["stack-cache", "reword", "-p", "p1", "s1", "abc"]);
    assert!(result.is_err());

    let cli = Cli::try_parse_from(["stack-cache", "reword", "-p", "p1", "s1", "abc", "-m", "fix typo"])
        .unwrap();
    let Some(Command::Reword(args)) = cli.command else {
        panic!("expected reword");
    };
    assert_eq!(args.message, "fix typo");
}

#[test]
fn cli_no_command() {
    let cli = Cli::try_parse_from(["stack-cache"]).unwrap();
    assert!(cli.command.is_none());
}
