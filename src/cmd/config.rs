// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! `options` and `configs`.

use crate::config::{Config, ConfigLoader};

/// Prints every option with its effective value.
pub fn run_options_command(config: &Config) {
    for line in config.format_options() {
        println!("{line}");
    }
}

/// Prints the configuration sources in load order.
pub fn run_configs_command(loader: &ConfigLoader) {
    let lines = loader.format_loaded_files();
    if lines.is_empty() {
        println!("No configuration files; using defaults");
    }
    for line in lines {
        println!("{line}");
    }
}
