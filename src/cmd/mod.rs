// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Command implementations.
//!
//! ```text
//! CLI args --> cmd::run_* handlers --> serde_json::Value --> stdout
//!   config (options, configs)
//!   view   (stacks, branches, commits, changes)
//!   edit   (create-stack, new-branch, reword, uncommit, insert-blank)
//! ```
//!
//! View handlers wait for the first settled value of a binding; edit
//! handlers run one mutation.

pub mod config;
pub mod edit;
pub mod view;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// Pretty-prints a handler result.
///
/// # Errors
///
/// Returns an error if `value` cannot be serialized.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Converts entities to a JSON value.
fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Converts a shared entity list to a JSON array.
fn list_to_json<T: Serialize>(list: &[Arc<T>]) -> Result<Value> {
    to_json(&list.iter().map(|entity| &**entity).collect::<Vec<&T>>())
}
