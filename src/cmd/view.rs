// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Read-only commands.
//!
//! A missing entity (index out of range, unknown path) yields `null`, not an
//! error.

use anyhow::anyhow;
use serde_json::Value;

use super::{list_to_json, to_json};
use crate::binding::Binding;
use crate::cli::view::{BranchesArgs, ChangesArgs, CommitsArgs, StacksArgs};
use crate::error::{Result, StateError};
use crate::state::ClientState;

/// Waits for the first settled value of `binding`.
async fn settle<T, O>(mut binding: Binding<T, O>) -> Result<O>
where
    T: Send + Sync + 'static,
    O: Clone + PartialEq,
{
    let bound = binding.settled().await.ok_or(StateError::Shutdown)?;
    if let Some(err) = bound.error {
        return Err(StateError::from(err).into());
    }
    bound
        .value
        .ok_or_else(|| anyhow!("query settled without data"))
}

/// Lists stacks, or the stack at `--at`.
///
/// # Errors
///
/// Returns the gateway error of the query.
pub async fn run_stacks_command(args: &StacksArgs, state: &ClientState) -> Result<Value> {
    let project = &args.project.project;
    if let Some(index) = args.at {
        let stack = settle(state.stacks().stack_at(project, index)?).await?;
        return to_json(&stack.as_deref());
    }
    let stacks = settle(state.stacks().stacks(project)?).await?;
    list_to_json(&stacks)
}

/// Lists the active branches of a stack; `--all` includes archived ones.
///
/// # Errors
///
/// Returns the gateway error of the query.
pub async fn run_branches_command(args: &BranchesArgs, state: &ClientState) -> Result<Value> {
    let project = &args.project.project;
    let binding = if args.all {
        state.stacks().all_branches(project, &args.stack)?
    } else {
        state.stacks().branches(project, &args.stack)?
    };
    let branches = settle(binding).await?;
    tracing::debug!(stack = %args.stack, count = branches.len(), "Branches listed");
    list_to_json(&branches)
}

/// Lists local and remote commits of a branch, or upstream-only commits.
///
/// # Errors
///
/// Returns the gateway error of the query.
pub async fn run_commits_command(args: &CommitsArgs, state: &ClientState) -> Result<Value> {
    let project = &args.project.project;
    if args.upstream {
        let commits = settle(state.stacks().upstream_commits(project, &args.stack, &args.branch)?).await?;
        return list_to_json(&commits);
    }
    let commits = settle(state.stacks().commits(project, &args.stack, &args.branch)?).await?;
    list_to_json(&commits)
}

/// Lists the changes of a commit, or the one at `--path`.
///
/// # Errors
///
/// Returns the gateway error of the query.
pub async fn run_changes_command(args: &ChangesArgs, state: &ClientState) -> Result<Value> {
    let project = &args.project.project;
    if let Some(path) = &args.path {
        let change = settle(state.stacks().commit_change(project, &args.commit, path)?).await?;
        return to_json(&change.as_deref());
    }
    let changes = settle(state.stacks().commit_changes(project, &args.commit)?).await?;
    list_to_json(&changes)
}
