// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Commands that change the workspace.

use serde_json::{Value, json};

use super::to_json;
use crate::cli::edit::{CreateStackArgs, InsertBlankArgs, NewBranchArgs, RewordArgs, UncommitArgs};
use crate::error::Result;
use crate::state::ClientState;

/// Creates a stack and prints it.
///
/// # Errors
///
/// Returns the gateway error of the mutation.
pub async fn run_create_stack_command(args: &CreateStackArgs, state: &ClientState) -> Result<Value> {
    let stack = state
        .stacks()
        .new_stack(&args.project.project, &args.to_request())
        .await?;
    to_json(&stack)
}

/// # Errors
///
/// Returns the gateway error of the mutation.
pub async fn run_new_branch_command(args: &NewBranchArgs, state: &ClientState) -> Result<Value> {
    state
        .stacks()
        .new_branch(&args.project.project, &args.stack, &args.name)
        .await?;
    Ok(json!({ "stack": args.stack, "branch": args.name }))
}

/// # Errors
///
/// Returns the gateway error of the mutation.
pub async fn run_reword_command(args: &RewordArgs, state: &ClientState) -> Result<Value> {
    state
        .stacks()
        .update_commit_message(&args.project.project, &args.stack, &args.commit, &args.message)
        .await?;
    Ok(json!({ "commit": args.commit, "message": args.message }))
}

/// # Errors
///
/// Returns the gateway error of the mutation.
pub async fn run_uncommit_command(args: &UncommitArgs, state: &ClientState) -> Result<Value> {
    state
        .stacks()
        .uncommit(&args.project.project, &args.stack, &args.commit)
        .await?;
    Ok(json!({ "uncommitted": args.commit }))
}

/// # Errors
///
/// Returns the gateway error of the mutation.
pub async fn run_insert_blank_command(args: &InsertBlankArgs, state: &ClientState) -> Result<Value> {
    state
        .stacks()
        .insert_blank_commit(&args.project.project, &args.stack, &args.commit, args.offset)
        .await?;
    Ok(json!({ "commit": args.commit, "offset": args.offset }))
}
