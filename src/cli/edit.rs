// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Commands that change the workspace.

use clap::Args;

use crate::cli::view::ProjectArgs;
use crate::model::CreateBranchRequest;

#[derive(Debug, Clone, Args)]
pub struct CreateStackArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Name of the first branch; the backend picks one if omitted.
    #[arg(short = 'n', long, value_name = "NAME")]
    pub name: Option<String>,

    /// Position of the new stack.
    #[arg(long, value_name = "N")]
    pub order: Option<u32>,
}

impl CreateStackArgs {
    #[must_use]
    pub fn to_request(&self) -> CreateBranchRequest {
        CreateBranchRequest {
            name: self.name.clone(),
            ownership: None,
            order: self.order,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct NewBranchArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Stack id.
    #[arg(value_name = "STACK")]
    pub stack: String,

    /// Branch name.
    #[arg(value_name = "NAME")]
    pub name: String,
}

#[derive(Debug, Clone, Args)]
pub struct RewordArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Stack id.
    #[arg(value_name = "STACK")]
    pub stack: String,

    /// Commit id.
    #[arg(value_name = "COMMIT")]
    pub commit: String,

    /// New commit message.
    #[arg(short = 'm', long, value_name = "MESSAGE")]
    pub message: String,
}

#[derive(Debug, Clone, Args)]
pub struct UncommitArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Stack id.
    #[arg(value_name = "STACK")]
    pub stack: String,

    /// Commit id.
    #[arg(value_name = "COMMIT")]
    pub commit: String,
}

#[derive(Debug, Clone, Args)]
pub struct InsertBlankArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Stack id.
    #[arg(value_name = "STACK")]
    pub stack: String,

    /// Commit id.
    #[arg(value_name = "COMMIT")]
    pub commit: String,

    /// Where to insert: -1 below the commit, 1 above it.
    #[arg(long, value_name = "N", default_value_t = -1, allow_hyphen_values = true)]
    pub offset: i32,
}
