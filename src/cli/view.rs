// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Read-only commands.

use clap::Args;

/// Project selection shared by every command.
#[derive(Debug, Clone, Args)]
pub struct ProjectArgs {
    /// Project id.
    #[arg(short = 'p', long = "project", value_name = "ID")]
    pub project: String,
}

#[derive(Debug, Clone, Args)]
pub struct StacksArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Only print the stack at this position.
    #[arg(long = "at", value_name = "INDEX")]
    pub at: Option<usize>,
}

#[derive(Debug, Clone, Args)]
pub struct BranchesArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Stack id.
    #[arg(value_name = "STACK")]
    pub stack: String,

    /// Include archived branches.
    #[arg(short = 'a', long)]
    pub all: bool,
}

#[derive(Debug, Clone, Args)]
pub struct CommitsArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Stack id.
    #[arg(value_name = "STACK")]
    pub stack: String,

    /// Branch name.
    #[arg(value_name = "BRANCH")]
    pub branch: String,

    /// List commits that only exist upstream.
    #[arg(long)]
    pub upstream: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ChangesArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Commit id.
    #[arg(value_name = "COMMIT")]
    pub commit: String,

    /// Only print the change of this path.
    #[arg(long, value_name = "PATH")]
    pub path: Option<String>,
}
