// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! CLI module for stack-cache using clap derive.
//!
//! # Command Structure
//!
//! ```text
//! stack-cache [global options] <command>
//! stacks        -p PROJECT
//! branches      -p PROJECT STACK [--all]
//! commits       -p PROJECT STACK BRANCH [--upstream]
//! changes       -p PROJECT COMMIT [--path PATH]
//! create-stack  -p PROJECT [--name NAME] [--order N]
//! new-branch    -p PROJECT STACK NAME
//! reword        -p PROJECT STACK COMMIT -m MESSAGE
//! uncommit      -p PROJECT STACK COMMIT
//! insert-blank  -p PROJECT STACK COMMIT [--offset N]
//! options | configs | version
//! ```

pub mod edit;
pub mod global;
pub mod view;


use clap::{Parser, Subcommand};

use crate::cli::edit::{CreateStackArgs, InsertBlankArgs, NewBranchArgs, RewordArgs, UncommitArgs};
use crate::cli::global::GlobalOptions;
use crate::cli::view::{BranchesArgs, ChangesArgs, CommitsArgs, StacksArgs};

/// Normalized query cache for stacked branches.
#[derive(Debug, Parser)]
#[command(
    name = "stack-cache",
    author,
    version,
    about = "Query and edit stacked branches through a normalized cache",
    long_about = "stack-cache Copyright (C) 2026 Romeo Ahmed\n\
                  This program comes with ABSOLUTELY NO WARRANTY\n\
                  This is free software, and you are welcome to redistribute it\n\
                  under certain conditions; see LICENSE for details.\n\n\
                  Talks to a version-control backend over HTTP and prints\n\
                  stacks, branches, commits and changes as JSON. Edits go\n\
                  through the same cache, so views refresh after a write.",
    after_help = "CONFIGURATION:\n\n\
                  stack-cache reads `stack-cache.toml` from the current directory\n\
                  if present, then every --config file in order, then\n\
                  STACK_CACHE_SECTION__KEY environment variables, then --set and\n\
                  the dedicated flags. Use --no-default-config to skip the file\n\
                  in the current directory."
)]
pub struct Cli {
    /// Global options shared by all commands
    #[command(flatten)]
    pub global: GlobalOptions,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shows the version.
    Version,

    /// Lists all options and their effective values.
    Options,

    /// Lists the configuration files in use.
    Configs,

    /// Lists the stacks of a project.
    Stacks(StacksArgs),

    /// Lists the branches of a stack.
    Branches(BranchesArgs),

    /// Lists the commits of a branch.
    Commits(CommitsArgs),

    /// Lists the files changed by a commit.
    Changes(ChangesArgs),

    /// Creates a new stack.
    #[command(name = "create-stack")]
    CreateStack(CreateStackArgs),

    /// Adds a branch on top of a stack.
    #[command(name = "new-branch")]
    NewBranch(NewBranchArgs),

    /// Changes the message of a commit.
    Reword(RewordArgs),

    /// Undoes a commit, keeping its changes in the worktree.
    Uncommit(UncommitArgs),

    /// Inserts an empty commit next to another one.
    #[command(name = "insert-blank")]
    InsertBlank(InsertBlankArgs),
}

/// Parses command-line arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

/// Parses command-line arguments from an iterator.
pub fn parse_from<I, T>(iter: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::parse_from(iter)
}

/// Tries to parse command-line arguments, returning an error on failure.
///
/// # Errors
///
/// Returns a `clap::Error` if the arguments are invalid or if help/version information
/// was requested.
pub fn try_parse() -> Result<Cli, clap::Error> {
    Cli::try_parse()
}
