// stack-cache: normalized query cache for stacked branches
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Entry point.
//!
//! ```text
//! cli::parse() --> Config --> Logging --> ClientState --> Command Dispatch
//!   Options | Configs | Version            view | edit handlers
//! ```

use std::process::ExitCode;

use stack_cache::cli::global::GlobalOptions;
use stack_cache::cli::{self, Command};
use stack_cache::cmd::config::{run_configs_command, run_options_command};
use stack_cache::cmd::edit::{
    run_create_stack_command, run_insert_blank_command, run_new_branch_command,
    run_reword_command, run_uncommit_command,
};
use stack_cache::cmd::print_json;
use stack_cache::cmd::view::{
    run_branches_command, run_changes_command, run_commits_command, run_stacks_command,
};
use stack_cache::config::loader::ConfigLoader;
use stack_cache::config::{Config, DEFAULT_CONFIG_FILE, ENV_PREFIX};
use stack_cache::logging::{LogConfig, init_logging};
use stack_cache::state::ClientState;

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::parse();

    let config = match load_config(&cli.global) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match init_logging(&LogConfig::from(&config.log)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    dispatch_command(&cli, &config).await
}

async fn dispatch_command(cli: &cli::Cli, config: &Config) -> ExitCode {
    let result = match &cli.command {
        Some(Command::Version) => {
            handle_version_command();
            Ok(())
        }
        Some(Command::Options) => {
            run_options_command(config);
            Ok(())
        }
        Some(Command::Configs) => build_config_loader(&cli.global).map(|loader| {
            run_configs_command(&loader);
        }),
        Some(command) => run_backend_command(command, config).await,
        None => {
            eprintln!("No command specified. Use --help for usage information.");
            Err(anyhow::anyhow!("No command specified"))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run_backend_command(command: &Command, config: &Config) -> stack_cache::error::Result<()> {
    let state = ClientState::from_config(config)?;
    let output = match command {
        Command::Stacks(args) => run_stacks_command(args, &state).await,
        Command::Branches(args) => run_branches_command(args, &state).await,
        Command::Commits(args) => run_commits_command(args, &state).await,
        Command::Changes(args) => run_changes_command(args, &state).await,
        Command::CreateStack(args) => run_create_stack_command(args, &state).await,
        Command::NewBranch(args) => run_new_branch_command(args, &state).await,
        Command::Reword(args) => run_reword_command(args, &state).await,
        Command::Uncommit(args) => run_uncommit_command(args, &state).await,
        Command::InsertBlank(args) => run_insert_blank_command(args, &state).await,
        Command::Version | Command::Options | Command::Configs => {
            Err(anyhow::anyhow!("not a backend command"))
        }
    };
    state.shutdown();
    print_json(&output?)
}

fn handle_version_command() {
    println!("{}", env!("CARGO_PKG_VERSION"));
}

fn build_config_loader(global: &GlobalOptions) -> stack_cache::error::Result<ConfigLoader> {
    let mut loader = ConfigLoader::new();
    if !global.no_default_config {
        loader = loader.add_toml_file_optional(DEFAULT_CONFIG_FILE);
    }
    for path in &global.configs {
        loader = loader.add_toml_file(path);
    }
    loader = loader.with_env_prefix(ENV_PREFIX);
    for assignment in global.to_config_overrides() {
        loader = loader.set_assignment(&assignment)?;
    }
    Ok(loader)
}

fn load_config(global: &GlobalOptions) -> stack_cache::error::Result<Config> {
    build_config_loader(global)?.build()
}
