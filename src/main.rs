//! agentbox - command gate and tool runner for autonomous coding agents.
//!
//! Thin binary entry point; subcommands live in `cli`.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Cli::parse();
    initialize_tracing();

    match args.command {
        Commands::Check { command } => cli::handle_check(args.config.as_deref(), &command),
        Commands::Hook { convention } => cli::handle_hook(args.config.as_deref(), convention),
        Commands::Exec {
            root,
            tool,
            arguments,
        } => cli::handle_exec(args.config.as_deref(), &root, &tool, arguments.as_deref()).await,
    }
}

/// Logs go to stderr so stdout stays machine-readable for hook callers.
fn initialize_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
