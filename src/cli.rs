use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use agentbox_config::{ConfigManager, SandboxConfig};
use agentbox_core::{
    AgentContext, CommandValidator, HookConvention, HookOutcome, SecurityHook, ToolDispatcher,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

/// Exit status of `check` for a rejected command.
const EXIT_BLOCKED: u8 = 2;

#[derive(Parser)]
#[command(name = "agentbox")]
#[command(about = "Validate and run agent tool calls inside a project sandbox")]
#[command(version)]
pub struct Cli {
    /// Explicit configuration file (defaults to ./agentbox.toml or $AGENTBOX_CONFIG_PATH)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a shell command against the allowlist and argument rules
    Check {
        /// Command line to check; multiple words are joined with spaces
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Pre-tool-use hook: read `{tool_name, tool_input}` JSON from stdin
    Hook {
        /// Output shape expected by the calling agent
        #[arg(long, value_enum, default_value_t = ConventionArg::Decision)]
        convention: ConventionArg,
    },
    /// Dispatch a single tool call and print the result as JSON
    Exec {
        /// Project root the call is confined to
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Tool name, e.g. read_file or run_command
        tool: String,
        /// Tool arguments as a JSON object
        arguments: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConventionArg {
    /// `{}` or `{"decision": "block", "reason": ...}`
    Decision,
    /// `{"hookSpecificOutput": {"permissionDecision": ...}}`
    Permission,
}

impl From<ConventionArg> for HookConvention {
    fn from(value: ConventionArg) -> Self {
        match value {
            ConventionArg::Decision => HookConvention::DecisionBlock,
            ConventionArg::Permission => HookConvention::PermissionDecision,
        }
    }
}

#[derive(Debug, Deserialize)]
struct HookPayload {
    tool_name: String,
    #[serde(default)]
    tool_input: Value,
}

fn load_config(explicit: Option<&Path>, workspace: &Path) -> Result<SandboxConfig> {
    let manager = match explicit {
        Some(path) => ConfigManager::load_from_file(path)?,
        None => ConfigManager::load_from_workspace(workspace)?,
    };
    if let Some(path) = manager.config_path() {
        debug!(path = %path.display(), "loaded configuration");
    }
    Ok(manager.into_config())
}

fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().context("failed to determine the current directory")
}

pub fn handle_check(config: Option<&Path>, command: &[String]) -> Result<ExitCode> {
    let config = load_config(config, &current_dir()?)?;
    let validator = CommandValidator::from_config(&config.commands);
    let decision = validator.validate(&command.join(" "));

    if decision.allowed {
        println!("allowed");
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "blocked: {}",
            decision.reason.as_deref().unwrap_or("blocked by security policy")
        );
        Ok(ExitCode::from(EXIT_BLOCKED))
    }
}

pub fn handle_hook(config: Option<&Path>, convention: ConventionArg) -> Result<ExitCode> {
    let config = load_config(config, &current_dir()?)?;
    let hook = SecurityHook::new(Arc::new(CommandValidator::from_config(&config.commands)));

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read hook payload from stdin")?;

    // A payload we cannot read is treated as a blocked call.
    let outcome = match serde_json::from_str::<HookPayload>(&input) {
        Ok(payload) => hook.evaluate(&payload.tool_name, &payload.tool_input),
        Err(error) => HookOutcome::block(format!("invalid hook payload: {error}")),
    };
    println!("{}", outcome.render(convention.into()));
    Ok(ExitCode::SUCCESS)
}

pub async fn handle_exec(
    config: Option<&Path>,
    root: &Path,
    tool: &str,
    arguments: Option<&str>,
) -> Result<ExitCode> {
    let arguments: Value = match arguments {
        Some(raw) => serde_json::from_str(raw).context("tool arguments must be valid JSON")?,
        None => json!({}),
    };
    let config = load_config(config, root)?;
    let context = Arc::new(AgentContext::new(root, config)?);
    let dispatcher = ToolDispatcher::new(Arc::clone(&context));

    let output = dispatcher.execute(tool, arguments).await;
    // The process ends here, so any server this call started goes with it.
    context.shutdown().await;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(if output.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
