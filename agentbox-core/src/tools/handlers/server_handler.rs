//! `manage_server`: start, stop, restart or inspect the tracked dev server.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::tool_handler::{
    JsonSchema, ToolCallError, ToolHandler, ToolInvocation, ToolOutput, ToolSpec, parse_arguments,
};
use crate::context::AgentContext;
use crate::server::StartOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ServerAction {
    Start,
    Stop,
    Restart,
    Status,
}

#[derive(Debug, Deserialize)]
struct ManageServerArgs {
    action: ServerAction,
    #[serde(default)]
    command: Option<String>,
}

/// Render a start attempt; a process that died during the grace period is a
/// failed call carrying its output.
pub(crate) fn start_output(outcome: StartOutcome) -> Result<ToolOutput, ToolCallError> {
    match outcome {
        StartOutcome::Started {
            pid,
            command,
            replaced,
            initial_output,
        } => {
            let pid = pid.map_or_else(|| "unknown".to_string(), |pid| pid.to_string());
            let mut content = String::new();
            if let Some(previous) = replaced {
                content.push_str(&previous.describe());
                content.push('\n');
            }
            content.push_str(&format!(
                "Server started in background (pid {pid}): {command}\n\
                 Use manage_server with action 'status' to check it or 'stop' to end it."
            ));
            let initial_output = initial_output.trim_end();
            if !initial_output.is_empty() {
                content.push_str("\n\nInitial output:\n");
                content.push_str(initial_output);
            }
            Ok(ToolOutput::success(content))
        }
        StartOutcome::Failed {
            command,
            exit_code,
            output,
        } => {
            let status = exit_code.map_or_else(
                || "without an exit code".to_string(),
                |code| format!("with exit code {code}"),
            );
            let output = output.trim_end();
            let output = if output.is_empty() { "(no output)" } else { output };
            Err(ToolCallError::execution(format!(
                "Server failed to start: `{command}` exited {status} during startup.\n{output}"
            )))
        }
    }
}

pub struct ManageServerHandler;

impl ManageServerHandler {
    fn ensure_allowed(context: &AgentContext, command: &str) -> Result<(), ToolCallError> {
        let outcome = context.hook().check_command(command);
        if outcome.is_allowed() {
            Ok(())
        } else {
            Err(ToolCallError::Blocked(outcome.reason.unwrap_or_default()))
        }
    }
}

#[async_trait]
impl ToolHandler for ManageServerHandler {
    fn spec(&self) -> ToolSpec {
        let mut properties = BTreeMap::new();
        properties.insert(
            "action".to_string(),
            JsonSchema::string_enum(
                "What to do with the dev server",
                &["start", "stop", "restart", "status"],
            ),
        );
        properties.insert(
            "command".to_string(),
            JsonSchema::string(
                "Server command for start/restart (defaults to the last command, then 'npm run dev')",
            ),
        );
        ToolSpec::new(
            "manage_server",
            "Manage the single background dev server tracked for this session.",
        )
        .with_parameters(JsonSchema::object(properties, vec!["action"]))
    }

    fn validate_arguments(&self, arguments: &Value) -> Result<(), ToolCallError> {
        parse_arguments::<ManageServerArgs>(arguments).map(|_| ())
    }

    async fn handle(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolCallError> {
        let args: ManageServerArgs = parse_arguments(&invocation.arguments)?;
        let context = &invocation.context;
        let processes = context.processes();
        let command = args
            .command
            .as_deref()
            .map(str::trim)
            .filter(|command| !command.is_empty());

        match args.action {
            ServerAction::Start => {
                let command = command.unwrap_or(&context.config().server.default_command);
                Self::ensure_allowed(context, command)?;
                start_output(processes.start(command).await?)
            }
            ServerAction::Restart => {
                let command = match command {
                    Some(command) => command.to_string(),
                    None => processes
                        .last_command()
                        .await
                        .unwrap_or_else(|| context.config().server.default_command.clone()),
                };
                Self::ensure_allowed(context, &command)?;
                start_output(processes.restart(Some(&command)).await?)
            }
            ServerAction::Stop => Ok(ToolOutput::success(processes.stop().await.describe())),
            ServerAction::Status => Ok(ToolOutput::success(processes.status().await.describe())),
        }
    }
}
