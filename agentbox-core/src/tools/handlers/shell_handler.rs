//! `run_command`: validated shell execution.
//!
//! Commands run through the security hook first. Accepted commands are then
//! classified: dev servers go to the lifecycle manager, everything else runs
//! to completion under the command timeout.

use std::collections::BTreeMap;

use agentbox_bash_runner::{CommandStatus, ShellRequest, run_shell_command};
use agentbox_commons::ErrorCategory;
use agentbox_config::ExecutionMode;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::server_handler::start_output;
use super::tool_handler::{
    JsonSchema, ToolCallError, ToolHandler, ToolInvocation, ToolOutput, ToolSpec, parse_arguments,
};
use crate::context::AgentContext;

const TOOL_NAME: &str = "run_command";

#[derive(Debug, Deserialize)]
struct RunCommandArgs {
    command: String,
}

pub struct RunCommandHandler;

impl RunCommandHandler {
    async fn run_blocking(
        context: &AgentContext,
        command: &str,
    ) -> Result<ToolOutput, ToolCallError> {
        let config = context.config();
        let request = ShellRequest::new(command, context.project_root())
            .with_timeout(config.timeouts.command_timeout())
            .with_max_output_bytes(config.limits.command_output_max_bytes);
        let output = run_shell_command(&request).await?;

        let exit_code = match output.status {
            CommandStatus::TimedOut => {
                return Err(ToolCallError::Timeout {
                    operation: format!("Command `{command}`"),
                    limit: request.timeout,
                });
            }
            CommandStatus::Exited(code) => code,
        };

        let mut content = output.output.trim_end().to_string();
        if output.truncated {
            content.push_str(&format!(
                "\n... (output truncated after {} bytes)",
                request.max_output_bytes
            ));
        }
        if exit_code != 0 {
            if !content.is_empty() {
                content.push('\n');
            }
            content.push_str(&format!("[exit code: {exit_code}]"));
        }
        if content.is_empty() {
            content = "(no output)".to_string();
        }

        if exit_code == 0 {
            Ok(ToolOutput::success(content))
        } else {
            Ok(ToolOutput::error(ErrorCategory::ExecutionError, content))
        }
    }
}

#[async_trait]
impl ToolHandler for RunCommandHandler {
    fn spec(&self) -> ToolSpec {
        let mut properties = BTreeMap::new();
        properties.insert(
            "command".to_string(),
            JsonSchema::string("Shell command to run from the project root"),
        );
        ToolSpec::new(
            TOOL_NAME,
            "Run an allowlisted shell command in the project root. Dev servers \
             (npm run dev, npx vite, ...) are started in the background and \
             tracked; use manage_server to stop or inspect them.",
        )
        .with_parameters(JsonSchema::object(properties, vec!["command"]))
    }

    fn validate_arguments(&self, arguments: &Value) -> Result<(), ToolCallError> {
        let args: RunCommandArgs = parse_arguments(arguments)?;
        if args.command.trim().is_empty() {
            return Err(ToolCallError::invalid("'command' must not be empty"));
        }
        Ok(())
    }

    async fn handle(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolCallError> {
        let context = &invocation.context;
        // Evaluated under the canonical name so aliases cannot skip the hook.
        let outcome = context.hook().evaluate(TOOL_NAME, &invocation.arguments);
        if !outcome.is_allowed() {
            return Err(ToolCallError::Blocked(outcome.reason.unwrap_or_default()));
        }

        let args: RunCommandArgs = parse_arguments(&invocation.arguments)?;
        let command = args.command.trim();

        match context.classifier().classify(command) {
            ExecutionMode::Background => {
                debug!(command, "starting command in background");
                let outcome = context.processes().start(command).await?;
                start_output(outcome)
            }
            ExecutionMode::Blocking => Self::run_blocking(context, command).await,
        }
    }
}
