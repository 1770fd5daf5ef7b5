use std::sync::Arc;

use serde_json::{Value, json};
use tracing::warn;

use crate::command_safety::CommandValidator;

/// Tool names treated as shell execution, after normalization. Must cover
/// every alias the router maps onto `run_command`.
const SHELL_TOOL_NAMES: &[&str] = &[
    "run_command",
    "bash",
    "shell",
    "exec",
    "run_shell",
    "execute_command",
];

/// Lowercase, with spaces and dashes folded to underscores and quotes or
/// parentheses dropped, as the router does.
fn normalize_tool_name(tool_name: &str) -> String {
    tool_name
        .trim()
        .to_ascii_lowercase()
        .replace([' ', '-'], "_")
        .replace(['(', ')', '\'', '"'], "")
}

pub fn is_shell_tool(tool_name: &str) -> bool {
    SHELL_TOOL_NAMES.contains(&normalize_tool_name(tool_name).as_str())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HookDecision {
    #[default]
    Allow,
    Block,
}

/// Rendering convention expected by the calling framework's pre-tool hook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HookConvention {
    /// `{}` to allow, `{"decision": "block", "reason": ...}` to block.
    #[default]
    DecisionBlock,
    /// `{"hookSpecificOutput": {"permissionDecision": "allow" | "deny", ...}}`.
    PermissionDecision,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookOutcome {
    pub decision: HookDecision,
    pub reason: Option<String>,
}

impl HookOutcome {
    pub fn allow() -> Self {
        Self::default()
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            decision: HookDecision::Block,
            reason: Some(reason.into()),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.decision == HookDecision::Allow
    }

    pub fn render(&self, convention: HookConvention) -> Value {
        match (convention, self.decision) {
            (HookConvention::DecisionBlock, HookDecision::Allow) => json!({}),
            (HookConvention::DecisionBlock, HookDecision::Block) => json!({
                "decision": "block",
                "reason": self.reason.as_deref().unwrap_or("blocked by security policy"),
            }),
            (HookConvention::PermissionDecision, decision) => {
                let mut output = json!({
                    "hookEventName": "PreToolUse",
                    "permissionDecision": match decision {
                        HookDecision::Allow => "allow",
                        HookDecision::Block => "deny",
                    },
                });
                if let Some(reason) = &self.reason {
                    output["permissionDecisionReason"] = json!(reason);
                }
                json!({ "hookSpecificOutput": output })
            }
        }
    }
}

/// Pre-execution hook that gates shell tools through the command validator.
///
/// Every other tool is allowed untouched; the hook never executes anything.
#[derive(Debug, Clone)]
pub struct SecurityHook {
    validator: Arc<CommandValidator>,
}

impl SecurityHook {
    pub fn new(validator: Arc<CommandValidator>) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &CommandValidator {
        &self.validator
    }

    pub fn evaluate(&self, tool_name: &str, tool_input: &Value) -> HookOutcome {
        if !is_shell_tool(tool_name) {
            return HookOutcome::allow();
        }

        match tool_input.get("command").and_then(Value::as_str) {
            Some(command) if !command.trim().is_empty() => self.check_command(command),
            _ => {
                warn!(tool = tool_name, "shell tool call without a command");
                HookOutcome::block("shell tool call is missing a 'command' string")
            }
        }
    }

    /// Validate a command outside of a tool call, e.g. a server start command.
    pub fn check_command(&self, command: &str) -> HookOutcome {
        let decision = self.validator.validate(command);
        if decision.allowed {
            return HookOutcome::allow();
        }
        let reason = decision
            .reason
            .unwrap_or_else(|| "blocked by security policy".to_string());
        warn!(command, reason = %reason, "blocked shell command");
        HookOutcome::block(reason)
    }
}
