//! Core of the agent action sandbox.
//!
//! Every action an agent takes goes through [`ToolDispatcher`]: file access
//! is confined to the project root, shell commands are checked against the
//! allowlist and per-program argument rules before they run, and dev
//! servers are tracked by a single [`ProcessLifecycleManager`].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use agentbox_config::SandboxConfig;
//! use agentbox_core::{AgentContext, ToolDispatcher};
//! use serde_json::json;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let context = AgentContext::new(".", SandboxConfig::default())?;
//! let dispatcher = ToolDispatcher::new(Arc::new(context));
//! let output = dispatcher
//!     .execute("run_command", json!({ "command": "ls -la" }))
//!     .await;
//! println!("{}", output.content);
//! # Ok(())
//! # }
//! ```

pub mod command_safety;
pub mod context;
pub mod hooks;
pub mod server;
pub mod tools;

pub use command_safety::{
    AllowedCommandSet, CommandValidator, PolicyViolation, ValidationDecision, validate_command,
};
pub use context::AgentContext;
pub use hooks::{HookConvention, HookDecision, HookOutcome, SecurityHook};
pub use server::{ProcessLifecycleManager, ServerStatus, StartOutcome, StopOutcome};
pub use tools::{
    BrowserDriver, ToolCallRecord, ToolDispatcher, ToolHandler, ToolOutput, ToolSpec, ToolStatus,
};
