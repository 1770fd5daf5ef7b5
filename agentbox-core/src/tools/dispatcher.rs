use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::info;

use super::handlers::browser_handler::{BrowserAction, BrowserHandler};
use super::handlers::file_handlers::{
    BatchReadFilesHandler, ListDirectoryHandler, ReadFileHandler, WriteFileHandler,
};
use super::handlers::router::{ToolRegistryBuilder, ToolRouter};
use super::handlers::server_handler::ManageServerHandler;
use super::handlers::shell_handler::RunCommandHandler;
use super::handlers::tool_handler::{ToolInvocation, ToolOutput, ToolSpec};
use super::record::ToolCallRecord;
use crate::context::AgentContext;

/// Builder pre-populated with every built-in tool.
pub fn default_registry() -> ToolRegistryBuilder {
    let mut builder = ToolRegistryBuilder::new();
    builder
        .register(Arc::new(ReadFileHandler))
        .register(Arc::new(BatchReadFilesHandler))
        .register(Arc::new(WriteFileHandler))
        .register(Arc::new(ListDirectoryHandler))
        .register(Arc::new(RunCommandHandler))
        .register(Arc::new(ManageServerHandler));
    for action in BrowserAction::ALL {
        builder.register(Arc::new(BrowserHandler::new(action)));
    }
    builder
}

/// Entry point for tool calls from an agent.
///
/// Never fails: unknown tools, bad arguments, policy rejections, I/O errors
/// and timeouts all come back as a [`ToolOutput`] with an error status.
pub struct ToolDispatcher {
    context: Arc<AgentContext>,
    router: ToolRouter,
}

impl ToolDispatcher {
    pub fn new(context: Arc<AgentContext>) -> Self {
        Self::with_registry(context, default_registry())
    }

    /// Use a custom registry, e.g. [`default_registry`] plus extra handlers.
    pub fn with_registry(context: Arc<AgentContext>, builder: ToolRegistryBuilder) -> Self {
        Self {
            context,
            router: ToolRouter::from_builder(builder),
        }
    }

    pub fn context(&self) -> &Arc<AgentContext> {
        &self.context
    }

    pub fn specs(&self) -> &[ToolSpec] {
        self.router.specs()
    }

    pub async fn execute(&self, tool_name: &str, arguments: Value) -> ToolOutput {
        self.execute_recorded(tool_name, arguments).await.0
    }

    /// Like [`execute`](Self::execute), also returning a bounded record of
    /// the call.
    pub async fn execute_recorded(
        &self,
        tool_name: &str,
        arguments: Value,
    ) -> (ToolOutput, ToolCallRecord) {
        let started = Instant::now();
        let invocation = ToolInvocation {
            tool_name: tool_name.to_string(),
            arguments: arguments.clone(),
            context: Arc::clone(&self.context),
        };
        let output = self.router.dispatch_tool_call(invocation).await;
        let duration = started.elapsed();

        info!(
            tool = tool_name,
            duration_ms = duration.as_millis() as u64,
            is_error = output.is_error(),
            category = output.category().map(|category| category.as_str()),
            "tool call finished"
        );

        let record = ToolCallRecord::new(
            tool_name,
            arguments,
            &output,
            duration,
            self.context.config().limits.record_output_max_chars,
        );
        (output, record)
    }
}
