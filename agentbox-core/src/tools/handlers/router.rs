//! Tool routing.
//!
//! The router owns the name → handler map and turns every call into a
//! [`ToolOutput`]:
//! - resolves the handler, normalizing common aliases
//! - validates arguments before anything runs
//! - enforces the handler's timeout
//! - converts any [`ToolCallError`] into an error output

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use super::tool_handler::{ToolCallError, ToolHandler, ToolInvocation, ToolOutput, ToolSpec};

/// Map an alias or loosely formatted name onto a registered tool name.
fn normalize_router_tool_name(tool_name: &str) -> Option<String> {
    let lowered = tool_name.trim().to_ascii_lowercase();
    if lowered.is_empty() {
        return None;
    }

    let normalized = lowered
        .replace([' ', '-'], "_")
        .replace(['(', ')', '\'', '"'], "");

    let mapped = match normalized.as_str() {
        "bash" | "shell" | "exec" | "run_shell" | "execute_command" => "run_command",
        "cat" | "read" | "view_file" => "read_file",
        "read_files" | "read_many_files" => "batch_read_files",
        "write" | "create_file" => "write_file",
        "ls" | "list_dir" | "list_files" => "list_directory",
        "server" | "dev_server" => "manage_server",
        _ => normalized.as_str(),
    };

    if mapped == tool_name {
        None
    } else {
        Some(mapped.to_string())
    }
}

fn suggest_similar_tool_names(
    requested_tool_name: &str,
    handlers: &HashMap<String, Arc<dyn ToolHandler>>,
) -> Vec<String> {
    let requested_lower = requested_tool_name.to_ascii_lowercase();
    let normalized = normalize_router_tool_name(requested_tool_name).unwrap_or_default();

    let mut available: Vec<&String> = handlers.keys().collect();
    available.sort_unstable();

    available
        .into_iter()
        .filter(|candidate| {
            candidate.contains(&requested_lower)
                || requested_lower.contains(candidate.as_str())
                || (!normalized.is_empty()
                    && (candidate.contains(&normalized) || normalized.contains(candidate.as_str())))
        })
        .take(3)
        .cloned()
        .collect()
}

/// Name → handler map.
pub struct ToolRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new(handlers: HashMap<String, Arc<dyn ToolHandler>>) -> Self {
        Self { handlers }
    }

    pub fn handler(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Resolve `tool_name` to its registered name and handler.
    pub fn resolve(&self, tool_name: &str) -> Result<(String, Arc<dyn ToolHandler>), ToolCallError> {
        if let Some(handler) = self.handler(tool_name) {
            return Ok((tool_name.to_string(), handler));
        }

        let normalized_name = normalize_router_tool_name(tool_name);
        if let Some(candidate) = normalized_name.as_deref()
            && let Some(handler) = self.handler(candidate)
        {
            return Ok((candidate.to_string(), handler));
        }

        let suggested = suggest_similar_tool_names(tool_name, &self.handlers);
        let normalized_hint = normalized_name
            .as_deref()
            .filter(|candidate| *candidate != tool_name)
            .map(|candidate| format!(" Normalized as '{candidate}'."))
            .unwrap_or_default();
        let suggestion_hint = if suggested.is_empty() {
            String::new()
        } else {
            format!(" Did you mean: {}?", suggested.join(", "))
        };
        Err(ToolCallError::UnknownTool {
            name: tool_name.to_string(),
            hint: format!("{normalized_hint}{suggestion_hint}"),
        })
    }

    /// Validate and run `invocation` under the handler's timeout.
    pub async fn dispatch(&self, mut invocation: ToolInvocation) -> Result<ToolOutput, ToolCallError> {
        let (name, handler) = self.resolve(&invocation.tool_name)?;
        invocation.tool_name = name;

        handler.validate_arguments(&invocation.arguments)?;

        match handler.timeout(&invocation.context) {
            Some(limit) => {
                let operation = format!("Tool '{}'", invocation.tool_name);
                tokio::time::timeout(limit, handler.handle(invocation))
                    .await
                    .map_err(|_| ToolCallError::Timeout { operation, limit })?
            }
            None => handler.handle(invocation).await,
        }
    }
}

/// Collects handlers and their specs before the router is built.
pub struct ToolRegistryBuilder {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    specs: Vec<ToolSpec>,
}

impl Default for ToolRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistryBuilder {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            specs: Vec::new(),
        }
    }

    /// Register `handler` under the name in its spec.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) -> &mut Self {
        let spec = handler.spec();
        let name = spec.name.clone();
        self.specs.retain(|existing| existing.name != name);
        self.specs.push(spec);
        self.register_handler(name, handler)
    }

    /// Register a handler under an explicit name without advertising a spec.
    pub fn register_handler(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn ToolHandler>,
    ) -> &mut Self {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            warn!("Overwriting handler for tool {name}");
        }
        self.handlers.insert(name, handler);
        self
    }

    pub fn build(self) -> (Vec<ToolSpec>, ToolRegistry) {
        (self.specs, ToolRegistry::new(self.handlers))
    }
}

/// Registry plus the specs advertised to agent backends.
pub struct ToolRouter {
    registry: ToolRegistry,
    specs: Vec<ToolSpec>,
}

impl ToolRouter {
    pub fn from_builder(builder: ToolRegistryBuilder) -> Self {
        let (specs, registry) = builder.build();
        Self { registry, specs }
    }

    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Dispatch a call; failures come back as error outputs, never as `Err`.
    pub async fn dispatch_tool_call(&self, invocation: ToolInvocation) -> ToolOutput {
        match self.registry.dispatch(invocation).await {
            Ok(output) => output,
            Err(error) => Self::failure_response(error),
        }
    }

    pub fn failure_response(error: ToolCallError) -> ToolOutput {
        error.into_output()
    }
}
