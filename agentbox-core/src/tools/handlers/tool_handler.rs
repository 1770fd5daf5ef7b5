//! Handler trait and result types shared by every tool.
//!
//! - `ToolHandler` validates arguments, declares an optional timeout and
//!   executes a call
//! - `ToolOutput` carries content plus a status; error classification reads
//!   only the status
//! - `ToolCallError` is what handlers return on failure; the router turns it
//!   into a `ToolOutput`
//! - `ToolSpec`/`JsonSchema` describe tools to agent backends

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use agentbox_commons::{ErrorCategory, PathError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::AgentContext;

/// Outcome status of a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "category", rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    /// The requested file or directory does not exist.
    NotFound,
    Error(ErrorCategory),
}

/// Structured result of a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolOutput {
    pub content: String,
    pub status: ToolStatus,
}

impl ToolOutput {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status: ToolStatus::Success,
        }
    }

    pub fn not_found(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status: ToolStatus::NotFound,
        }
    }

    pub fn error(category: ErrorCategory, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status: ToolStatus::Error(category),
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self.status, ToolStatus::Success)
    }

    pub fn category(&self) -> Option<ErrorCategory> {
        match self.status {
            ToolStatus::Success => None,
            ToolStatus::NotFound => Some(ErrorCategory::ResourceNotFound),
            ToolStatus::Error(category) => Some(category),
        }
    }
}

/// Failure of a tool call.
#[derive(Debug, thiserror::Error)]
pub enum ToolCallError {
    #[error("Command blocked: {0}")]
    Blocked(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Unknown tool: {name}.{hint}")]
    UnknownTool { name: String, hint: String },

    #[error("{operation} timed out after {}", describe_duration(*.limit))]
    Timeout { operation: String, limit: Duration },

    #[error("{0} is not available")]
    Unavailable(String),

    #[error("{0}")]
    Execution(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ToolCallError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArguments(message.into())
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Blocked(_) => ErrorCategory::PolicyViolation,
            Self::AccessDenied(_) => ErrorCategory::AccessDenied,
            Self::NotFound(_) => ErrorCategory::ResourceNotFound,
            Self::InvalidArguments(_) => ErrorCategory::InvalidParameters,
            Self::UnknownTool { .. } => ErrorCategory::ToolNotFound,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Unavailable(_) => ErrorCategory::Unavailable,
            Self::Execution(_) | Self::Internal(_) => ErrorCategory::ExecutionError,
        }
    }

    /// Model-facing result for this failure.
    pub fn into_output(self) -> ToolOutput {
        let category = self.category();
        let mut content = format!("Error: {self:#}");
        if let Some(hint) = category.recovery_hint() {
            content.push_str("\nHint: ");
            content.push_str(hint);
        }
        match self {
            Self::NotFound(_) => ToolOutput::not_found(content),
            _ => ToolOutput::error(category, content),
        }
    }
}

impl From<PathError> for ToolCallError {
    fn from(error: PathError) -> Self {
        match error {
            PathError::Empty => Self::InvalidArguments(error.to_string()),
            PathError::OutsideRoot { .. } => Self::AccessDenied(error.to_string()),
            PathError::Io { .. } => Self::Execution(error.to_string()),
        }
    }
}

/// `60 seconds`, `1.5 seconds` or `250ms`.
pub fn describe_duration(duration: Duration) -> String {
    if duration < Duration::from_secs(1) {
        format!("{}ms", duration.as_millis())
    } else if duration.subsec_millis() == 0 {
        format!("{} seconds", duration.as_secs())
    } else {
        format!("{:.1} seconds", duration.as_secs_f64())
    }
}

/// Deserialize tool arguments, mapping serde errors to `InvalidArguments`.
pub fn parse_arguments<T: DeserializeOwned>(arguments: &Value) -> Result<T, ToolCallError> {
    serde_json::from_value(arguments.clone()).map_err(|err| ToolCallError::invalid(err.to_string()))
}

/// A single call routed to a handler.
#[derive(Clone)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub arguments: Value,
    pub context: Arc<AgentContext>,
}

/// A tool the dispatcher can route calls to.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn spec(&self) -> ToolSpec;

    /// Reject malformed arguments before any side effect.
    fn validate_arguments(&self, _arguments: &Value) -> Result<(), ToolCallError> {
        Ok(())
    }

    /// Bound the router enforces around [`handle`](Self::handle). `None`
    /// means the handler bounds its own work.
    fn timeout(&self, _context: &AgentContext) -> Option<Duration> {
        None
    }

    async fn handle(&self, invocation: ToolInvocation) -> Result<ToolOutput, ToolCallError>;
}

/// Tool definition advertised to agent backends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: JsonSchema,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: JsonSchema::object(BTreeMap::new(), Vec::new()),
        }
    }

    pub fn with_parameters(mut self, parameters: JsonSchema) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Subset of JSON Schema used for tool parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JsonSchema {
    Object {
        #[serde(default)]
        properties: BTreeMap<String, JsonSchema>,
        #[serde(skip_serializing_if = "Option::is_none")]
        required: Option<Vec<String>>,
        #[serde(
            rename = "additionalProperties",
            skip_serializing_if = "Option::is_none"
        )]
        additional_properties: Option<bool>,
    },
    String {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
        allowed_values: Option<Vec<String>>,
    },
    Integer {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Boolean {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Array {
        items: Box<JsonSchema>,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl JsonSchema {
    pub fn object(properties: BTreeMap<String, JsonSchema>, required: Vec<&str>) -> Self {
        Self::Object {
            properties,
            required: (!required.is_empty())
                .then(|| required.into_iter().map(str::to_string).collect()),
            additional_properties: Some(false),
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::String {
            description: Some(description.into()),
            allowed_values: None,
        }
    }

    pub fn string_enum(description: impl Into<String>, values: &[&str]) -> Self {
        Self::String {
            description: Some(description.into()),
            allowed_values: Some(values.iter().map(|value| (*value).to_string()).collect()),
        }
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self::Integer {
            description: Some(description.into()),
        }
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self::Boolean {
            description: Some(description.into()),
        }
    }

    pub fn array_of(items: JsonSchema, description: impl Into<String>) -> Self {
        Self::Array {
            items: Box::new(items),
            description: Some(description.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn error_status_comes_from_status_not_content() {
        let output = ToolOutput::success("Error: this file talks about errors");
        assert!(!output.is_error());
        assert_eq!(output.category(), None);

        let output = ToolOutput::error(ErrorCategory::ExecutionError, "fine");
        assert!(output.is_error());
    }

    #[test]
    fn not_found_is_typed() {
        let output = ToolCallError::NotFound("File not found: missing.txt".to_string()).into_output();
        assert_eq!(output.status, ToolStatus::NotFound);
        assert_eq!(output.category(), Some(ErrorCategory::ResourceNotFound));
        assert!(output.content.starts_with("Error: File not found: missing.txt"));
    }

    #[test]
    fn blocked_output_carries_hint() {
        let output = ToolCallError::Blocked("command 'rm' is not allowed".to_string()).into_output();
        assert_eq!(
            output.status,
            ToolStatus::Error(ErrorCategory::PolicyViolation)
        );
        assert!(output.content.contains("\nHint: "));
    }

    #[test]
    fn timeout_message_includes_bound() {
        let error = ToolCallError::Timeout {
            operation: "Command `sleep 100`".to_string(),
            limit: Duration::from_secs(60),
        };
        assert_eq!(
            error.to_string(),
            "Command `sleep 100` timed out after 60 seconds"
        );
        assert_eq!(describe_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(describe_duration(Duration::from_millis(1500)), "1.5 seconds");
    }

    #[test]
    fn path_errors_map_to_categories() {
        let denied: ToolCallError = PathError::OutsideRoot {
            requested: "../etc/passwd".into(),
        }
        .into();
        assert_eq!(denied.category(), ErrorCategory::AccessDenied);
        let empty: ToolCallError = PathError::Empty.into();
        assert_eq!(empty.category(), ErrorCategory::InvalidParameters);
    }

    #[test]
    fn spec_serializes_as_json_schema() {
        let mut properties = BTreeMap::new();
        properties.insert("path".to_string(), JsonSchema::string("File path"));
        let spec = ToolSpec::new("read_file", "Read a file")
            .with_parameters(JsonSchema::object(properties, vec!["path"]));

        assert_eq!(
            serde_json::to_value(&spec).expect("json"),
            json!({
                "name": "read_file",
                "description": "Read a file",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "path": { "type": "string", "description": "File path" }
                    },
                    "required": ["path"],
                    "additionalProperties": false,
                }
            })
        );
    }
}
