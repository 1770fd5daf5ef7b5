//! Error categorization shared by every tool result.
//!
//! A tool call is classified by the category of the operation that failed,
//! never by inspecting the text it produced.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical failure category for a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The command validator rejected the request.
    PolicyViolation,
    /// A path resolved outside the project root.
    AccessDenied,
    /// File or directory does not exist.
    ResourceNotFound,
    /// Arguments were missing or malformed.
    InvalidParameters,
    /// No handler is registered under the requested name.
    ToolNotFound,
    /// The OS-level operation failed (spawn failure, I/O error, non-zero exit).
    ExecutionError,
    /// The operation exceeded its bound and was terminated.
    Timeout,
    /// A collaborator the tool depends on is not configured.
    Unavailable,
}

impl ErrorCategory {
    /// Stable identifier used in JSON output and log fields.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PolicyViolation => "policy_violation",
            Self::AccessDenied => "access_denied",
            Self::ResourceNotFound => "resource_not_found",
            Self::InvalidParameters => "invalid_parameters",
            Self::ToolNotFound => "tool_not_found",
            Self::ExecutionError => "execution_error",
            Self::Timeout => "timeout",
            Self::Unavailable => "unavailable",
        }
    }

    /// Short hint appended to model-facing error messages.
    pub const fn recovery_hint(self) -> Option<&'static str> {
        match self {
            Self::PolicyViolation => Some("use an allowed command or a dedicated tool instead"),
            Self::AccessDenied => Some("use a path inside the project directory"),
            Self::ToolNotFound => Some("check the list of available tools"),
            Self::Timeout => Some("long-running servers should use manage_server"),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_identifier() {
        assert_eq!(
            ErrorCategory::ResourceNotFound.to_string(),
            "resource_not_found"
        );
        assert_eq!(ErrorCategory::Timeout.to_string(), "timeout");
    }

    #[test]
    fn hints_only_where_the_agent_can_adjust() {
        assert!(ErrorCategory::AccessDenied.recovery_hint().is_some());
        assert_eq!(ErrorCategory::ExecutionError.recovery_hint(), None);
    }
}
