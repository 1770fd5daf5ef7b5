use std::time::Duration;

use agentbox_commons::truncate_chars;
use serde::Serialize;
use serde_json::Value;

use super::handlers::tool_handler::ToolOutput;

/// Summary of one dispatched call, for transcripts and logs.
///
/// Output is bounded; the full content stays in the [`ToolOutput`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub input: Value,
    pub output: String,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    pub is_error: bool,
}

impl ToolCallRecord {
    pub fn new(
        name: impl Into<String>,
        input: Value,
        output: &ToolOutput,
        duration: Duration,
        max_output_chars: usize,
    ) -> Self {
        Self {
            name: name.into(),
            input,
            output: truncate_chars(&output.content, max_output_chars, "...").text,
            duration,
            is_error: output.is_error(),
        }
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }
}
