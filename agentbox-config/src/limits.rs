use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::constants::limits as defaults;

/// Size caps applied to content returned from tool calls.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LimitsConfig {
    #[serde(default = "LimitsConfig::default_batch_read_max_files")]
    pub batch_read_max_files: usize,
    #[serde(default = "LimitsConfig::default_batch_read_max_chars")]
    pub batch_read_max_chars: usize,
    #[serde(default = "LimitsConfig::default_read_file_max_bytes")]
    pub read_file_max_bytes: usize,
    #[serde(default = "LimitsConfig::default_command_output_max_bytes")]
    pub command_output_max_bytes: usize,
    /// Output kept on each `ToolCallRecord`.
    #[serde(default = "LimitsConfig::default_record_output_max_chars")]
    pub record_output_max_chars: usize,
    /// Recent output retained for a tracked background process.
    #[serde(default = "LimitsConfig::default_server_output_tail_bytes")]
    pub server_output_tail_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            batch_read_max_files: Self::default_batch_read_max_files(),
            batch_read_max_chars: Self::default_batch_read_max_chars(),
            read_file_max_bytes: Self::default_read_file_max_bytes(),
            command_output_max_bytes: Self::default_command_output_max_bytes(),
            record_output_max_chars: Self::default_record_output_max_chars(),
            server_output_tail_bytes: Self::default_server_output_tail_bytes(),
        }
    }
}

impl LimitsConfig {
    const fn default_batch_read_max_files() -> usize {
        defaults::BATCH_READ_MAX_FILES
    }

    const fn default_batch_read_max_chars() -> usize {
        defaults::BATCH_READ_MAX_CHARS
    }

    const fn default_read_file_max_bytes() -> usize {
        defaults::READ_FILE_MAX_BYTES
    }

    const fn default_command_output_max_bytes() -> usize {
        defaults::COMMAND_OUTPUT_MAX_BYTES
    }

    const fn default_record_output_max_chars() -> usize {
        defaults::RECORD_OUTPUT_MAX_CHARS
    }

    const fn default_server_output_tail_bytes() -> usize {
        defaults::SERVER_OUTPUT_TAIL_BYTES
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.batch_read_max_files > 0,
            "limits.batch_read_max_files must be at least 1"
        );
        ensure!(
            self.batch_read_max_chars > 0,
            "limits.batch_read_max_chars must be at least 1"
        );
        ensure!(
            self.read_file_max_bytes > 0,
            "limits.read_file_max_bytes must be at least 1"
        );
        ensure!(
            self.command_output_max_bytes > 0,
            "limits.command_output_max_bytes must be at least 1"
        );
        ensure!(
            self.record_output_max_chars > 0,
            "limits.record_output_max_chars must be at least 1"
        );
        Ok(())
    }
}
