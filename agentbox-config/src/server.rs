use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::constants::server as defaults;

/// How a shell command should be run once it has been accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Run to completion under the command timeout.
    #[default]
    Blocking,
    /// Start, wait out the grace period, then hand to the lifecycle manager.
    Background,
}

/// One row of the server-command classification table.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ServerPatternConfig {
    pub pattern: String,
    #[serde(default = "ServerPatternConfig::default_mode")]
    pub mode: ExecutionMode,
}

impl ServerPatternConfig {
    pub fn new(pattern: impl Into<String>, mode: ExecutionMode) -> Self {
        Self {
            pattern: pattern.into(),
            mode,
        }
    }

    const fn default_mode() -> ExecutionMode {
        ExecutionMode::Background
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// Command used by `manage_server` when none is supplied.
    #[serde(default = "ServerConfig::default_command")]
    pub default_command: String,
    /// Extra patterns, consulted before the built-in table.
    #[serde(default)]
    pub patterns: Vec<ServerPatternConfig>,
    /// Drop the built-in table entirely.
    #[serde(default)]
    pub replace_default_patterns: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_command: Self::default_command(),
            patterns: Vec::new(),
            replace_default_patterns: false,
        }
    }
}

impl ServerConfig {
    fn default_command() -> String {
        defaults::DEFAULT_COMMAND.to_string()
    }

    /// Configured patterns followed by the built-in ones, in match order.
    pub fn effective_patterns(&self) -> Vec<ServerPatternConfig> {
        let mut patterns = self.patterns.clone();
        if !self.replace_default_patterns {
            patterns.extend(
                defaults::DEFAULT_PATTERNS
                    .iter()
                    .map(|(pattern, mode)| ServerPatternConfig::new(*pattern, *mode)),
            );
        }
        patterns
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.default_command.trim().is_empty(),
            "server.default_command must not be empty"
        );
        for entry in &self.patterns {
            ensure!(
                !entry.pattern.trim().is_empty(),
                "server.patterns entries must have a non-empty pattern"
            );
        }
        Ok(())
    }
}
