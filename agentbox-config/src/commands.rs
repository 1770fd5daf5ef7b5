use std::collections::BTreeSet;

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::constants::commands as command_constants;

/// Command allowlist configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CommandsConfig {
    /// Replaces the built-in allowlist when set.
    #[serde(default)]
    pub allowed: Option<Vec<String>>,

    /// Extends whichever allowlist is in effect.
    #[serde(default)]
    pub additional: Vec<String>,

    /// Process names that `pkill`/`killall` may target.
    #[serde(default = "default_dev_process_names")]
    pub dev_process_names: Vec<String>,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            allowed: None,
            additional: Vec::new(),
            dev_process_names: default_dev_process_names(),
        }
    }
}

fn default_dev_process_names() -> Vec<String> {
    command_constants::DEFAULT_DEV_PROCESS_NAMES
        .iter()
        .map(|name| (*name).to_string())
        .collect()
}

impl CommandsConfig {
    /// Effective allowlist: the override (or built-in defaults) plus additions.
    pub fn effective_allowlist(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = match &self.allowed {
            Some(allowed) => allowed.iter().map(|name| name.trim().to_string()).collect(),
            None => command_constants::DEFAULT_ALLOWED_COMMANDS
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
        };
        names.extend(self.additional.iter().map(|name| name.trim().to_string()));
        names.retain(|name| !name.is_empty());
        names
    }

    pub fn validate(&self) -> Result<()> {
        for name in self
            .allowed
            .iter()
            .flatten()
            .chain(self.additional.iter())
        {
            ensure!(
                !name.contains(char::is_whitespace),
                "commands entries must be bare program names, got '{name}'"
            );
        }
        ensure!(
            self.dev_process_names
                .iter()
                .all(|name| !name.trim().is_empty()),
            "commands.dev_process_names must not contain empty entries"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_include_bootstrap_script_and_find() {
        let allowlist = CommandsConfig::default().effective_allowlist();
        assert!(allowlist.contains("init.sh"));
        assert!(allowlist.contains("find"));
        assert!(allowlist.contains("npx"));
        assert!(!allowlist.contains("rm"));
    }

    #[test]
    fn override_replaces_and_additional_extends() {
        let config = CommandsConfig {
            allowed: Some(vec!["ls".to_string()]),
            additional: vec!["make".to_string()],
            ..CommandsConfig::default()
        };
        let allowlist = config.effective_allowlist();
        assert_eq!(allowlist.len(), 2);
        assert!(allowlist.contains("ls"));
        assert!(allowlist.contains("make"));
        assert!(!allowlist.contains("git"));
    }

    #[test]
    fn rejects_entries_with_arguments() {
        let config = CommandsConfig {
            additional: vec!["git push".to_string()],
            ..CommandsConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
