use std::collections::BTreeSet;

use agentbox_config::CommandsConfig;
use agentbox_config::constants::commands::DEFAULT_ALLOWED_COMMANDS;

/// Closed set of program names an agent may invoke.
///
/// Built once per agent session and shared read-only afterwards. Lookups are
/// exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedCommandSet {
    names: BTreeSet<String>,
}

impl AllowedCommandSet {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// The process-wide default allowlist.
    pub fn defaults() -> Self {
        Self::from_names(DEFAULT_ALLOWED_COMMANDS.iter().copied())
    }

    /// Defaults merged with the session's configured override and additions.
    pub fn from_config(config: &CommandsConfig) -> Self {
        Self {
            names: config.effective_allowlist(),
        }
    }

    pub fn contains(&self, program: &str) -> bool {
        self.names.contains(program)
    }
}

impl Default for AllowedCommandSet {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_include_init_script_and_exclude_rm() {
        let allowed = AllowedCommandSet::defaults();
        assert!(allowed.contains("init.sh"));
        assert!(allowed.contains("npm"));
        assert!(!allowed.contains("rm"));
        assert!(!allowed.contains("NPM"));
    }

    #[test]
    fn config_override_replaces_defaults() {
        let config = CommandsConfig {
            allowed: Some(vec!["ls".to_string()]),
            additional: vec!["make".to_string()],
            ..CommandsConfig::default()
        };
        let allowed = AllowedCommandSet::from_config(&config);
        assert_eq!(allowed, AllowedCommandSet::from_names(["ls", "make"]));
    }
}
