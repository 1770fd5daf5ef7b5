use agentbox_config::{ExecutionMode, ServerConfig, ServerPatternConfig};

/// Ordered pattern table deciding whether an accepted command runs to
/// completion or is handed to the lifecycle manager.
///
/// The first matching row wins, so `npx vite build` can stay blocking ahead
/// of the broader `npx vite`. Commands matching nothing are blocking.
#[derive(Debug, Clone)]
pub struct CommandClassifier {
    patterns: Vec<ServerPatternConfig>,
}

impl Default for CommandClassifier {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}

impl CommandClassifier {
    pub fn new(patterns: Vec<ServerPatternConfig>) -> Self {
        Self { patterns }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.effective_patterns())
    }

    pub fn classify(&self, command: &str) -> ExecutionMode {
        self.matching_pattern(command)
            .map_or(ExecutionMode::Blocking, |entry| entry.mode)
    }

    pub fn matching_pattern(&self, command: &str) -> Option<&ServerPatternConfig> {
        let command = collapse_whitespace(command);
        self.patterns
            .iter()
            .find(|entry| contains_at_word_start(&command, &collapse_whitespace(&entry.pattern)))
    }

    pub fn patterns(&self) -> &[ServerPatternConfig] {
        &self.patterns
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True if `pattern` occurs in `command` starting at a word boundary, so
/// `npm start` matches `cd app && npm start` but not `pnpm start`.
fn contains_at_word_start(command: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    command.match_indices(pattern).any(|(index, _)| {
        command[..index]
            .chars()
            .next_back()
            .is_none_or(|previous| !(previous.is_alphanumeric() || "_-./".contains(previous)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_servers_run_in_background() {
        let classifier = CommandClassifier::default();
        for command in [
            "npm run dev",
            "npm start",
            "node server.js",
            "npx vite --port 5173",
            "cd web && npm  run   dev",
            "PORT=3000 npm start",
        ] {
            assert_eq!(
                classifier.classify(command),
                ExecutionMode::Background,
                "{command}"
            );
        }
    }

    #[test]
    fn builds_and_one_shots_block() {
        let classifier = CommandClassifier::default();
        for command in ["npx vite build", "npm test", "ls -la", "pnpm start", "npm install"] {
            assert_eq!(
                classifier.classify(command),
                ExecutionMode::Blocking,
                "{command}"
            );
        }
    }

    #[test]
    fn configured_patterns_are_consulted_first() {
        let config = ServerConfig {
            patterns: vec![ServerPatternConfig::new(
                "npm run dev",
                ExecutionMode::Blocking,
            )],
            ..ServerConfig::default()
        };
        let classifier = CommandClassifier::from_config(&config);
        assert_eq!(classifier.classify("npm run dev"), ExecutionMode::Blocking);
        assert_eq!(classifier.classify("npm start"), ExecutionMode::Background);
    }
}
