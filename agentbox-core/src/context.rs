use std::path::{Path, PathBuf};
use std::sync::Arc;

use agentbox_commons::canonicalize_workspace;
use agentbox_config::SandboxConfig;
use anyhow::{Context as _, Result, ensure};
use tracing::warn;

use crate::command_safety::CommandValidator;
use crate::hooks::SecurityHook;
use crate::server::{LifecycleSettings, ProcessLifecycleManager, StopOutcome};
use crate::tools::browser::BrowserDriver;
use crate::tools::classification::CommandClassifier;

/// Everything one agent instance owns: project root, configuration, the
/// validator, the tracked background process and the optional browser.
///
/// Built once per agent and shared with every tool call behind an `Arc`.
pub struct AgentContext {
    project_root: PathBuf,
    config: SandboxConfig,
    hook: SecurityHook,
    classifier: CommandClassifier,
    processes: ProcessLifecycleManager,
    browser: Option<Arc<dyn BrowserDriver>>,
}

impl std::fmt::Debug for AgentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentContext")
            .field("project_root", &self.project_root)
            .field("browser", &self.browser.is_some())
            .finish_non_exhaustive()
    }
}

impl AgentContext {
    /// Validate `config` and bind it to `project_root`, which must be an
    /// existing directory.
    pub fn new(project_root: impl AsRef<Path>, config: SandboxConfig) -> Result<Self> {
        let requested = project_root.as_ref();
        ensure!(
            requested.is_dir(),
            "project root '{}' is not a directory",
            requested.display()
        );
        config.validate().context("invalid sandbox configuration")?;

        let project_root = canonicalize_workspace(requested);
        let validator = Arc::new(CommandValidator::from_config(&config.commands));
        let processes =
            ProcessLifecycleManager::new(LifecycleSettings::from_config(&project_root, &config));

        Ok(Self {
            hook: SecurityHook::new(validator),
            classifier: CommandClassifier::from_config(&config.server),
            processes,
            browser: None,
            project_root,
            config,
        })
    }

    pub fn with_browser(mut self, driver: Arc<dyn BrowserDriver>) -> Self {
        self.browser = Some(driver);
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn hook(&self) -> &SecurityHook {
        &self.hook
    }

    pub fn validator(&self) -> &CommandValidator {
        self.hook.validator()
    }

    pub fn classifier(&self) -> &CommandClassifier {
        &self.classifier
    }

    pub fn processes(&self) -> &ProcessLifecycleManager {
        &self.processes
    }

    pub fn browser(&self) -> Option<&Arc<dyn BrowserDriver>> {
        self.browser.as_ref()
    }

    /// Stop the tracked process and close the browser.
    pub async fn shutdown(&self) -> StopOutcome {
        let outcome = self.processes.shutdown().await;
        if let Some(browser) = &self.browser
            && let Err(error) = browser.close().await
        {
            warn!(%error, "failed to close browser during shutdown");
        }
        outcome
    }
}
