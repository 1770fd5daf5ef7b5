use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commands::CommandsConfig;
use crate::constants::{CONFIG_FILE_NAME, CONFIG_PATH_ENV};
use crate::limits::LimitsConfig;
use crate::server::ServerConfig;
use crate::timeouts::TimeoutsConfig;

/// Top-level sandbox configuration. Every section is optional in TOML.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SandboxConfig {
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl SandboxConfig {
    pub fn validate(&self) -> Result<()> {
        self.commands
            .validate()
            .context("Invalid commands configuration")?;
        self.timeouts
            .validate()
            .context("Invalid timeouts configuration")?;
        self.limits
            .validate()
            .context("Invalid limits configuration")?;
        self.server
            .validate()
            .context("Invalid server configuration")?;
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse sandbox config")?;
        config.validate()?;
        Ok(config)
    }
}

/// Locates, loads and validates a [`SandboxConfig`].
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: SandboxConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration for a project, honouring `AGENTBOX_CONFIG_PATH`.
    pub fn load_from_workspace(workspace: impl AsRef<Path>) -> Result<Self> {
        let override_path = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        if let Some(path) = override_path {
            return Self::load_from_file(&path).with_context(|| {
                format!("Failed to load configuration from {CONFIG_PATH_ENV}={path}")
            });
        }

        let workspace_config = workspace.as_ref().join(CONFIG_FILE_NAME);
        if workspace_config.exists() {
            return Self::load_from_file(&workspace_config);
        }

        debug!(
            workspace = %workspace.as_ref().display(),
            "no {CONFIG_FILE_NAME} found; using defaults"
        );
        let config = SandboxConfig::default();
        config
            .validate()
            .context("Default configuration failed validation")?;
        Ok(Self {
            config,
            config_path: None,
        })
    }

    /// Load configuration from an explicit file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = SandboxConfig::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!(path = %path.display(), "loaded sandbox configuration");
        Ok(Self {
            config,
            config_path: Some(path.to_path_buf()),
        })
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn into_config(self) -> SandboxConfig {
        self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
