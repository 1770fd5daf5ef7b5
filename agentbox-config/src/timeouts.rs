use std::time::Duration;

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

use crate::constants::timeouts as defaults;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TimeoutsConfig {
    /// Upper bound (seconds) for a synchronous shell command.
    #[serde(default = "TimeoutsConfig::default_command_seconds")]
    pub command_seconds: u64,
    /// How long (milliseconds) a background server must stay alive to count as started.
    #[serde(default = "TimeoutsConfig::default_server_grace_ms")]
    pub server_grace_ms: u64,
    /// How long (seconds) a stopping server gets between SIGTERM and SIGKILL.
    #[serde(default = "TimeoutsConfig::default_server_stop_seconds")]
    pub server_stop_seconds: u64,
    /// Upper bound (seconds) for a single file tool call.
    #[serde(default = "TimeoutsConfig::default_file_io_seconds")]
    pub file_io_seconds: u64,
    /// Upper bound (seconds) for a single browser action.
    #[serde(default = "TimeoutsConfig::default_browser_seconds")]
    pub browser_seconds: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            command_seconds: Self::default_command_seconds(),
            server_grace_ms: Self::default_server_grace_ms(),
            server_stop_seconds: Self::default_server_stop_seconds(),
            file_io_seconds: Self::default_file_io_seconds(),
            browser_seconds: Self::default_browser_seconds(),
        }
    }
}

impl TimeoutsConfig {
    const fn default_command_seconds() -> u64 {
        defaults::COMMAND_SECONDS
    }

    const fn default_server_grace_ms() -> u64 {
        defaults::SERVER_GRACE_MS
    }

    const fn default_server_stop_seconds() -> u64 {
        defaults::SERVER_STOP_SECONDS
    }

    const fn default_file_io_seconds() -> u64 {
        defaults::FILE_IO_SECONDS
    }

    const fn default_browser_seconds() -> u64 {
        defaults::BROWSER_SECONDS
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_seconds)
    }

    pub fn server_grace(&self) -> Duration {
        Duration::from_millis(self.server_grace_ms)
    }

    pub fn server_stop_timeout(&self) -> Duration {
        Duration::from_secs(self.server_stop_seconds)
    }

    pub fn file_io_timeout(&self) -> Duration {
        Duration::from_secs(self.file_io_seconds)
    }

    pub fn browser_timeout(&self) -> Duration {
        Duration::from_secs(self.browser_seconds)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.command_seconds > 0,
            "timeouts.command_seconds must be at least 1 second"
        );
        ensure!(
            self.server_grace_ms >= 50,
            "timeouts.server_grace_ms must be at least 50ms"
        );
        ensure!(
            self.server_stop_seconds > 0,
            "timeouts.server_stop_seconds must be at least 1 second"
        );
        ensure!(
            self.file_io_seconds > 0,
            "timeouts.file_io_seconds must be at least 1 second"
        );
        ensure!(
            self.browser_seconds > 0,
            "timeouts.browser_seconds must be at least 1 second"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_bounds() {
        let timeouts = TimeoutsConfig::default();
        assert_eq!(timeouts.command_timeout(), Duration::from_secs(60));
        assert_eq!(timeouts.server_grace(), Duration::from_secs(3));
        assert_eq!(timeouts.server_stop_timeout(), Duration::from_secs(5));
        assert!(timeouts.validate().is_ok());
    }

    #[test]
    fn zero_command_timeout_is_rejected() {
        let timeouts = TimeoutsConfig {
            command_seconds: 0,
            ..TimeoutsConfig::default()
        };
        assert!(timeouts.validate().is_err());
    }
}
