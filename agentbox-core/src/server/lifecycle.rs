use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use agentbox_bash_runner::{
    OutputTail, PipeSpawnOptions, ProcessHandle, TerminationOutcome, spawn_process,
};
use agentbox_config::SandboxConfig;
use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Extra time given to a process that died during the grace period so its
/// final output reaches the tail.
const EXIT_DRAIN: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub working_dir: PathBuf,
    pub default_command: String,
    pub grace_period: Duration,
    pub stop_timeout: Duration,
    pub output_tail_bytes: usize,
}

impl LifecycleSettings {
    pub fn from_config(working_dir: impl Into<PathBuf>, config: &SandboxConfig) -> Self {
        Self {
            working_dir: working_dir.into(),
            default_command: config.server.default_command.clone(),
            grace_period: config.timeouts.server_grace(),
            stop_timeout: config.timeouts.server_stop_timeout(),
            output_tail_bytes: config.limits.server_output_tail_bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Stopped,
    Exited(Option<i32>),
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("running"),
            Self::Stopped => f.write_str("stopped"),
            Self::Exited(Some(code)) => write!(f, "exited with code {code}"),
            Self::Exited(None) => f.write_str("exited"),
        }
    }
}

/// The background process owned by one agent instance.
#[derive(Debug)]
pub struct TrackedProcess {
    command: String,
    handle: ProcessHandle,
    started_at: DateTime<Utc>,
    tail: OutputTail,
}

impl TrackedProcess {
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn pid(&self) -> Option<u32> {
        self.handle.pid()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn state(&self) -> ProcessState {
        if self.handle.has_exited() {
            ProcessState::Exited(self.handle.exit_code())
        } else {
            ProcessState::Running
        }
    }

    pub fn recent_output(&self) -> String {
        self.tail.snapshot()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Still alive after the grace period and now tracked.
    Started {
        pid: Option<u32>,
        command: String,
        replaced: Option<StopOutcome>,
        initial_output: String,
    },
    /// Exited during the grace period.
    Failed {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    NotRunning,
    AlreadyExited {
        command: String,
        exit_code: Option<i32>,
    },
    Stopped {
        command: String,
        pid: Option<u32>,
        forced: bool,
    },
}

impl StopOutcome {
    pub fn describe(&self) -> String {
        match self {
            Self::NotRunning => "No server is currently running.".to_string(),
            Self::AlreadyExited { command, exit_code } => match exit_code {
                Some(code) => format!("Server `{command}` had already exited with code {code}."),
                None => format!("Server `{command}` had already exited."),
            },
            Self::Stopped {
                command,
                forced: false,
                ..
            } => format!("Server stopped gracefully: {command}"),
            Self::Stopped {
                command,
                forced: true,
                ..
            } => format!("Server force-killed after ignoring SIGTERM: {command}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    NoProcess,
    Running {
        pid: Option<u32>,
        command: String,
        started_at: DateTime<Utc>,
        uptime: Duration,
        recent_output: String,
    },
    Stopped {
        command: String,
    },
    Exited {
        command: String,
        exit_code: Option<i32>,
        recent_output: String,
    },
}

impl ServerStatus {
    pub fn state(&self) -> Option<ProcessState> {
        match self {
            Self::NoProcess => None,
            Self::Running { .. } => Some(ProcessState::Running),
            Self::Stopped { .. } => Some(ProcessState::Stopped),
            Self::Exited { exit_code, .. } => Some(ProcessState::Exited(*exit_code)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::NoProcess => "No server is currently running.".to_string(),
            Self::Running {
                pid,
                command,
                started_at,
                uptime,
                recent_output,
            } => {
                let pid = pid.map_or_else(|| "unknown".to_string(), |pid| pid.to_string());
                let mut text = format!(
                    "Server running (pid {pid}): {command}\nStarted at {} (up {}s)",
                    started_at.to_rfc3339(),
                    uptime.as_secs()
                );
                append_output(&mut text, recent_output);
                text
            }
            Self::Stopped { command } => format!("Server stopped: {command}"),
            Self::Exited {
                command,
                exit_code,
                recent_output,
            } => {
                let mut text = match exit_code {
                    Some(code) => format!("Server exited with code {code}: {command}"),
                    None => format!("Server exited: {command}"),
                };
                append_output(&mut text, recent_output);
                text
            }
        }
    }
}

fn append_output(text: &mut String, output: &str) {
    let output = output.trim_end();
    if !output.is_empty() {
        text.push_str("\n\nRecent output:\n");
        text.push_str(output);
    }
}

#[derive(Debug, Default)]
struct Slot {
    current: Option<TrackedProcess>,
    last_command: Option<String>,
    /// What happened to the last process once it left `current`.
    last_status: Option<ServerStatus>,
}

/// Owns at most one background process for an agent instance.
///
/// All transitions hold the slot lock, so a `start` that stops its predecessor
/// cannot interleave with another `start`.
#[derive(Debug)]
pub struct ProcessLifecycleManager {
    settings: LifecycleSettings,
    slot: Mutex<Slot>,
}

impl ProcessLifecycleManager {
    pub fn new(settings: LifecycleSettings) -> Self {
        Self {
            settings,
            slot: Mutex::new(Slot::default()),
        }
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    /// Launch `command`, replacing any tracked process.
    ///
    /// Waits out the grace period; only a process still alive afterwards is
    /// tracked. Errors are spawn failures only.
    pub async fn start(&self, command: &str) -> Result<StartOutcome> {
        let mut slot = self.slot.lock().await;
        self.start_locked(&mut slot, command).await
    }

    /// Stop the tracked process, then start `command`, the last started
    /// command or the configured default, in that order of preference.
    pub async fn restart(&self, command: Option<&str>) -> Result<StartOutcome> {
        let mut slot = self.slot.lock().await;
        let command = command
            .map(str::to_string)
            .or_else(|| slot.last_command.clone())
            .unwrap_or_else(|| self.settings.default_command.clone());
        self.start_locked(&mut slot, &command).await
    }

    /// Idempotent: stopping with nothing running reports `NotRunning`.
    pub async fn stop(&self) -> StopOutcome {
        let mut slot = self.slot.lock().await;
        self.stop_locked(&mut slot).await
    }

    pub async fn status(&self) -> ServerStatus {
        let slot = self.slot.lock().await;
        match &slot.current {
            Some(process) => match process.state() {
                ProcessState::Exited(exit_code) => ServerStatus::Exited {
                    command: process.command.clone(),
                    exit_code,
                    recent_output: process.recent_output(),
                },
                _ => ServerStatus::Running {
                    pid: process.pid(),
                    command: process.command.clone(),
                    started_at: process.started_at,
                    uptime: (Utc::now() - process.started_at)
                        .to_std()
                        .unwrap_or_default(),
                    recent_output: process.recent_output(),
                },
            },
            None => slot.last_status.clone().unwrap_or(ServerStatus::NoProcess),
        }
    }

    /// Command that `restart` would reuse.
    pub async fn last_command(&self) -> Option<String> {
        self.slot.lock().await.last_command.clone()
    }

    /// Stop any live process; used when the owning context is torn down.
    pub async fn shutdown(&self) -> StopOutcome {
        self.stop().await
    }

    async fn start_locked(&self, slot: &mut Slot, command: &str) -> Result<StartOutcome> {
        let replaced = if slot.current.is_some() {
            Some(self.stop_locked(slot).await)
        } else {
            None
        };
        slot.last_command = Some(command.to_string());

        let spawned = spawn_process(PipeSpawnOptions::shell(
            command,
            self.settings.working_dir.clone(),
        ))
        .await?;
        let started_at = Utc::now();
        let handle = spawned.session;
        let tail = OutputTail::spawn(spawned.output_rx, self.settings.output_tail_bytes);
        let mut exit_rx = spawned.exit_rx;

        let exited = tokio::select! {
            _ = tokio::time::sleep(self.settings.grace_period) => None,
            code = &mut exit_rx => Some(code.ok()),
        };

        if let Some(exit_code) = exited {
            tokio::time::sleep(EXIT_DRAIN).await;
            let output = tail.snapshot();
            warn!(command, ?exit_code, "server exited during startup grace period");
            slot.last_status = Some(ServerStatus::Exited {
                command: command.to_string(),
                exit_code,
                recent_output: output.clone(),
            });
            // Reap anything the shell left behind.
            handle.terminate();
            return Ok(StartOutcome::Failed {
                command: command.to_string(),
                exit_code,
                output,
            });
        }

        let pid = handle.pid();
        info!(command, ?pid, "server started");
        let initial_output = tail.snapshot();
        slot.last_status = None;
        slot.current = Some(TrackedProcess {
            command: command.to_string(),
            handle,
            started_at,
            tail,
        });

        Ok(StartOutcome::Started {
            pid,
            command: command.to_string(),
            replaced,
            initial_output,
        })
    }

    async fn stop_locked(&self, slot: &mut Slot) -> StopOutcome {
        let Some(process) = slot.current.take() else {
            return StopOutcome::NotRunning;
        };
        let command = process.command.clone();
        let pid = process.pid();

        let outcome = match process.state() {
            ProcessState::Exited(_) => TerminationOutcome::AlreadyExited,
            _ => process.handle.shutdown(self.settings.stop_timeout).await,
        };

        match outcome {
            TerminationOutcome::AlreadyExited => {
                let exit_code = process.handle.exit_code();
                slot.last_status = Some(ServerStatus::Exited {
                    command: command.clone(),
                    exit_code,
                    recent_output: process.recent_output(),
                });
                // Reap anything the shell left behind.
                process.handle.terminate();
                StopOutcome::AlreadyExited { command, exit_code }
            }
            TerminationOutcome::GracefulExit => {
                info!(command, ?pid, "server stopped");
                slot.last_status = Some(ServerStatus::Stopped {
                    command: command.clone(),
                });
                StopOutcome::Stopped {
                    command,
                    pid,
                    forced: false,
                }
            }
            TerminationOutcome::ForcefulKill => {
                warn!(
                    command,
                    ?pid,
                    timeout = ?self.settings.stop_timeout,
                    "server ignored SIGTERM; killed process group"
                );
                slot.last_status = Some(ServerStatus::Stopped {
                    command: command.clone(),
                });
                StopOutcome::Stopped {
                    command,
                    pid,
                    forced: true,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn manager() -> ProcessLifecycleManager {
        ProcessLifecycleManager::new(LifecycleSettings {
            working_dir: std::env::temp_dir(),
            default_command: "sleep 30".to_string(),
            grace_period: Duration::from_millis(200),
            stop_timeout: Duration::from_secs(2),
            output_tail_bytes: 1024,
        })
    }

    #[tokio::test]
    async fn stop_is_idempotent_when_idle() {
        let manager = manager();
        assert_eq!(manager.stop().await, StopOutcome::NotRunning);
        assert_eq!(manager.stop().await, StopOutcome::NotRunning);
        assert_eq!(manager.status().await, ServerStatus::NoProcess);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_start_surfaces_output() -> Result<()> {
        let manager = manager();
        let outcome = manager.start("echo boom; exit 3").await?;
        match outcome {
            StartOutcome::Failed {
                exit_code, output, ..
            } => {
                assert_eq!(exit_code, Some(3));
                assert!(output.contains("boom"), "output: {output:?}");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(
            manager.status().await.state(),
            Some(ProcessState::Exited(Some(3)))
        );
        Ok(())
    }

    #[test]
    fn status_descriptions() {
        assert_eq!(
            ServerStatus::NoProcess.describe(),
            "No server is currently running."
        );
        let exited = ServerStatus::Exited {
            command: "npm run dev".to_string(),
            exit_code: Some(1),
            recent_output: "EADDRINUSE\n".to_string(),
        };
        assert_eq!(
            exited.describe(),
            "Server exited with code 1: npm run dev\n\nRecent output:\nEADDRINUSE"
        );
    }
}
