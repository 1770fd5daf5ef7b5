use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::warn;

use crate::pipe::{PipeSpawnOptions, spawn_process};
use crate::process::collect_output_until_exit;

/// A shell command to be run to completion.
#[derive(Debug, Clone)]
pub struct ShellRequest {
    pub command: String,
    pub working_dir: PathBuf,
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

impl ShellRequest {
    pub fn new(command: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            working_dir: working_dir.into(),
            timeout: Duration::from_secs(60),
            max_output_bytes: 64 * 1024,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_output_bytes(mut self, max_output_bytes: usize) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }
}

/// Exit status of a completed (or abandoned) command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Exited(i32),
    /// The timeout elapsed and the process group was killed.
    TimedOut,
}

impl CommandStatus {
    pub fn success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Exited(code) => Some(*code),
            Self::TimedOut => None,
        }
    }
}

/// Merged output and status of a shell command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: CommandStatus,
    /// stdout and stderr interleaved in arrival order.
    pub output: String,
    pub truncated: bool,
    pub duration: Duration,
}

/// Run `request.command` through `sh -c`, killing its process group if it
/// outlives `request.timeout`.
///
/// Only spawn failures are errors; non-zero exits and timeouts are reported
/// through [`CommandStatus`].
pub async fn run_shell_command(request: &ShellRequest) -> Result<CommandOutput> {
    let started = Instant::now();
    let spawned = spawn_process(PipeSpawnOptions::shell(
        request.command.clone(),
        request.working_dir.clone(),
    ))
    .await?;

    let session = spawned.session;
    let collected = collect_output_until_exit(
        spawned.output_rx,
        spawned.exit_rx,
        request.timeout,
        request.max_output_bytes,
    )
    .await;

    let status = match collected.exit_code {
        Some(code) => CommandStatus::Exited(code),
        None => {
            warn!(
                command = %request.command,
                timeout = ?request.timeout,
                "command timed out; killing process group"
            );
            CommandStatus::TimedOut
        }
    };
    // Also kills background children left behind by a command that exited.
    session.terminate();

    Ok(CommandOutput {
        status,
        output: String::from_utf8_lossy(&collected.bytes).into_owned(),
        truncated: collected.truncated,
        duration: started.elapsed(),
    })
}
