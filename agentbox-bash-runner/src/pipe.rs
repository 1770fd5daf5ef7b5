//! Pipe-based process spawning.
//!
//! Children get stdout and stderr as pipes (merged into one broadcast stream),
//! stdin from `/dev/null`, and their own session so the process group can be
//! signalled as a unit.

use std::io::{self, ErrorKind};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{broadcast, oneshot};
use tracing::debug;

use crate::process::{ChildTerminator, ProcessHandle, ProcessParts, SpawnedProcess};
use crate::process_group;

const READ_CHUNK_BYTES: usize = 8_192;
const OUTPUT_CHANNEL_CAPACITY: usize = 256;

struct PipeChildTerminator {
    process_group_id: u32,
}

impl ChildTerminator for PipeChildTerminator {
    fn kill(&mut self) -> io::Result<()> {
        process_group::kill_process_group(self.process_group_id)
    }
}

async fn read_output_stream<R>(mut reader: R, output_tx: broadcast::Sender<Vec<u8>>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK_BYTES];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let _ = output_tx.send(buf[..n].to_vec());
            }
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
}

/// Options for spawning a pipe-based process.
#[derive(Debug, Clone)]
pub struct PipeSpawnOptions {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl PipeSpawnOptions {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    /// Run `command` through `sh -c`.
    pub fn shell(command: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self::new("sh", cwd).args(["-c".to_string(), command.into()])
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// Spawn a process in its own process group with piped output.
pub async fn spawn_process(opts: PipeSpawnOptions) -> Result<SpawnedProcess> {
    if opts.program.is_empty() {
        bail!("missing program for pipe spawn");
    }

    let mut command = Command::new(&opts.program);

    #[cfg(target_os = "linux")]
    let parent_pid = unsafe { libc::getpid() };

    #[cfg(unix)]
    unsafe {
        command.pre_exec(move || {
            process_group::detach_from_tty()?;
            #[cfg(target_os = "linux")]
            process_group::set_parent_death_signal(parent_pid)?;
            Ok(())
        });
    }

    command
        .current_dir(&opts.cwd)
        .args(&opts.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .with_context(|| format!("failed to spawn '{}'", opts.program))?;
    let pid = child
        .id()
        .ok_or_else(|| io::Error::other("missing child pid"))?;
    debug!(pid, program = %opts.program, cwd = %opts.cwd.display(), "spawned process");

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (output_tx, _) = broadcast::channel::<Vec<u8>>(OUTPUT_CHANNEL_CAPACITY);
    let initial_output_rx = output_tx.subscribe();

    let stdout_handle = stdout.map(|stdout| {
        let output_tx = output_tx.clone();
        tokio::spawn(async move {
            read_output_stream(BufReader::new(stdout), output_tx).await;
        })
    });

    let stderr_handle = stderr.map(|stderr| {
        let output_tx = output_tx.clone();
        tokio::spawn(async move {
            read_output_stream(BufReader::new(stderr), output_tx).await;
        })
    });

    let mut reader_abort_handles = Vec::new();
    if let Some(ref handle) = stdout_handle {
        reader_abort_handles.push(handle.abort_handle());
    }
    if let Some(ref handle) = stderr_handle {
        reader_abort_handles.push(handle.abort_handle());
    }

    let reader_handle = tokio::spawn(async move {
        if let Some(handle) = stdout_handle {
            let _ = handle.await;
        }
        if let Some(handle) = stderr_handle {
            let _ = handle.await;
        }
    });

    let (exit_tx, exit_rx) = oneshot::channel::<i32>();
    let exit_status = Arc::new(AtomicBool::new(false));
    let wait_exit_status = Arc::clone(&exit_status);
    let exit_code = Arc::new(StdMutex::new(None));
    let wait_exit_code = Arc::clone(&exit_code);

    tokio::spawn(async move {
        let code = match child.wait().await {
            Ok(status) => exit_status_code(status),
            Err(_) => -1,
        };
        if let Ok(mut guard) = wait_exit_code.lock() {
            *guard = Some(code);
        }
        wait_exit_status.store(true, Ordering::SeqCst);
        debug!(pid, code, "process exited");
        let _ = exit_tx.send(code);
    });

    let session = ProcessHandle::new(ProcessParts {
        pid: Some(pid),
        killer: Box::new(PipeChildTerminator {
            process_group_id: pid,
        }),
        reader_handle,
        reader_abort_handles,
        exit_status,
        exit_code,
    });

    Ok(SpawnedProcess {
        session,
        output_rx: initial_output_rx,
        exit_rx,
    })
}

#[cfg(unix)]
fn exit_status_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_status_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn shell_options_wrap_command() {
        let opts = PipeSpawnOptions::shell("echo hi", ".");
        assert_eq!(opts.program, "sh");
        assert_eq!(opts.args, vec!["-c", "echo hi"]);
    }

    #[tokio::test]
    async fn rejects_empty_program() {
        assert!(spawn_process(PipeSpawnOptions::new("", ".")).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reports_exit_code_and_output() -> Result<()> {
        let spawned = spawn_process(PipeSpawnOptions::shell("echo hello; exit 3", ".")).await?;
        let collected = crate::process::collect_output_until_exit(
            spawned.output_rx,
            spawned.exit_rx,
            Duration::from_secs(10),
            1024,
        )
        .await;

        assert_eq!(collected.exit_code, Some(3));
        assert_eq!(String::from_utf8_lossy(&collected.bytes).trim(), "hello");
        Ok(())
    }
}
