//! Handle types for spawned processes.
//!
//! A [`ProcessHandle`] owns the helper tasks that pump a child's output into a
//! broadcast channel and reap it on exit. Dropping the handle kills the whole
//! process group, so a handle can never be lost while its process lives on.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{broadcast, oneshot};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::process_group::{self, KillSignal};

/// Polling interval while waiting for a signalled process to exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Quiet period used to drain trailing output after the process exits.
const DRAIN_QUIET: Duration = Duration::from_millis(50);
const DRAIN_MAX: Duration = Duration::from_millis(500);

/// Process termination strategy.
pub trait ChildTerminator: Send + Sync {
    /// Kill the child process (and whatever it spawned).
    fn kill(&mut self) -> io::Result<()>;
}

/// How a [`ProcessHandle::shutdown`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationOutcome {
    /// The process had already exited before any signal was sent.
    AlreadyExited,
    /// The process exited within the grace period after SIGTERM.
    GracefulExit,
    /// The process ignored SIGTERM and was SIGKILLed.
    ForcefulKill,
}

/// Live handle on a spawned process.
///
/// The task that reaps the child is detached: it keeps running after
/// `terminate()` so the exit code of a killed process is still recorded.
///
/// - Check exit status via `has_exited()` and `exit_code()`
/// - Stop via `shutdown()` (graceful) or `terminate()` (immediate)
pub struct ProcessHandle {
    pid: Option<u32>,
    killer: StdMutex<Option<Box<dyn ChildTerminator>>>,
    reader_handle: StdMutex<Option<JoinHandle<()>>>,
    reader_abort_handles: StdMutex<Vec<AbortHandle>>,
    exit_status: Arc<AtomicBool>,
    exit_code: Arc<StdMutex<Option<i32>>>,
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("has_exited", &self.has_exited())
            .field("exit_code", &self.exit_code())
            .finish()
    }
}

/// Pieces a spawn backend hands to [`ProcessHandle::new`].
pub struct ProcessParts {
    pub pid: Option<u32>,
    pub killer: Box<dyn ChildTerminator>,
    pub reader_handle: JoinHandle<()>,
    pub reader_abort_handles: Vec<AbortHandle>,
    pub exit_status: Arc<AtomicBool>,
    pub exit_code: Arc<StdMutex<Option<i32>>>,
}

impl ProcessHandle {
    pub fn new(parts: ProcessParts) -> Self {
        Self {
            pid: parts.pid,
            killer: StdMutex::new(Some(parts.killer)),
            reader_handle: StdMutex::new(Some(parts.reader_handle)),
            reader_abort_handles: StdMutex::new(parts.reader_abort_handles),
            exit_status: parts.exit_status,
            exit_code: parts.exit_code,
        }
    }

    /// OS pid of the group leader (also the process group id).
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// True once the child has been reaped.
    pub fn has_exited(&self) -> bool {
        self.exit_status.load(Ordering::SeqCst)
    }

    /// Exit code once the child has been reaped. Death by signal `N` reports
    /// `128 + N`, the way shells do.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code.lock().ok().and_then(|guard| *guard)
    }

    /// Kill the process group and abort helper tasks. Idempotent.
    pub fn terminate(&self) {
        if let Ok(mut killer_opt) = self.killer.lock()
            && let Some(mut killer) = killer_opt.take()
            && let Err(error) = killer.kill()
        {
            warn!(pid = ?self.pid, %error, "failed to kill process group");
        }

        self.abort_tasks();
    }

    /// SIGTERM the process group, wait up to `grace` for the leader to exit,
    /// then SIGKILL whatever is left of the group.
    pub async fn shutdown(&self, grace: Duration) -> TerminationOutcome {
        if self.has_exited() {
            self.terminate();
            return TerminationOutcome::AlreadyExited;
        }

        let Some(pgid) = self.pid else {
            self.terminate();
            return TerminationOutcome::ForcefulKill;
        };

        if let Err(error) = process_group::kill_process_group_with_signal(pgid, KillSignal::Term) {
            warn!(pid = pgid, %error, "SIGTERM failed; escalating to SIGKILL");
            self.terminate();
            return TerminationOutcome::ForcefulKill;
        }

        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            if self.has_exited() {
                // Sweep stragglers that outlived the group leader.
                self.terminate();
                debug!(pid = pgid, "process exited after SIGTERM");
                return TerminationOutcome::GracefulExit;
            }
            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
        }

        warn!(pid = pgid, ?grace, "process ignored SIGTERM; sending SIGKILL");
        self.terminate();
        TerminationOutcome::ForcefulKill
    }

    fn abort_tasks(&self) {
        if let Ok(mut h) = self.reader_handle.lock()
            && let Some(handle) = h.take()
        {
            handle.abort();
        }

        if let Ok(mut handles) = self.reader_abort_handles.lock() {
            for handle in handles.drain(..) {
                handle.abort();
            }
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Return value from spawn helpers.
#[derive(Debug)]
pub struct SpawnedProcess {
    pub session: ProcessHandle,
    /// Receiver subscribed before any output was produced.
    pub output_rx: broadcast::Receiver<Vec<u8>>,
    /// Fires once with the exit code when the child is reaped.
    pub exit_rx: oneshot::Receiver<i32>,
}

/// Output gathered by [`collect_output_until_exit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedOutput {
    pub bytes: Vec<u8>,
    /// `None` if the deadline passed before the process exited.
    pub exit_code: Option<i32>,
    /// More than `max_bytes` was produced; the excess was discarded.
    pub truncated: bool,
}

impl CollectedOutput {
    fn push(&mut self, chunk: &[u8], max_bytes: usize) {
        let room = max_bytes.saturating_sub(self.bytes.len());
        if chunk.len() > room {
            self.truncated = true;
        }
        self.bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }

    pub fn timed_out(&self) -> bool {
        self.exit_code.is_none()
    }
}

/// Collect output from a process until it exits or `timeout` elapses.
///
/// Keeps at most `max_bytes` of output. After the exit notification the
/// channel is drained briefly so output still in flight is not lost.
pub async fn collect_output_until_exit(
    mut output_rx: broadcast::Receiver<Vec<u8>>,
    exit_rx: oneshot::Receiver<i32>,
    timeout: Duration,
    max_bytes: usize,
) -> CollectedOutput {
    let mut collected = CollectedOutput::default();
    let deadline = Instant::now() + timeout;
    let mut output_open = true;
    tokio::pin!(exit_rx);

    loop {
        tokio::select! {
            res = output_rx.recv(), if output_open => {
                match res {
                    Ok(chunk) => collected.push(&chunk, max_bytes),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "output receiver lagged; chunks dropped");
                        collected.truncated = true;
                    }
                    Err(broadcast::error::RecvError::Closed) => output_open = false,
                }
            }
            res = &mut exit_rx => {
                let code = res.unwrap_or(-1);
                let drain_deadline = Instant::now() + DRAIN_MAX;
                while output_open && Instant::now() < drain_deadline {
                    match tokio::time::timeout(DRAIN_QUIET, output_rx.recv()).await {
                        Ok(Ok(chunk)) => collected.push(&chunk, max_bytes),
                        Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                        Ok(Err(broadcast::error::RecvError::Closed)) | Err(_) => break,
                    }
                }
                collected.exit_code = Some(code);
                return collected;
            }
            _ = tokio::time::sleep_until(deadline) => {
                return collected;
            }
        }
    }
}
