//! Shell execution helpers for agentbox.
//!
//! Every command runs through `sh -c` in its own session, so timeouts and
//! shutdowns signal the entire process tree rather than only the shell. Two
//! entry points sit on top of the spawning layer:
//!
//! - [`run_shell_command`] runs a command to completion under a timeout and
//!   returns merged output plus status.
//! - [`spawn_process`] returns a [`ProcessHandle`] for long-running processes;
//!   pair it with an [`OutputTail`] to keep recent output around.

pub mod executor;
pub mod pipe;
pub mod process;
pub mod process_group;
pub mod tail;

pub use executor::{CommandOutput, CommandStatus, ShellRequest, run_shell_command};
pub use pipe::{PipeSpawnOptions, spawn_process};
pub use process::{
    ChildTerminator, CollectedOutput, ProcessHandle, ProcessParts, SpawnedProcess,
    TerminationOutcome, collect_output_until_exit,
};
pub use process_group::{KillSignal, is_process_running};
pub use tail::OutputTail;
