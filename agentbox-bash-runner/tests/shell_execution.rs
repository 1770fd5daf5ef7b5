#![cfg(unix)]

use std::time::{Duration, Instant};

use agentbox_bash_runner::{
    CommandStatus, PipeSpawnOptions, ShellRequest, TerminationOutcome, is_process_running,
    run_shell_command, spawn_process,
};
use assert_fs::TempDir;
use assert_fs::prelude::*;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn runs_in_working_directory_and_merges_streams() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    dir.child("marker.txt").write_str("present")?;

    let output = run_shell_command(&ShellRequest::new(
        "cat marker.txt; echo oops 1>&2",
        dir.path(),
    ))
    .await?;

    assert_eq!(output.status, CommandStatus::Exited(0));
    assert!(output.output.contains("present"));
    assert!(output.output.contains("oops"));
    Ok(())
}

#[tokio::test]
async fn non_zero_exit_is_reported_not_raised() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let output = run_shell_command(&ShellRequest::new("exit 7", dir.path())).await?;
    assert_eq!(output.status, CommandStatus::Exited(7));
    assert!(!output.status.success());
    Ok(())
}

#[tokio::test]
async fn timeout_kills_the_process_group() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let started = Instant::now();
    let output = run_shell_command(
        &ShellRequest::new("sleep 30", dir.path()).with_timeout(Duration::from_millis(300)),
    )
    .await?;

    assert_eq!(output.status, CommandStatus::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(10));
    Ok(())
}

#[tokio::test]
async fn output_is_capped() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let output = run_shell_command(
        &ShellRequest::new("yes | head -c 10000", dir.path()).with_max_output_bytes(100),
    )
    .await?;

    assert_eq!(output.output.len(), 100);
    assert!(output.truncated);
    Ok(())
}

#[tokio::test]
async fn graceful_shutdown_stops_long_running_process() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let spawned = spawn_process(PipeSpawnOptions::shell("sleep 30", dir.path())).await?;
    let pid = spawned.session.pid().expect("pid");
    assert!(is_process_running(pid));

    let outcome = spawned.session.shutdown(Duration::from_secs(5)).await;
    assert_eq!(outcome, TerminationOutcome::GracefulExit);
    assert!(spawned.session.has_exited());
    assert!(!is_process_running(pid));
    Ok(())
}

#[tokio::test]
async fn shutdown_escalates_when_sigterm_is_ignored() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let spawned = spawn_process(PipeSpawnOptions::shell(
        "trap '' TERM; while true; do sleep 0.1; done",
        dir.path(),
    ))
    .await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let outcome = spawned.session.shutdown(Duration::from_millis(300)).await;
    assert_eq!(outcome, TerminationOutcome::ForcefulKill);

    for _ in 0..100 {
        if spawned.session.has_exited() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(spawned.session.has_exited());
    Ok(())
}
