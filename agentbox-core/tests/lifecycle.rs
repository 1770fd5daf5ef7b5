#![cfg(unix)]

use std::time::Duration;

use agentbox_bash_runner::is_process_running;
use agentbox_core::server::{
    LifecycleSettings, ProcessLifecycleManager, ProcessState, ServerStatus, StartOutcome,
    StopOutcome,
};
use anyhow::{Result, bail};
use pretty_assertions::assert_eq;

fn manager(working_dir: &std::path::Path) -> ProcessLifecycleManager {
    ProcessLifecycleManager::new(LifecycleSettings {
        working_dir: working_dir.to_path_buf(),
        default_command: "sleep 30".to_string(),
        grace_period: Duration::from_millis(300),
        stop_timeout: Duration::from_secs(2),
        output_tail_bytes: 4096,
    })
}

fn started_pid(outcome: &StartOutcome) -> Result<u32> {
    match outcome {
        StartOutcome::Started { pid: Some(pid), .. } => Ok(*pid),
        other => bail!("expected a running server, got {other:?}"),
    }
}

async fn wait_until_gone(pid: u32) -> bool {
    for _ in 0..40 {
        if !is_process_running(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn stop_twice_is_harmless() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let manager = manager(temp.path());

    started_pid(&manager.start("sleep 30").await?)?;
    let first = manager.stop().await;
    assert!(matches!(first, StopOutcome::Stopped { forced: false, .. }), "{first:?}");
    assert_eq!(manager.stop().await, StopOutcome::NotRunning);
    assert_eq!(manager.status().await.state(), Some(ProcessState::Stopped));
    Ok(())
}

#[tokio::test]
async fn starting_again_replaces_the_previous_server() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let manager = manager(temp.path());

    let first_pid = started_pid(&manager.start("sleep 30").await?)?;
    let second = manager.start("sleep 31").await?;
    let second_pid = started_pid(&second)?;

    assert_ne!(first_pid, second_pid);
    assert!(matches!(
        second,
        StartOutcome::Started {
            replaced: Some(StopOutcome::Stopped { .. }),
            ..
        }
    ));
    assert!(wait_until_gone(first_pid).await, "old server still alive");
    assert!(is_process_running(second_pid));

    manager.shutdown().await;
    assert!(wait_until_gone(second_pid).await);
    Ok(())
}

#[tokio::test]
async fn restart_reuses_the_last_command() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let manager = manager(temp.path());

    manager.start("sleep 29").await?;
    let outcome = manager.restart(None).await?;
    match &outcome {
        StartOutcome::Started { command, .. } => assert_eq!(command, "sleep 29"),
        other => bail!("unexpected restart outcome: {other:?}"),
    }
    assert_eq!(manager.last_command().await.as_deref(), Some("sleep 29"));
    manager.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn status_tracks_a_server_that_exits_later() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let manager = manager(temp.path());

    manager.start("echo ready; sleep 1; exit 4").await?;
    let status = manager.status().await;
    assert_eq!(status.state(), Some(ProcessState::Running));
    assert!(status.describe().contains("Recent output:\nready"));

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    match manager.status().await {
        ServerStatus::Exited {
            exit_code,
            recent_output,
            ..
        } => {
            assert_eq!(exit_code, Some(4));
            assert!(recent_output.contains("ready"));
        }
        other => bail!("expected an exited server, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn server_runs_in_the_working_directory() -> Result<()> {
    let temp = tempfile::tempdir()?;
    std::fs::write(temp.path().join("marker.txt"), "")?;
    let manager = manager(temp.path());

    let outcome = manager.start("ls; sleep 30").await?;
    match &outcome {
        StartOutcome::Started { initial_output, .. } => {
            assert!(initial_output.contains("marker.txt"), "{initial_output:?}");
        }
        other => bail!("unexpected outcome: {other:?}"),
    }
    manager.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn stopping_an_exited_server_reports_its_exit() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let manager = manager(temp.path());

    manager.start("sleep 0.5; exit 2").await?;
    tokio::time::sleep(Duration::from_millis(1_000)).await;

    let outcome = manager.stop().await;
    assert_eq!(
        outcome,
        StopOutcome::AlreadyExited {
            command: "sleep 0.5; exit 2".to_string(),
            exit_code: Some(2),
        }
    );
    assert_eq!(
        manager.status().await.state(),
        Some(ProcessState::Exited(Some(2)))
    );
    Ok(())
}

#[tokio::test]
async fn uptime_counts_from_spawn() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let manager = manager(temp.path());

    let before = chrono::Utc::now();
    manager.start("sleep 30").await?;
    match manager.status().await {
        ServerStatus::Running { started_at, .. } => {
            let spawn_delay = (started_at - before).to_std()?;
            assert!(spawn_delay < Duration::from_millis(300), "{spawn_delay:?}");
        }
        other => bail!("expected a running server, got {other:?}"),
    }
    manager.shutdown().await;
    Ok(())
}
