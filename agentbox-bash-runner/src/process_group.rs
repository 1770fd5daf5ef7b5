//! Process-group helpers for reliable child cleanup.
//!
//! Every command agentbox spawns becomes the leader of a fresh session, so the
//! whole tree it forks (`sh -c` → `npm` → `node` → …) can be signalled at once
//! through the group id, which equals the leader's pid.
//!
//! - `detach_from_tty` runs in `pre_exec` and starts a new session.
//! - `set_parent_death_signal` (Linux only) makes the child receive `SIGTERM`
//!   if agentbox itself dies, so a crashed agent does not leave a dev server
//!   running.
//! - `kill_process_group_with_signal` targets a known group id.

use std::io;

/// Signal to send when terminating process groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KillSignal {
    /// SIGTERM - allows graceful shutdown
    Term,
    /// SIGKILL - immediate termination
    #[default]
    Kill,
}

#[cfg(unix)]
impl KillSignal {
    fn as_libc_signal(self) -> libc::c_int {
        match self {
            KillSignal::Term => libc::SIGTERM,
            KillSignal::Kill => libc::SIGKILL,
        }
    }
}

/// Ensure the child receives SIGTERM when the original parent dies.
///
/// Runs in `pre_exec`; `parent_pid` is captured before the fork so a parent
/// that exits between fork and exec is still noticed.
#[cfg(target_os = "linux")]
pub fn set_parent_death_signal(parent_pid: libc::pid_t) -> io::Result<()> {
    if unsafe { libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) } == -1 {
        return Err(io::Error::last_os_error());
    }

    if unsafe { libc::getppid() } != parent_pid {
        unsafe {
            libc::raise(libc::SIGTERM);
        }
    }

    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn set_parent_death_signal(_parent_pid: i32) -> io::Result<()> {
    Ok(())
}

/// Start a new session so the child leads its own process group and has no
/// controlling terminal.
#[cfg(unix)]
pub fn detach_from_tty() -> io::Result<()> {
    let result = unsafe { libc::setsid() };
    if result == -1 {
        let err = io::Error::last_os_error();
        // EPERM: already a session leader, a plain group is enough.
        if err.raw_os_error() == Some(libc::EPERM) {
            return set_process_group();
        }
        return Err(err);
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn detach_from_tty() -> io::Result<()> {
    Ok(())
}

/// Put the calling process into its own process group.
#[cfg(unix)]
pub fn set_process_group() -> io::Result<()> {
    let result = unsafe { libc::setpgid(0, 0) };
    if result == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(not(unix))]
pub fn set_process_group() -> io::Result<()> {
    Ok(())
}

/// SIGKILL a process group (best-effort; a vanished group is not an error).
pub fn kill_process_group(process_group_id: u32) -> io::Result<()> {
    kill_process_group_with_signal(process_group_id, KillSignal::Kill)
}

/// Send `signal` to every process in the group.
#[cfg(unix)]
pub fn kill_process_group_with_signal(process_group_id: u32, signal: KillSignal) -> io::Result<()> {
    let Ok(pgid) = libc::pid_t::try_from(process_group_id) else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("process group id {process_group_id} out of range"),
        ));
    };
    let result = unsafe { libc::killpg(pgid, signal.as_libc_signal()) };
    if result == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err);
        }
    }

    Ok(())
}

#[cfg(not(unix))]
pub fn kill_process_group_with_signal(
    _process_group_id: u32,
    _signal: KillSignal,
) -> io::Result<()> {
    Ok(())
}

/// True if a process with this pid exists (zombies included).
#[cfg(unix)]
pub fn is_process_running(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // Signal 0 only checks for existence.
    let result = unsafe { libc::kill(pid, 0) };
    if result == 0 {
        return true;
    }
    // EPERM: exists but owned by someone else.
    io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
pub fn is_process_running(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_signal_defaults_to_kill() {
        assert_eq!(KillSignal::default(), KillSignal::Kill);
        assert_ne!(KillSignal::Term, KillSignal::Kill);
    }

    #[cfg(unix)]
    #[test]
    fn killing_missing_group_is_not_an_error() {
        assert!(kill_process_group_with_signal(2_000_000_000, KillSignal::Term).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn own_process_is_running() {
        assert!(is_process_running(std::process::id()));
    }

    #[cfg(unix)]
    #[test]
    fn absent_pid_is_not_running() {
        assert!(!is_process_running(2_000_000_000));
    }
}
