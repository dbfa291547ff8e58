//! Completion watcher for background runs.
//!
//! Runs as a separate, detached `claude-launch watch-pid <PID>` process so it
//! outlives both the launcher and the run it watches. Its only job is to poll
//! the pid's liveness and raise a desktop notification once it is gone.
//! Nothing reports back to the launcher.

use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::background::detach;
use crate::desktop;

/// How often the watcher checks whether the process is still alive.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Hidden subcommand the launcher re-invokes itself with.
pub const SUBCOMMAND: &str = "watch-pid";

/// Start a detached watcher for `pid` and forget about it.
pub fn spawn_detached(pid: u32) -> Result<()> {
    let exe = std::env::current_exe().context("failed to locate own executable")?;
    let mut cmd = Command::new(exe);
    cmd.arg(SUBCOMMAND)
        .arg(pid.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    detach(&mut cmd);
    let child = cmd.spawn().context("failed to spawn completion watcher")?;
    debug!(watched = pid, watcher = child.id(), "completion watcher started");
    Ok(())
}

/// Whether a process with this pid exists (signal 0 probe).
#[cfg(unix)]
pub fn is_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: signal 0 performs only the existence/permission check.
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

/// Block until `pid` no longer exists.
pub fn wait_until_gone(pid: u32, interval: Duration) {
    while is_alive(pid) {
        std::thread::sleep(interval);
    }
}

/// Entry point of the `watch-pid` subcommand.
pub fn run(pid: u32) -> Result<()> {
    info!(pid, "watching background process");
    wait_until_gone(pid, POLL_INTERVAL);
    desktop::notify(
        desktop::NOTIFICATION_TITLE,
        &format!("Background task finished (PID {pid})"),
    );
    Ok(())
}
