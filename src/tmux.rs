//! tmux session management.
//!
//! Wraps the tmux CLI for the handful of operations the session controller
//! needs: session lifecycle, literal keystroke injection via `send-keys -l`,
//! and pane dumps via `capture-pane`. The [`Multiplexer`] trait is the seam
//! the controller drives, so it can be exercised against a recording fake.

use std::path::PathBuf;
use std::process::{Command, Output};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::error::LaunchError;
use crate::lookup;

/// Window name given to the single window of a fresh session.
pub const WINDOW_NAME: &str = "claude";

/// Operations the session controller needs from a terminal multiplexer.
pub trait Multiplexer {
    fn has_session(&self, session: &str) -> bool;

    /// Kill a session. Killing a session that does not exist is not an error.
    fn kill_session(&self, session: &str) -> Result<()>;

    /// Create a detached session with a single named window.
    fn new_session(&self, session: &str, window: &str) -> Result<()>;

    /// Type `text` into the pane literally (no key-name interpretation).
    fn send_literal(&self, target: &str, text: &str) -> Result<()>;

    /// Press a named key (`Enter`, `C-c`, ...).
    fn send_key(&self, target: &str, key: &str) -> Result<()>;

    /// Dump the pane with up to `lines` lines of scrollback.
    fn capture(&self, target: &str, lines: u32) -> Result<String>;
}

/// Pane target for the first pane of the first window: `<session>:0.0`.
pub fn pane_target(session: &str) -> String {
    format!("{session}:0.0")
}

/// Operator command to attach to a session.
pub fn attach_command(session: &str) -> String {
    format!("tmux attach -t {}", quote(session))
}

/// Operator command to dump the last `lines` lines of a pane.
pub fn snapshot_command(target: &str, lines: u32) -> String {
    format!("tmux capture-pane -p -J -t {} -S -{lines}", quote(target))
}

fn quote(value: &str) -> String {
    shlex::try_quote(value)
        .map(|q| q.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

/// Production [`Multiplexer`] backed by the `tmux` binary.
#[derive(Debug, Clone)]
pub struct Tmux {
    program: PathBuf,
}

impl Tmux {
    /// Locate `tmux` on `PATH`. Its absence is a precondition failure.
    pub fn locate() -> Result<Self, LaunchError> {
        let program = lookup::find_executable("tmux").ok_or_else(LaunchError::missing_tmux)?;
        debug!(tmux = %program.display(), "tmux found");
        Ok(Self { program })
    }

    fn run<I, S>(&self, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        Command::new(&self.program)
            .args(args)
            .output()
            .context("failed to run tmux command")
    }

    fn run_checked<I, S>(&self, action: &'static str, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let output = self.run(args)?;
        if !output.status.success() {
            let detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(LaunchError::Tmux { action, detail }.into());
        }
        Ok(output)
    }

    /// `tmux -V`, e.g. `tmux 3.4`.
    pub fn version(&self) -> Result<String> {
        let output = self.run_checked("-V", ["-V"])?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Multiplexer for Tmux {
    fn has_session(&self, session: &str) -> bool {
        self.run(["has-session", "-t", session])
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn kill_session(&self, session: &str) -> Result<()> {
        if !self.has_session(session) {
            return Ok(()); // already gone
        }
        self.run_checked("kill-session", ["kill-session", "-t", session])
            .with_context(|| format!("failed to kill tmux session '{session}'"))?;
        info!(session, "tmux session killed");
        Ok(())
    }

    fn new_session(&self, session: &str, window: &str) -> Result<()> {
        // Generous size so the TUI isn't cramped for whoever attaches later.
        self.run_checked(
            "new-session",
            [
                "new-session", "-d", "-s", session, "-n", window, "-x", "220", "-y", "50",
            ],
        )
        .with_context(|| format!("failed to create tmux session '{session}'"))?;
        info!(session, "tmux session created");
        Ok(())
    }

    fn send_literal(&self, target: &str, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        // `-l` keeps punctuation from being read as tmux key names.
        self.run_checked("send-keys", ["send-keys", "-t", target, "-l", "--", text])
            .with_context(|| format!("failed to send keys to target '{target}'"))?;
        debug!(target, keys = text, "sent keys");
        Ok(())
    }

    fn send_key(&self, target: &str, key: &str) -> Result<()> {
        self.run_checked("send-keys", ["send-keys", "-t", target, key])
            .with_context(|| format!("failed to send {key} to target '{target}'"))?;
        Ok(())
    }

    fn capture(&self, target: &str, lines: u32) -> Result<String> {
        let start = format!("-{lines}");
        let output = self
            .run_checked(
                "capture-pane",
                ["capture-pane", "-p", "-J", "-t", target, "-S", start.as_str()],
            )
            .with_context(|| format!("failed to capture pane for target '{target}'"))?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::time::Duration;

    use crate::poll::Poller;

    fn tmux_or_skip() -> Option<Tmux> {
        match Tmux::locate() {
            Ok(tmux) => Some(tmux),
            Err(_) => {
                eprintln!("tmux not installed; skipping");
                None
            }
        }
    }

    #[test]
    fn pane_target_is_first_pane_of_first_window() {
        assert_eq!(pane_target("claude-code"), "claude-code:0.0");
    }

    #[test]
    fn operator_commands_quote_session_names() {
        assert_eq!(attach_command("claude-code"), "tmux attach -t claude-code");
        assert_eq!(attach_command("my session"), "tmux attach -t 'my session'");
        assert_eq!(
            snapshot_command("claude-code:0.0", 200),
            "tmux capture-pane -p -J -t claude-code:0.0 -S -200"
        );
    }

    #[test]
    #[serial]
    fn version_reports_tmux() {
        let Some(tmux) = tmux_or_skip() else { return };
        let version = tmux.version().unwrap();
        assert!(version.starts_with("tmux"), "unexpected: {version}");
    }

    #[test]
    #[serial]
    fn nonexistent_session_does_not_exist() {
        let Some(tmux) = tmux_or_skip() else { return };
        assert!(!tmux.has_session("claude-launch-test-nonexistent-12345"));
    }

    #[test]
    #[serial]
    fn kill_nonexistent_session_is_ok() {
        let Some(tmux) = tmux_or_skip() else { return };
        tmux.kill_session("claude-launch-test-nonexistent-kill-99999")
            .unwrap();
    }

    #[test]
    #[serial]
    fn create_and_kill_session() {
        let Some(tmux) = tmux_or_skip() else { return };
        let session = "claude-launch-test-lifecycle";
        let _ = tmux.kill_session(session);

        tmux.new_session(session, WINDOW_NAME).unwrap();
        assert!(tmux.has_session(session));

        tmux.kill_session(session).unwrap();
        assert!(!tmux.has_session(session));
    }

    #[test]
    #[serial]
    fn duplicate_session_is_error() {
        let Some(tmux) = tmux_or_skip() else { return };
        let session = "claude-launch-test-dup";
        let _ = tmux.kill_session(session);

        tmux.new_session(session, WINDOW_NAME).unwrap();
        let err = tmux.new_session(session, WINDOW_NAME).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LaunchError>(),
            Some(LaunchError::Tmux { action: "new-session", .. })
        ));

        tmux.kill_session(session).unwrap();
    }

    #[test]
    #[serial]
    fn literal_keys_show_up_in_capture() {
        let Some(tmux) = tmux_or_skip() else { return };
        let session = "claude-launch-test-capture";
        let _ = tmux.kill_session(session);
        tmux.new_session(session, WINDOW_NAME).unwrap();
        let target = pane_target(session);

        tmux.send_literal(&target, "echo 'capture;marker' | tr ';' '-'")
            .unwrap();
        tmux.send_key(&target, "Enter").unwrap();

        let poller = Poller::new(Duration::from_millis(100), Duration::from_secs(5));
        let outcome = poller.wait_for("capture-marker", || tmux.capture(&target, 200));

        tmux.kill_session(session).unwrap();
        assert!(outcome.is_matched(), "expected echoed marker in pane");
    }

    #[test]
    #[serial]
    fn capture_of_missing_session_is_tmux_error() {
        let Some(tmux) = tmux_or_skip() else { return };
        let err = tmux
            .capture("claude-launch-test-missing-capture:0.0", 10)
            .unwrap_err();
        assert!(err.downcast_ref::<LaunchError>().is_some());
    }
}
