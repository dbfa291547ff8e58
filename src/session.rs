//! Interactive tmux session controller.
//!
//! Drives `claude` through a scripted sequence of keystrokes inside a named
//! tmux session, synchronising on pane content rather than fixed delays:
//!
//! ```text
//! INIT        → kill stale session (best-effort), create a fresh one
//! LAUNCH      → type `cd <cwd> && claude ...`, press Enter
//! TRUST       → wait for the folder-trust prompt; accept it if shown
//! SEND        → type each non-blank prompt line, Enter, pause
//! REPORT      → print attach / snapshot commands
//! SNAPSHOT    → optionally wait, then print the last 200 pane lines
//! ```
//!
//! The session is left running on return; the operator owns it from then on.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::poll::Poller;
use crate::tmux::{self, Multiplexer};

/// Scrollback depth used for both prompt polling and the final snapshot.
pub const CAPTURE_LINES: u32 = 200;

/// Text of the first-run workspace trust confirmation.
pub const TRUST_PROMPT_TEXT: &str = "Yes, I trust this folder";

/// Identifies the session and the pane keystrokes are sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub name: String,
    pub target: String,
}

impl SessionHandle {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            target: tmux::pane_target(name),
        }
    }
}

/// How the trust prompt is detected and answered.
#[derive(Debug, Clone)]
pub struct TrustPromptPolicy {
    pub text: String,
    /// Initial wait for the prompt to appear.
    pub first: Poller,
    /// Pause after the first Enter before looking again.
    pub settle: Duration,
    /// Short re-check for the identically-rendered second step.
    pub recheck: Poller,
}

impl Default for TrustPromptPolicy {
    fn default() -> Self {
        Self {
            text: TRUST_PROMPT_TEXT.to_string(),
            first: Poller::new(Duration::from_millis(500), Duration::from_secs(20)),
            settle: Duration::from_millis(800),
            recheck: Poller::new(Duration::from_millis(500), Duration::from_secs(2)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustOutcome {
    NotShown,
    Accepted,
    /// A second confirmation step was shown and answered with `1`.
    AcceptedTwice,
}

/// Everything needed to start one interactive session.
#[derive(Debug, Clone)]
pub struct InteractivePlan {
    pub session: String,
    pub cwd: PathBuf,
    /// Target program followed by its interactive-mode arguments.
    pub argv: Vec<String>,
    pub prompt: Option<String>,
    pub send_delay: Duration,
    /// Zero disables the trailing snapshot.
    pub snapshot_wait: Duration,
    pub trust: TrustPromptPolicy,
}

/// Shell line typed into the fresh pane to start the target program.
pub fn launch_line(cwd: &Path, argv: &[String]) -> Result<String> {
    let cwd = cwd.to_string_lossy();
    let cwd = shlex::try_quote(&cwd).context("working directory contains a NUL byte")?;
    let command = shlex::try_join(argv.iter().map(String::as_str))
        .context("command contains a NUL byte")?;
    Ok(format!("cd {cwd} && {command}"))
}

/// Non-blank lines of a prompt, in order, as they will be typed.
///
/// `\r\n`, `\n` and a lone `\r` all end a line.
pub fn prompt_lines(prompt: &str) -> impl Iterator<Item = &str> {
    prompt
        .split(['\n', '\r'])
        .filter(|line| !line.trim().is_empty())
}

pub struct SessionController<M> {
    mux: M,
}

impl<M: Multiplexer> SessionController<M> {
    pub fn new(mux: M) -> Self {
        Self { mux }
    }

    /// Run the whole state machine, writing the operator report to `out`.
    pub fn run<W: Write>(&self, plan: &InteractivePlan, out: &mut W) -> Result<SessionHandle> {
        let handle = self.init(&plan.session)?;
        self.launch(&handle, &plan.cwd, &plan.argv)?;
        let trust = self.accept_trust_prompt(&handle, &plan.trust);
        debug!(session = %handle.name, ?trust, "trust prompt handled");
        if let Some(prompt) = plan.prompt.as_deref() {
            self.send_prompt(&handle, prompt, plan.send_delay)?;
        }
        report(&handle, out)?;
        if !plan.snapshot_wait.is_zero() {
            self.snapshot(&handle, plan.snapshot_wait, out)?;
        }
        Ok(handle)
    }

    /// Replace any session of the same name with a fresh one.
    pub fn init(&self, session: &str) -> Result<SessionHandle> {
        if let Err(e) = self.mux.kill_session(session) {
            debug!(session, error = %e, "ignoring failure to kill previous session");
        }
        self.mux.new_session(session, tmux::WINDOW_NAME)?;
        Ok(SessionHandle::new(session))
    }

    pub fn launch(&self, handle: &SessionHandle, cwd: &Path, argv: &[String]) -> Result<()> {
        let line = launch_line(cwd, argv)?;
        info!(session = %handle.name, cwd = %cwd.display(), "launching in tmux");
        self.mux.send_literal(&handle.target, &line)?;
        self.mux.send_key(&handle.target, "Enter")?;
        Ok(())
    }

    /// Accept the workspace trust prompt if it shows up.
    ///
    /// Never fails: a prompt that never appears is the common case, and the
    /// key presses here are best-effort.
    pub fn accept_trust_prompt(
        &self,
        handle: &SessionHandle,
        policy: &TrustPromptPolicy,
    ) -> TrustOutcome {
        let capture = || self.mux.capture(&handle.target, CAPTURE_LINES);

        if !policy.first.wait_for(&policy.text, capture).is_matched() {
            return TrustOutcome::NotShown;
        }
        self.press_best_effort(handle, "Enter");
        std::thread::sleep(policy.settle);

        if !policy.recheck.wait_for(&policy.text, capture).is_matched() {
            return TrustOutcome::Accepted;
        }
        if let Err(e) = self.mux.send_literal(&handle.target, "1") {
            warn!(target = %handle.target, error = %e, "failed to answer second trust step");
        }
        self.press_best_effort(handle, "Enter");
        TrustOutcome::AcceptedTwice
    }

    fn press_best_effort(&self, handle: &SessionHandle, key: &str) {
        if let Err(e) = self.mux.send_key(&handle.target, key) {
            warn!(target = %handle.target, key, error = %e, "key press failed");
        }
    }

    /// Type each non-blank line, pausing between lines so the input buffer
    /// doesn't drop keystrokes.
    pub fn send_prompt(&self, handle: &SessionHandle, prompt: &str, delay: Duration) -> Result<()> {
        for line in prompt_lines(prompt) {
            self.mux.send_literal(&handle.target, line)?;
            self.mux.send_key(&handle.target, "Enter")?;
            std::thread::sleep(delay);
        }
        Ok(())
    }

    /// Sleep, then print the tail of the pane. Capture errors are ignored:
    /// the program may have exited and taken the session with it.
    pub fn snapshot<W: Write>(&self, handle: &SessionHandle, wait: Duration, out: &mut W) -> Result<()> {
        std::thread::sleep(wait);
        match self.mux.capture(&handle.target, CAPTURE_LINES) {
            Ok(snap) => {
                writeln!(out, "\n--- tmux snapshot (last {CAPTURE_LINES} lines) ---\n")?;
                writeln!(out, "{snap}")?;
            }
            Err(e) => debug!(target = %handle.target, error = %e, "snapshot capture failed"),
        }
        Ok(())
    }
}

fn report<W: Write>(handle: &SessionHandle, out: &mut W) -> Result<()> {
    writeln!(out, "Interactive claude started in tmux session: {}", handle.name)?;
    writeln!(out, "  Attach:   {}", tmux::attach_command(&handle.name))?;
    writeln!(
        out,
        "  Snapshot: {}",
        tmux::snapshot_command(&handle.target, CAPTURE_LINES)
    )?;
    Ok(())
}
