//! Desktop notification and clipboard side effects.
//!
//! Both are advisory: every failure is logged and swallowed so they can never
//! change the outcome of the run they report on.

use std::io::{Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use arboard::Clipboard;
use tracing::debug;

use crate::background::detach;
use crate::lookup;

pub const NOTIFICATION_TITLE: &str = "Claude Code";

/// Hidden subcommand that owns the clipboard selection after we exit.
pub const HOLD_SUBCOMMAND: &str = "hold-clipboard";

/// Send a desktop notification. Never fails.
pub fn notify(title: &str, message: &str) {
    if let Err(e) = try_notify(title, message) {
        debug!(error = %e, "desktop notification not delivered");
    }
}

fn try_notify(title: &str, message: &str) -> Result<()> {
    let mut cmd = if cfg!(target_os = "macos") {
        let mut cmd = Command::new("osascript");
        cmd.arg("-e").arg(applescript_notification(title, message));
        cmd
    } else {
        let notifier = lookup::find_executable("notify-send").context("notify-send not found")?;
        let mut cmd = Command::new(notifier);
        cmd.arg(title).arg(message);
        cmd
    };
    let output = cmd
        .stdin(Stdio::null())
        .output()
        .context("failed to run notifier")?;
    if !output.status.success() {
        bail!(
            "notifier exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

/// AppleScript `display notification` statement with string escaping.
pub fn applescript_notification(title: &str, message: &str) -> String {
    format!(
        "display notification \"{}\" with title \"{}\"",
        applescript_escape(message),
        applescript_escape(title)
    )
}

fn applescript_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Copy `text` to the system clipboard. Never fails.
///
/// On X11 and Wayland the selection lives only as long as the process that
/// set it, so the copy is handed to a detached `hold-clipboard` process.
pub fn copy_to_clipboard(text: &str) {
    let result = if HANDS_OFF_SELECTION {
        spawn_holder(text)
    } else {
        set_clipboard(text)
    };
    if let Err(e) = result {
        debug!(error = %e, "clipboard copy skipped");
    }
}

const HANDS_OFF_SELECTION: bool = cfg!(all(
    unix,
    not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
));

fn set_clipboard(text: &str) -> Result<()> {
    let mut clipboard = Clipboard::new().context("clipboard unavailable")?;
    clipboard
        .set_text(text)
        .context("failed to set clipboard text")?;
    debug!(bytes = text.len(), "copied output to clipboard");
    Ok(())
}

fn holder_command(exe: &Path) -> Command {
    let mut cmd = Command::new(exe);
    cmd.arg(HOLD_SUBCOMMAND)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    detach(&mut cmd);
    cmd
}

fn spawn_holder(text: &str) -> Result<()> {
    let exe = std::env::current_exe().context("failed to locate own executable")?;
    let mut child = holder_command(&exe)
        .spawn()
        .context("failed to spawn clipboard holder")?;
    let mut stdin = child.stdin.take().context("clipboard holder has no stdin")?;
    stdin
        .write_all(text.as_bytes())
        .context("failed to hand text to clipboard holder")?;
    drop(stdin);
    debug!(bytes = text.len(), holder = child.id(), "clipboard holder started");
    Ok(())
}

/// Entry point of the `hold-clipboard` subcommand: read all of `input`, set it
/// as the clipboard text and block until another program takes the selection.
pub fn hold_clipboard<R: Read>(mut input: R) -> Result<()> {
    let mut text = String::new();
    input
        .read_to_string(&mut text)
        .context("clipboard text is not valid UTF-8")?;
    let mut clipboard = Clipboard::new().context("clipboard unavailable")?;
    #[cfg(all(
        unix,
        not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
    ))]
    {
        use arboard::SetExtLinux;
        clipboard
            .set()
            .wait()
            .text(text)
            .context("failed to hold clipboard text")?;
    }
    #[cfg(not(all(
        unix,
        not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
    )))]
    clipboard
        .set_text(text)
        .context("failed to set clipboard text")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applescript_escapes_quotes_and_backslashes() {
        assert_eq!(
            applescript_notification("Claude Code", r#"said "hi" \o/"#),
            r#"display notification "said \"hi\" \\o/" with title "Claude Code""#
        );
    }

    #[test]
    fn holder_runs_hidden_subcommand_with_piped_stdin() {
        let cmd = holder_command(Path::new("/usr/local/bin/claude-launch"));
        assert_eq!(cmd.get_program(), "/usr/local/bin/claude-launch");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, vec![HOLD_SUBCOMMAND]);
    }

    #[test]
    fn hold_rejects_non_utf8_input_before_touching_clipboard() {
        let err = hold_clipboard(b"\xff\xfe\x00".as_slice()).unwrap_err();
        assert!(format!("{err:#}").contains("not valid UTF-8"));
    }

    #[test]
    fn hold_subcommand_is_wired_into_cli() {
        use crate::cli::{Cli, Command as CliCommand};
        use clap::Parser;

        let cli = Cli::try_parse_from(["claude-launch", HOLD_SUBCOMMAND]).unwrap();
        assert!(matches!(cli.command, Some(CliCommand::HoldClipboard)));
    }
}
