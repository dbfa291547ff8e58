//! Pseudo-terminal wrapping via `script(1)`.
//!
//! `claude` can hang when started without a TTY. Running it under `script`
//! with the transcript discarded gives it a pty while the real stdio stays
//! whatever the caller handed us. When `script` is not installed we run the
//! command directly; some inputs work without a terminal.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::error::LaunchError;
use crate::lookup;

const HELPER_NAME: &str = "script";
const NULL_TRANSCRIPT: &str = "/dev/null";
/// Shell util-linux `script -c` is pointed at through `SHELL`.
const POSIX_SHELL: &str = "/bin/sh";

/// Argument conventions differ between BSD and util-linux `script`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptFlavor {
    /// `script -q /dev/null cmd args...`
    Bsd,
    /// `script -q -e -c "cmd args..." /dev/null`
    UtilLinux,
}

impl ScriptFlavor {
    pub fn native() -> Self {
        if cfg!(target_os = "linux") {
            Self::UtilLinux
        } else {
            Self::Bsd
        }
    }
}

/// Result of probing for the pty helper, made once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PtyHelper {
    Script { path: PathBuf, flavor: ScriptFlavor },
    Direct,
}

impl PtyHelper {
    pub fn probe() -> Self {
        Self::probe_in(std::env::var_os("PATH"))
    }

    /// Probe against an explicit `PATH`-style value.
    pub fn probe_in(path_var: Option<OsString>) -> Self {
        match lookup::find_in_path(HELPER_NAME, path_var) {
            Some(path) => {
                debug!(helper = %path.display(), "pty helper available");
                Self::Script {
                    path,
                    flavor: ScriptFlavor::native(),
                }
            }
            None => {
                info!("`script` not found on PATH; running without a pseudo-terminal");
                Self::Direct
            }
        }
    }

    pub fn is_wrapping(&self) -> bool {
        matches!(self, Self::Script { .. })
    }

    /// Build the full command vector, prefixed by the helper when present.
    pub fn wrap(&self, cmd: &[String]) -> Result<Vec<String>> {
        let Self::Script { path, flavor } = self else {
            return Ok(cmd.to_vec());
        };
        let helper = path.display().to_string();
        let wrapped = match flavor {
            ScriptFlavor::Bsd => {
                let mut full = vec![helper, "-q".to_string(), NULL_TRANSCRIPT.to_string()];
                full.extend(cmd.iter().cloned());
                full
            }
            ScriptFlavor::UtilLinux => {
                let line = script_line(cmd, std::env::var("SHELL").ok().as_deref())?;
                vec![
                    helper,
                    "-q".to_string(),
                    "-e".to_string(),
                    "-c".to_string(),
                    line,
                    NULL_TRANSCRIPT.to_string(),
                ]
            }
        };
        Ok(wrapped)
    }

    /// Prepare a `Command` for `cmd`, wrapped when the helper is available.
    pub fn command(&self, cmd: &[String], cwd: Option<&Path>) -> Result<Command> {
        let full = self.wrap(cmd)?;
        let (program, args) = full
            .split_first()
            .context("cannot run an empty command vector")?;
        let mut command = Command::new(program);
        command.args(args);
        if let Self::Script {
            flavor: ScriptFlavor::UtilLinux,
            ..
        } = self
        {
            command.env("SHELL", POSIX_SHELL);
        }
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        Ok(command)
    }
}

/// Command string for util-linux `script -c`.
///
/// `script` runs it with `$SHELL -c`, which [`PtyHelper::command`] pins to
/// `/bin/sh` so the POSIX quoting from `shlex` holds under csh, fish or nu.
/// The line restores the caller's `SHELL` before exec'ing the command.
fn script_line(cmd: &[String], user_shell: Option<&str>) -> Result<String> {
    let joined = shlex::try_join(cmd.iter().map(String::as_str))
        .context("command contains a NUL byte and cannot be passed to script -c")?;
    let line = match user_shell {
        Some(shell) => {
            let shell = shlex::try_quote(shell).context("SHELL contains a NUL byte")?;
            format!("SHELL={shell} exec {joined}")
        }
        None => format!("unset SHELL; exec {joined}"),
    };
    Ok(line)
}

/// Output of a run whose streams were captured instead of inherited.
#[derive(Debug)]
pub struct CapturedRun {
    pub exit_code: i32,
    pub stdout: String,
}

/// Run `cmd` to completion with inherited stdio and return its exit code.
pub fn run_sync(helper: &PtyHelper, cmd: &[String], cwd: Option<&Path>) -> Result<i32> {
    let mut command = helper.command(cmd, cwd)?;
    info!(
        program = %cmd.first().map(String::as_str).unwrap_or_default(),
        wrapped = helper.is_wrapping(),
        "running synchronously"
    );
    let status = command.status().map_err(|source| LaunchError::Spawn {
        program: program_label(cmd),
        source,
    })?;
    Ok(exit_code(status))
}

/// Run `cmd` to completion capturing stdout/stderr.
///
/// Both streams are echoed to ours after the child exits; stdout is also
/// returned so it can be copied elsewhere.
pub fn run_captured(helper: &PtyHelper, cmd: &[String], cwd: Option<&Path>) -> Result<CapturedRun> {
    let mut command = helper.command(cmd, cwd)?;
    let output = command.output().map_err(|source| LaunchError::Spawn {
        program: program_label(cmd),
        source,
    })?;

    std::io::stdout()
        .write_all(&output.stdout)
        .context("failed to forward captured stdout")?;
    if !output.stderr.is_empty() {
        std::io::stderr()
            .write_all(&output.stderr)
            .context("failed to forward captured stderr")?;
    }

    Ok(CapturedRun {
        exit_code: exit_code(output.status),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
    })
}

fn program_label(cmd: &[String]) -> String {
    cmd.first().cloned().unwrap_or_default()
}

/// Exit code of a finished child; signals map to `128 + signo`.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[test]
    fn direct_helper_leaves_command_untouched() {
        let cmd = vec!["claude".to_string(), "-p".to_string(), "hi there".to_string()];
        assert_eq!(PtyHelper::Direct.wrap(&cmd).unwrap(), cmd);
    }

    #[test]
    fn bsd_script_prefixes_quiet_null_transcript() {
        let helper = PtyHelper::Script {
            path: PathBuf::from("/usr/bin/script"),
            flavor: ScriptFlavor::Bsd,
        };
        let cmd = vec!["claude".to_string(), "-p".to_string(), "hi there".to_string()];
        assert_eq!(
            helper.wrap(&cmd).unwrap(),
            vec!["/usr/bin/script", "-q", "/dev/null", "claude", "-p", "hi there"]
        );
    }

    #[test]
    fn util_linux_script_joins_command_for_dash_c() {
        let helper = PtyHelper::Script {
            path: PathBuf::from("/usr/bin/script"),
            flavor: ScriptFlavor::UtilLinux,
        };
        let cmd = vec!["claude".to_string(), "-p".to_string(), "it's here".to_string()];
        let wrapped = helper.wrap(&cmd).unwrap();

        assert_eq!(&wrapped[..4], &["/usr/bin/script", "-q", "-e", "-c"]);
        assert_eq!(wrapped[5], "/dev/null");
        let words = shlex::split(&wrapped[4]).unwrap();
        let tail = words.len() - cmd.len();
        assert_eq!(&words[tail..], &cmd[..]);
        assert_eq!(words[tail - 1], "exec");
    }

    #[test]
    fn script_line_restores_callers_shell() {
        let cmd = vec!["claude".to_string(), "-p".to_string(), "line one\nline two".to_string()];
        let line = script_line(&cmd, Some("/usr/local/bin/my fish")).unwrap();
        assert!(line.starts_with("SHELL='/usr/local/bin/my fish' exec "));

        let words = shlex::split(&line).unwrap();
        assert_eq!(words[0], "SHELL=/usr/local/bin/my fish");
        assert_eq!(&words[2..], &cmd[..]);
    }

    #[test]
    fn script_line_unsets_shell_when_caller_had_none() {
        let line = script_line(&["true".to_string()], None).unwrap();
        assert_eq!(line, "unset SHELL; exec true");
    }

    #[test]
    fn util_linux_command_pins_posix_shell() {
        let helper = PtyHelper::Script {
            path: PathBuf::from("/usr/bin/script"),
            flavor: ScriptFlavor::UtilLinux,
        };
        let command = helper.command(&["true".to_string()], None).unwrap();
        let shell = command
            .get_envs()
            .find(|(key, _)| *key == "SHELL")
            .and_then(|(_, value)| value);
        assert_eq!(shell, Some(std::ffi::OsStr::new("/bin/sh")));

        let bsd = PtyHelper::Script {
            path: PathBuf::from("/usr/bin/script"),
            flavor: ScriptFlavor::Bsd,
        };
        let command = bsd.command(&["true".to_string()], None).unwrap();
        assert_eq!(command.get_envs().count(), 0);
    }

    #[test]
    fn falls_back_to_direct_without_script_on_path() {
        let empty = tempfile::tempdir().unwrap();
        let helper = PtyHelper::probe_in(Some(empty.path().as_os_str().to_owned()));
        assert_eq!(helper, PtyHelper::Direct);
        assert!(!helper.is_wrapping());
    }

    #[test]
    fn script_on_given_path_is_used() {
        use std::os::unix::fs::PermissionsExt;

        let bin = tempfile::tempdir().unwrap();
        let fake = bin.path().join("script");
        std::fs::write(&fake, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let helper = PtyHelper::probe_in(Some(bin.path().as_os_str().to_owned()));
        assert_eq!(
            helper,
            PtyHelper::Script {
                path: fake,
                flavor: ScriptFlavor::native(),
            }
        );
    }

    fn wrapping_helper_or_skip() -> Option<PtyHelper> {
        let helper = PtyHelper::probe();
        if helper.is_wrapping() {
            Some(helper)
        } else {
            eprintln!("script not installed; skipping");
            None
        }
    }

    #[test]
    #[serial]
    fn wrapped_run_propagates_exit_code() {
        let Some(helper) = wrapping_helper_or_skip() else { return };
        assert_eq!(run_sync(&helper, &sh("exit 3"), None).unwrap(), 3);
        assert_eq!(run_sync(&helper, &sh("exit 0"), None).unwrap(), 0);
    }

    #[test]
    #[serial]
    fn wrapped_run_sees_callers_shell() {
        let Some(helper) = wrapping_helper_or_skip() else { return };
        let expected = std::env::var("SHELL").unwrap_or_else(|_| "unset".to_string());
        let cmd = vec![
            "sh".to_string(),
            "-c".to_string(),
            "test \"${SHELL-unset}\" = \"$0\"".to_string(),
            expected,
        ];
        assert_eq!(run_sync(&helper, &cmd, None).unwrap(), 0);
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(PtyHelper::Direct.command(&[], None).is_err());
    }

    #[test]
    fn run_sync_propagates_exit_code() {
        let code = run_sync(&PtyHelper::Direct, &sh("exit 3"), None).unwrap();
        assert_eq!(code, 3);
    }

    #[test]
    fn run_sync_reports_signal_deaths_shell_style() {
        let code = run_sync(&PtyHelper::Direct, &sh("kill -9 $$"), None).unwrap();
        assert_eq!(code, 137);
    }

    #[test]
    fn run_sync_honours_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = dir.path().canonicalize().unwrap();
        let script = format!("test \"$(pwd -P)\" = '{}'", canonical.display());

        let code = run_sync(&PtyHelper::Direct, &sh(&script), Some(dir.path())).unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn run_sync_missing_program_is_spawn_error() {
        let cmd = vec!["/nonexistent/definitely-not-here".to_string()];
        let err = run_sync(&PtyHelper::Direct, &cmd, None).unwrap_err();
        let launch = err.downcast_ref::<LaunchError>().unwrap();
        assert!(matches!(launch, LaunchError::Spawn { .. }));
    }

    #[test]
    fn run_captured_returns_stdout_and_code() {
        let run = run_captured(&PtyHelper::Direct, &sh("echo captured; exit 4"), None).unwrap();
        assert_eq!(run.exit_code, 4);
        assert_eq!(run.stdout, "captured\n");
    }
}
