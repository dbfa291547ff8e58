//! Detached background runs with a timestamped log file.
//!
//! The child is started in its own session (no controlling terminal), with
//! stdin on `/dev/null` and stdout/stderr both going to a log file under the
//! configured log directory. The caller gets the pid and log path back as
//! soon as the process exists.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::error::LaunchError;
use crate::pty::PtyHelper;
use crate::watcher;

/// Fixed prefix of every background log file name.
pub const LOG_PREFIX: &str = "claude";

const MAX_NAME_ATTEMPTS: u32 = 100;

/// Metadata written at the top of every log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogHeader {
    /// Shell-escaped command line (before pty wrapping).
    pub command_line: String,
    pub started: DateTime<Local>,
    pub cwd: PathBuf,
}

impl LogHeader {
    pub fn new(cmd: &[String], started: DateTime<Local>, cwd: PathBuf) -> Result<Self> {
        let command_line = shlex::try_join(cmd.iter().map(String::as_str))
            .context("command contains a NUL byte")?;
        Ok(Self {
            command_line,
            started,
            cwd,
        })
    }

    pub fn render(&self) -> String {
        format!(
            "# Command: {}\n# Started: {}\n# CWD: {}\n\n",
            self.command_line,
            self.started.format("%Y-%m-%d %H:%M:%S"),
            self.cwd.display()
        )
    }
}

/// Artifact of one background launch. The file outlives the process.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub path: PathBuf,
    pub created_at: DateTime<Local>,
    pub header: LogHeader,
    pub pid: u32,
}

impl LogRecord {
    /// Print where the run lives and how to follow or stop it.
    pub fn report<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let log = self.path.display().to_string();
        let quoted = shlex::try_quote(&log).map_or_else(|_| log.clone(), |q| q.into_owned());
        writeln!(out, "Background process started:")?;
        writeln!(out, "  PID:  {}", self.pid)?;
        writeln!(out, "  Log:  {log}")?;
        writeln!(out, "  Tail: tail -f {quoted}")?;
        writeln!(out, "  Stop: kill {}", self.pid)?;
        Ok(())
    }
}

/// Inputs for [`launch`].
#[derive(Debug, Clone, Copy)]
pub struct BackgroundJob<'a> {
    pub cmd: &'a [String],
    pub cwd: Option<&'a Path>,
    pub log_dir: &'a Path,
    /// Spawn a watcher that raises a desktop notification on exit.
    pub notify: bool,
}

/// `<log_dir>/claude-<YYYYmmdd-HHMMSS>.log`
pub fn log_path_for(log_dir: &Path, at: &DateTime<Local>) -> PathBuf {
    log_dir.join(format!("{LOG_PREFIX}-{}.log", at.format("%Y%m%d-%H%M%S")))
}

/// Create the log file without clobbering a same-second run's log.
///
/// The timestamped name is tried first; on collision `-2`, `-3`, ... are
/// appended before the extension.
fn create_log_file(log_dir: &Path, at: &DateTime<Local>) -> Result<(PathBuf, File), LaunchError> {
    let base = log_path_for(log_dir, at);
    let mut candidate = base.clone();
    let mut attempt = 1;
    loop {
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && attempt < MAX_NAME_ATTEMPTS => {
                attempt += 1;
                let stem = base
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                candidate = base.with_file_name(format!("{stem}-{attempt}.log"));
            }
            Err(source) => {
                return Err(LaunchError::LogFile {
                    path: candidate,
                    source,
                });
            }
        }
    }
}

/// Start `job.cmd` detached and return without waiting for it.
pub fn launch(helper: &PtyHelper, job: &BackgroundJob<'_>) -> Result<LogRecord> {
    std::fs::create_dir_all(job.log_dir).map_err(|source| LaunchError::LogDir {
        path: job.log_dir.to_path_buf(),
        source,
    })?;

    let created_at = Local::now();
    let (path, mut file) = create_log_file(job.log_dir, &created_at)?;

    let cwd = match job.cwd {
        Some(dir) => std::path::absolute(dir),
        None => std::env::current_dir(),
    }
    .context("failed to determine working directory")?;
    let header = LogHeader::new(job.cmd, created_at, cwd)?;

    let log_err = |source| LaunchError::LogFile {
        path: path.clone(),
        source,
    };
    file.write_all(header.render().as_bytes()).map_err(log_err)?;
    file.flush().map_err(log_err)?;
    let stderr_log = file.try_clone().map_err(log_err)?;

    let mut command = helper.command(job.cmd, job.cwd)?;
    command
        .stdin(Stdio::null())
        .stdout(Stdio::from(file))
        .stderr(Stdio::from(stderr_log));
    detach(&mut command);

    let child = command.spawn().map_err(|source| LaunchError::Spawn {
        program: job.cmd.first().cloned().unwrap_or_default(),
        source,
    })?;
    let pid = child.id();
    info!(pid, log = %path.display(), wrapped = helper.is_wrapping(), "background process started");

    if job.notify {
        if let Err(e) = watcher::spawn_detached(pid) {
            warn!(pid, error = %e, "failed to start completion watcher");
        }
    }

    Ok(LogRecord {
        path,
        created_at,
        header,
        pid,
    })
}

/// Make the child a session leader so it has no controlling terminal and
/// survives the launcher's exit.
pub(crate) fn detach(command: &mut std::process::Command) {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // SAFETY: only async-signal-safe calls between fork and exec.
        unsafe {
            command.pre_exec(|| {
                if libc::setsid() == -1 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }
}
