//! User-facing launcher errors.
//!
//! Internal plumbing propagates `anyhow::Error` with context; the variants
//! here are the failures `main` needs to recognise to choose an exit code and
//! print a remediation hint.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Exit code reported when a required external binary cannot be located.
pub const EXIT_MISSING_BINARY: i32 = 2;
/// Exit code for any other fatal launcher error.
pub const EXIT_LAUNCH_FAILURE: i32 = 1;

#[derive(Debug, Error)]
pub enum LaunchError {
    /// A required external binary (target program or tmux) is not available.
    #[error("{name} binary not found at {location}")]
    MissingBinary {
        name: &'static str,
        location: String,
        hints: Vec<String>,
    },

    #[error("failed to create log directory {}: {source}", path.display())]
    LogDir { path: PathBuf, source: io::Error },

    #[error("failed to write log file {}: {source}", path.display())]
    LogFile { path: PathBuf, source: io::Error },

    #[error("failed to start {program}: {source}")]
    Spawn { program: String, source: io::Error },

    #[error("tmux {action} failed: {detail}")]
    Tmux { action: &'static str, detail: String },
}

impl LaunchError {
    pub fn missing_claude(location: impl Into<String>) -> Self {
        Self::MissingBinary {
            name: "claude",
            location: location.into(),
            hints: vec![
                "Install: npm install -g @anthropic-ai/claude-code".to_string(),
                "Or set CLAUDE_CODE_BIN=/path/to/claude".to_string(),
            ],
        }
    }

    pub fn missing_tmux() -> Self {
        Self::MissingBinary {
            name: "tmux",
            location: "PATH".to_string(),
            hints: vec![
                "Install tmux (e.g., `brew install tmux` or `sudo apt-get install -y tmux`)"
                    .to_string(),
            ],
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingBinary { .. } => EXIT_MISSING_BINARY,
            _ => EXIT_LAUNCH_FAILURE,
        }
    }

    /// Remediation lines printed after the one-line diagnostic.
    pub fn hints(&self) -> &[String] {
        match self {
            Self::MissingBinary { hints, .. } => hints,
            _ => &[],
        }
    }
}

/// Pick the process exit code for a fatal error bubbled up to `main`.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<LaunchError>()
        .map(LaunchError::exit_code)
        .unwrap_or(EXIT_LAUNCH_FAILURE)
}
