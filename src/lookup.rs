//! Executable lookup on the search path.
//!
//! Used for the target program when the configured path does not exist, and
//! for the optional helpers (`script`, `tmux`) the launcher wraps it with.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::LaunchError;

/// Name looked up on `PATH` when the configured target binary is missing.
pub const TARGET_PROGRAM: &str = "claude";

/// Find `name` on the process `PATH`.
///
/// Returns the first candidate, in `PATH` order, that is a regular file with
/// execute permission. Unreadable or missing directories are skipped.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    find_in_path(name, std::env::var_os("PATH"))
}

/// Same as [`find_executable`] against an explicit `PATH`-style value.
pub fn find_in_path(name: &str, path_var: Option<OsString>) -> Option<PathBuf> {
    let path_var = path_var.filter(|p| !p.is_empty())?;
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
    match which::which_in(name, Some(path_var), cwd) {
        Ok(found) => {
            debug!(name, path = %found.display(), "executable found");
            Some(found)
        }
        Err(e) => {
            debug!(name, error = %e, "executable not found on PATH");
            None
        }
    }
}

/// Resolve the target program.
///
/// A configured path that exists is used verbatim; otherwise `claude` is
/// looked up on `PATH`. When neither works the error names the configured
/// location.
pub fn resolve_target(configured: &Path) -> Result<PathBuf, LaunchError> {
    resolve_target_in(configured, std::env::var_os("PATH"))
}

fn resolve_target_in(configured: &Path, path_var: Option<OsString>) -> Result<PathBuf, LaunchError> {
    if configured.exists() {
        return Ok(configured.to_path_buf());
    }
    debug!(
        configured = %configured.display(),
        "configured target missing, falling back to PATH lookup"
    );
    find_in_path(TARGET_PROGRAM, path_var)
        .ok_or_else(|| LaunchError::missing_claude(configured.display().to_string()))
}
