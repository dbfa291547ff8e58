use std::path::{Path, PathBuf};

/// Where the claude installer puts the binary by default.
const DEFAULT_CLAUDE_BIN: &str = "~/.local/bin/claude";
const DEFAULT_LOG_DIR: &str = "~/.claude/logs/headless";

/// Expand a leading `~` or `~/` to the home directory.
///
/// Paths without a leading tilde, `~user` forms, and everything when no home
/// directory is known are returned unchanged.
pub fn expand_tilde(raw: &str) -> PathBuf {
    expand_tilde_with(raw, dirs::home_dir().as_deref())
}

fn expand_tilde_with(raw: &str, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return PathBuf::from(raw);
    };
    if raw == "~" {
        return home.to_path_buf();
    }
    match raw.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(raw),
    }
}

pub fn default_claude_bin() -> PathBuf {
    expand_tilde(DEFAULT_CLAUDE_BIN)
}

pub fn default_log_dir() -> PathBuf {
    expand_tilde(DEFAULT_LOG_DIR)
}
