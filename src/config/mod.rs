use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::mode::ModeFlag;

const CONFIG_FILENAME: &str = "config.toml";
const CONFIG_DIR: &str = ".claude-launch";

fn default_session() -> String {
    "claude-code".to_string()
}

fn default_send_delay_ms() -> u64 {
    800
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Defaults {
    /// Path to the claude binary; `~` is expanded.
    #[serde(default)]
    pub claude_bin: Option<String>,
    #[serde(default)]
    pub mode: ModeFlag,
    #[serde(default)]
    pub permission_mode: Option<String>,
    #[serde(default)]
    pub allowed_tools: Option<String>,
    #[serde(default)]
    pub notify: bool,
    #[serde(default)]
    pub clipboard: bool,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct BackgroundConfig {
    #[serde(default)]
    pub log_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TmuxConfig {
    #[serde(default = "default_session")]
    pub session: String,
    /// Pause between typed prompt lines.
    #[serde(default = "default_send_delay_ms")]
    pub send_delay_ms: u64,
    /// Seconds to wait before printing a pane snapshot; 0 disables it.
    #[serde(default)]
    pub wait_secs: u64,
}

impl Default for TmuxConfig {
    fn default() -> Self {
        Self {
            session: default_session(),
            send_delay_ms: default_send_delay_ms(),
            wait_secs: 0,
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub background: BackgroundConfig,
    #[serde(default)]
    pub tmux: TmuxConfig,
}

impl ProjectConfig {
    /// Search upward from `start` for a `.claude-launch/config.toml` file and load it.
    /// Returns the default config if no file is found.
    pub fn load(start: &Path) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = Self::find_config_file(start) {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let config: ProjectConfig = toml::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            Ok((config, Some(path)))
        } else {
            Ok((ProjectConfig::default(), None))
        }
    }

    fn find_config_file(start: &Path) -> Option<PathBuf> {
        let mut dir = start.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_DIR).join(CONFIG_FILENAME);
            if candidate.is_file() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }
}
