use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::invocation::OutputFormat;
use crate::mode::ModeFlag;

#[derive(Parser, Debug)]
#[command(
    name = "claude-launch",
    about = "Run the claude CLI headless under a pty, detached in the background, or interactive in tmux",
    version,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// Flags for a launch. Unset values fall back to the project config.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Prompt text; lines starting with `/` select interactive mode under `--mode auto`
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Execution mode
    #[arg(long, value_enum)]
    pub mode: Option<ModeFlag>,

    /// Forwarded as --permission-mode
    #[arg(long)]
    pub permission_mode: Option<String>,

    /// Forwarded as --allowedTools
    #[arg(long = "allowedTools", value_name = "TOOLS")]
    pub allowed_tools: Option<String>,

    /// Headless output format
    #[arg(long, value_enum)]
    pub output_format: Option<OutputFormat>,

    /// JSON schema for structured headless output
    #[arg(long)]
    pub json_schema: Option<String>,

    #[arg(long)]
    pub append_system_prompt: Option<String>,

    #[arg(long)]
    pub system_prompt: Option<String>,

    /// Continue the most recent conversation
    #[arg(long = "continue")]
    pub continue_latest: bool,

    /// Resume a conversation by id
    #[arg(long, value_name = "ID")]
    pub resume: Option<String>,

    /// Path to the claude binary (overrides CLAUDE_CODE_BIN and config)
    #[arg(long, value_name = "PATH")]
    pub claude_bin: Option<PathBuf>,

    /// Working directory for the run
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Desktop notification when a run finishes, or once an interactive session is up
    #[arg(long)]
    pub notify: bool,

    /// Copy headless stdout to the clipboard
    #[arg(long)]
    pub clipboard: bool,

    /// Detach and log to a file instead of waiting (ignored in interactive mode)
    #[arg(long, visible_alias = "bg")]
    pub background: bool,

    /// Directory for background run logs
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// tmux session name for interactive mode
    #[arg(long, value_name = "NAME")]
    pub tmux_session: Option<String>,

    /// Seconds to wait before printing a pane snapshot (0 disables)
    #[arg(long = "interactive-wait-s", value_name = "SECS")]
    pub interactive_wait_secs: Option<u64>,

    /// Delay between typed prompt lines
    #[arg(long, value_name = "MS")]
    pub interactive_send_delay_ms: Option<u64>,

    /// Extra arguments passed through to claude unchanged
    #[arg(last = true, value_name = "EXTRA")]
    pub extra: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: CompletionShell,
    },

    /// Show the effective configuration
    Config {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Wait for a background run to exit, then notify
    #[command(hide = true)]
    WatchPid { pid: u32 },

    /// Own the clipboard selection with text read from stdin
    #[command(hide = true)]
    HoldClipboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
