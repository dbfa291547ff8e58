//! `claude` command-line construction.
//!
//! Headless runs pass the prompt with `-p` and may ask for structured
//! output. Interactive runs type the prompt into the TUI instead, and the
//! TUI has no structured output channel, so those flags are left out.

use std::path::{Path, PathBuf};

use crate::mode::Dispatch;

/// Output format accepted by `claude --output-format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    StreamJson,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::StreamJson => "stream-json",
        }
    }
}

/// Flags forwarded to `claude`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaudeOptions {
    pub permission_mode: Option<String>,
    pub prompt: Option<String>,
    pub allowed_tools: Option<String>,
    pub output_format: Option<OutputFormat>,
    pub json_schema: Option<String>,
    pub append_system_prompt: Option<String>,
    pub system_prompt: Option<String>,
    pub continue_latest: bool,
    pub resume: Option<String>,
    /// Passed through verbatim after everything else.
    pub extra: Vec<String>,
}

impl ClaudeOptions {
    /// Arguments for a headless (`-p`) run; used for sync and background.
    pub fn headless_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        push_opt(&mut args, "--permission-mode", self.permission_mode.as_deref());
        // `-p ""` is still a headless run, so an empty prompt is forwarded.
        if let Some(prompt) = &self.prompt {
            args.push("-p".to_string());
            args.push(prompt.clone());
        }
        push_opt(&mut args, "--allowedTools", self.allowed_tools.as_deref());
        push_opt(
            &mut args,
            "--output-format",
            self.output_format.map(OutputFormat::as_str),
        );
        push_opt(&mut args, "--json-schema", self.json_schema.as_deref());
        self.push_session_args(&mut args);
        args
    }

    /// Arguments for the interactive TUI.
    pub fn interactive_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        push_opt(&mut args, "--permission-mode", self.permission_mode.as_deref());
        push_opt(&mut args, "--allowedTools", self.allowed_tools.as_deref());
        self.push_session_args(&mut args);
        args
    }

    fn push_session_args(&self, args: &mut Vec<String>) {
        push_opt(
            args,
            "--append-system-prompt",
            self.append_system_prompt.as_deref(),
        );
        push_opt(args, "--system-prompt", self.system_prompt.as_deref());
        if self.continue_latest {
            args.push("--continue".to_string());
        }
        push_opt(args, "--resume", self.resume.as_deref());
        args.extend(self.extra.iter().cloned());
    }
}

fn push_opt(args: &mut Vec<String>, flag: &str, value: Option<&str>) {
    // Empty strings are treated as unset.
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        args.push(flag.to_string());
        args.push(value.to_string());
    }
}

/// One fully-resolved invocation of the target program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    dispatch: Dispatch,
}

impl RunRequest {
    pub fn new(program: &Path, options: &ClaudeOptions, cwd: Option<PathBuf>, dispatch: Dispatch) -> Self {
        let args = match dispatch {
            Dispatch::Interactive => options.interactive_args(),
            Dispatch::Sync | Dispatch::Background => options.headless_args(),
        };
        Self {
            program: program.to_path_buf(),
            args,
            cwd,
            dispatch,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn dispatch(&self) -> Dispatch {
        self.dispatch
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.to_string_lossy().into_owned());
        argv.extend(self.args.iter().cloned());
        argv
    }
}
