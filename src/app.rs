//! Launch orchestration: merge settings, pick a dispatch path, run it.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::background::{self, BackgroundJob};
use crate::cli::RunArgs;
use crate::config::ProjectConfig;
use crate::desktop;
use crate::error;
use crate::invocation::{ClaudeOptions, RunRequest};
use crate::lookup;
use crate::mode::{self, Dispatch, ModeFlag};
use crate::paths;
use crate::pty::{self, PtyHelper};
use crate::session::{InteractivePlan, SessionController, TrustPromptPolicy};
use crate::tmux::Tmux;

/// Environment variable naming the claude binary.
pub const CLAUDE_BIN_ENV: &str = "CLAUDE_CODE_BIN";

/// Fully merged launch configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSettings {
    pub claude_bin: PathBuf,
    pub cwd: Option<PathBuf>,
    pub mode: ModeFlag,
    pub background: bool,
    pub log_dir: PathBuf,
    pub tmux_session: String,
    pub wait_secs: u64,
    pub send_delay_ms: u64,
    pub notify: bool,
    pub clipboard: bool,
}

impl LaunchSettings {
    /// CLI flag, then `env_bin` (binary only), then the config file, then defaults.
    pub fn resolve(args: &RunArgs, config: &ProjectConfig, env_bin: Option<String>) -> Self {
        let env_bin = env_bin.filter(|v| !v.is_empty());
        let claude_bin = match (&args.claude_bin, env_bin, &config.defaults.claude_bin) {
            (Some(cli), _, _) => cli.clone(),
            (None, Some(env), _) => paths::expand_tilde(&env),
            (None, None, Some(file)) => paths::expand_tilde(file),
            (None, None, None) => paths::default_claude_bin(),
        };
        let log_dir = match (&args.log_dir, &config.background.log_dir) {
            (Some(cli), _) => cli.clone(),
            (None, Some(file)) => paths::expand_tilde(file),
            (None, None) => paths::default_log_dir(),
        };

        Self {
            claude_bin,
            cwd: args.cwd.clone(),
            mode: args.mode.unwrap_or(config.defaults.mode),
            background: args.background,
            log_dir,
            tmux_session: args
                .tmux_session
                .clone()
                .unwrap_or_else(|| config.tmux.session.clone()),
            wait_secs: args.interactive_wait_secs.unwrap_or(config.tmux.wait_secs),
            send_delay_ms: args
                .interactive_send_delay_ms
                .unwrap_or(config.tmux.send_delay_ms),
            notify: args.notify || config.defaults.notify,
            clipboard: args.clipboard || config.defaults.clipboard,
        }
    }
}

/// Flags forwarded to claude, with config defaults for the ones it carries.
pub fn claude_options(args: &RunArgs, config: &ProjectConfig) -> ClaudeOptions {
    ClaudeOptions {
        permission_mode: args
            .permission_mode
            .clone()
            .or_else(|| config.defaults.permission_mode.clone()),
        prompt: args.prompt.clone(),
        allowed_tools: args
            .allowed_tools
            .clone()
            .or_else(|| config.defaults.allowed_tools.clone()),
        output_format: args.output_format,
        json_schema: args.json_schema.clone(),
        append_system_prompt: args.append_system_prompt.clone(),
        system_prompt: args.system_prompt.clone(),
        continue_latest: args.continue_latest,
        resume: args.resume.clone(),
        extra: args.extra.clone(),
    }
}

/// Run one launch and return the process exit code to report.
pub fn run(args: &RunArgs, config: &ProjectConfig) -> Result<i32> {
    let settings = LaunchSettings::resolve(args, config, std::env::var(CLAUDE_BIN_ENV).ok());
    let options = claude_options(args, config);

    let program = lookup::resolve_target(&settings.claude_bin)?;
    let dispatch = mode::select(options.prompt.as_deref(), settings.mode, settings.background);
    let request = RunRequest::new(&program, &options, settings.cwd.clone(), dispatch);
    info!(
        mode = request.dispatch().label(),
        program = %request.program().display(),
        args = request.args().len(),
        "launching claude"
    );

    match request.dispatch() {
        Dispatch::Sync => run_sync(&request, &settings),
        Dispatch::Background => run_background(&request, &settings),
        Dispatch::Interactive => {
            let result = run_interactive(&request, &settings, options.prompt);
            if settings.notify {
                desktop::notify(
                    desktop::NOTIFICATION_TITLE,
                    &interactive_summary(&result, &settings.tmux_session),
                );
            }
            result
        }
    }
}

fn run_sync(request: &RunRequest, settings: &LaunchSettings) -> Result<i32> {
    let helper = PtyHelper::probe();
    let argv = request.argv();
    let code = if settings.clipboard {
        let captured = pty::run_captured(&helper, &argv, request.cwd())?;
        desktop::copy_to_clipboard(&captured.stdout);
        captured.exit_code
    } else {
        pty::run_sync(&helper, &argv, request.cwd())?
    };
    info!(exit_code = code, "headless run finished");

    if settings.notify {
        desktop::notify(desktop::NOTIFICATION_TITLE, &headless_summary(code));
    }
    Ok(code)
}

fn headless_summary(code: i32) -> String {
    if code == 0 {
        "Headless task completed".to_string()
    } else {
        format!("Headless task failed (exit {code})")
    }
}

fn interactive_summary(result: &Result<i32>, session: &str) -> String {
    match result {
        Ok(_) => format!("Interactive session ready in tmux session {session}"),
        Err(e) => format!("Interactive launch failed (exit {})", error::exit_code_for(e)),
    }
}

fn run_background(request: &RunRequest, settings: &LaunchSettings) -> Result<i32> {
    if settings.clipboard {
        debug!("clipboard ignored for background runs");
    }
    let helper = PtyHelper::probe();
    let argv = request.argv();
    let job = BackgroundJob {
        cmd: &argv,
        cwd: request.cwd(),
        log_dir: &settings.log_dir,
        notify: settings.notify,
    };
    let record = background::launch(&helper, &job)?;
    record
        .report(&mut io::stdout().lock())
        .context("failed to print launch report")?;
    Ok(0)
}

fn run_interactive(
    request: &RunRequest,
    settings: &LaunchSettings,
    prompt: Option<String>,
) -> Result<i32> {
    if settings.clipboard {
        debug!("clipboard ignored for interactive runs");
    }
    let tmux = Tmux::locate()?;
    match tmux.version() {
        Ok(version) => debug!(%version, "tmux available"),
        Err(e) => debug!(error = %e, "could not read tmux version"),
    }
    let cwd = match request.cwd() {
        Some(dir) => std::path::absolute(dir),
        None => std::env::current_dir(),
    }
    .context("failed to determine working directory")?;

    let plan = InteractivePlan {
        session: settings.tmux_session.clone(),
        cwd,
        argv: request.argv(),
        prompt,
        send_delay: Duration::from_millis(settings.send_delay_ms),
        snapshot_wait: Duration::from_secs(settings.wait_secs),
        trust: TrustPromptPolicy::default(),
    };
    let mut stdout = io::stdout().lock();
    SessionController::new(tmux).run(&plan, &mut stdout)?;
    stdout.flush().context("failed to flush stdout")?;
    Ok(0)
}

fn config_source_label(config_path: Option<&Path>) -> String {
    config_path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults, no .claude-launch/config.toml found)".to_string())
}

fn push_kv(output: &mut String, key: &str, value: impl std::fmt::Display) {
    output.push_str(&format!("  {key:<20} {value}\n"));
}

fn mode_label(mode: ModeFlag) -> &'static str {
    match mode {
        ModeFlag::Auto => "auto",
        ModeFlag::Headless => "headless",
        ModeFlag::Interactive => "interactive",
    }
}

pub fn render_config_human(
    settings: &LaunchSettings,
    config: &ProjectConfig,
    config_path: Option<&Path>,
) -> String {
    let mut output = String::new();
    output.push_str("Defaults\n");
    push_kv(&mut output, "claude_bin", settings.claude_bin.display());
    push_kv(&mut output, "mode", mode_label(settings.mode));
    push_kv(
        &mut output,
        "permission_mode",
        config.defaults.permission_mode.as_deref().unwrap_or("(none)"),
    );
    push_kv(
        &mut output,
        "allowed_tools",
        config.defaults.allowed_tools.as_deref().unwrap_or("(none)"),
    );
    push_kv(&mut output, "notify", settings.notify);
    push_kv(&mut output, "clipboard", settings.clipboard);
    output.push('\n');

    output.push_str("Background\n");
    push_kv(&mut output, "log_dir", settings.log_dir.display());
    output.push('\n');

    output.push_str("Tmux\n");
    push_kv(&mut output, "session", &settings.tmux_session);
    push_kv(
        &mut output,
        "send_delay",
        format!("{}ms", settings.send_delay_ms),
    );
    push_kv(&mut output, "wait", format!("{}s", settings.wait_secs));
    output.push('\n');

    output.push_str("Source Path\n");
    push_kv(&mut output, "path", config_source_label(config_path));

    output
}

pub fn render_config_json(
    settings: &LaunchSettings,
    config: &ProjectConfig,
    config_path: Option<&Path>,
) -> Result<String> {
    let payload = serde_json::json!({
        "defaults": {
            "claude_bin": settings.claude_bin.display().to_string(),
            "mode": mode_label(settings.mode),
            "permission_mode": config.defaults.permission_mode.clone(),
            "allowed_tools": config.defaults.allowed_tools.clone(),
            "notify": settings.notify,
            "clipboard": settings.clipboard
        },
        "background": {
            "log_dir": settings.log_dir.display().to_string()
        },
        "tmux": {
            "session": &settings.tmux_session,
            "send_delay_ms": settings.send_delay_ms,
            "wait_secs": settings.wait_secs
        },
        "source_path": config_source_label(config_path)
    });

    serde_json::to_string_pretty(&payload).context("failed to serialize config to JSON")
}
