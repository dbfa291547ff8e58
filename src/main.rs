use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use claude_launch::app::{self, LaunchSettings};
use claude_launch::cli::{Cli, Command};
use claude_launch::config::ProjectConfig;
use claude_launch::error::{self, LaunchError};
use claude_launch::{desktop, shell_completion, watcher};

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => "claude_launch=warn",
        1 => "claude_launch=info",
        2 => "claude_launch=debug",
        _ => "claude_launch=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Some(Command::Completions { shell }) => {
            shell_completion::print(shell)?;
            return Ok(0);
        }
        Some(Command::WatchPid { pid }) => {
            watcher::run(pid)?;
            return Ok(0);
        }
        Some(Command::HoldClipboard) => {
            desktop::hold_clipboard(std::io::stdin().lock())?;
            return Ok(0);
        }
        _ => {}
    }

    let cwd = std::env::current_dir().context("failed to get current directory (was it deleted?)")?;
    let start = cli.run.cwd.as_deref().map_or(cwd.clone(), |dir| cwd.join(dir));
    let (config, config_path) = ProjectConfig::load(&start)?;
    match config_path {
        Some(ref p) => info!("loaded config from {}", p.display()),
        None => info!("no .claude-launch/config.toml found, using defaults"),
    }

    if let Some(Command::Config { json }) = cli.command {
        let env_bin = std::env::var(app::CLAUDE_BIN_ENV).ok();
        let settings = LaunchSettings::resolve(&cli.run, &config, env_bin);
        if json {
            println!(
                "{}",
                app::render_config_json(&settings, &config, config_path.as_deref())?
            );
        } else {
            print!(
                "{}",
                app::render_config_human(&settings, &config, config_path.as_deref())
            );
        }
        return Ok(0);
    }

    app::run(&cli.run, &config)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(err) => {
            eprintln!("Error: {err:#}");
            if let Some(launch) = err.downcast_ref::<LaunchError>() {
                for hint in launch.hints() {
                    eprintln!("{hint}");
                }
            }
            ExitCode::from(u8::try_from(error::exit_code_for(&err)).unwrap_or(1))
        }
    }
}
