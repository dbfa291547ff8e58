//! Execution mode selection.
//!
//! `auto` switches to an interactive tmux session when the prompt contains
//! slash commands (which only work in the interactive UI); everything else
//! runs headless. The background flag only applies to headless runs.

use serde::{Deserialize, Serialize};

/// Mode as requested on the command line or in config.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModeFlag {
    #[default]
    Auto,
    #[value(alias = "sync")]
    #[serde(alias = "sync")]
    Headless,
    Interactive,
}

/// Concrete mode after the heuristic has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Headless,
    Interactive,
}

/// Where a run is actually sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Block under a pty until the program exits.
    Sync,
    /// Detach and log to a file.
    Background,
    /// Drive a tmux session.
    Interactive,
}

impl Dispatch {
    pub fn label(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Background => "background",
            Self::Interactive => "interactive",
        }
    }
}

/// True when any line, trimmed, starts with `/`. A lone `\r` also ends a line.
pub fn looks_like_slash_commands(prompt: Option<&str>) -> bool {
    prompt.is_some_and(|p| p.split(['\n', '\r']).any(|line| line.trim().starts_with('/')))
}

pub fn resolve_mode(prompt: Option<&str>, flag: ModeFlag) -> Mode {
    match flag {
        ModeFlag::Headless => Mode::Headless,
        ModeFlag::Interactive => Mode::Interactive,
        ModeFlag::Auto if looks_like_slash_commands(prompt) => Mode::Interactive,
        ModeFlag::Auto => Mode::Headless,
    }
}

/// Resolve the mode and fold in the background toggle.
pub fn select(prompt: Option<&str>, flag: ModeFlag, background: bool) -> Dispatch {
    match resolve_mode(prompt, flag) {
        Mode::Interactive => Dispatch::Interactive,
        Mode::Headless if background => Dispatch::Background,
        Mode::Headless => Dispatch::Sync,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn auto_heuristic_examples() {
        assert_eq!(resolve_mode(Some(""), ModeFlag::Auto), Mode::Headless);
        assert_eq!(resolve_mode(None, ModeFlag::Auto), Mode::Headless);
        assert_eq!(resolve_mode(Some("/help"), ModeFlag::Auto), Mode::Interactive);
        assert_eq!(
            resolve_mode(Some("hello\n/clear"), ModeFlag::Auto),
            Mode::Interactive
        );
        assert_eq!(resolve_mode(Some("hello world"), ModeFlag::Auto), Mode::Headless);
    }

    #[test]
    fn carriage_returns_separate_lines() {
        assert_eq!(
            resolve_mode(Some("hello\r/clear"), ModeFlag::Auto),
            Mode::Interactive
        );
        assert_eq!(
            resolve_mode(Some("hello\r\n/compact\r\n"), ModeFlag::Auto),
            Mode::Interactive
        );
        assert_eq!(resolve_mode(Some("a\rb/c"), ModeFlag::Auto), Mode::Headless);
    }

    #[test]
    fn leading_whitespace_before_slash_still_counts() {
        assert!(looks_like_slash_commands(Some("intro\n   /compact")));
        assert!(!looks_like_slash_commands(Some("path a/b/c")));
    }

    #[test]
    fn explicit_flags_override_heuristic() {
        assert_eq!(resolve_mode(Some("/help"), ModeFlag::Headless), Mode::Headless);
        assert_eq!(
            resolve_mode(Some("hello world"), ModeFlag::Interactive),
            Mode::Interactive
        );
    }

    #[test]
    fn background_only_applies_to_headless() {
        assert_eq!(select(Some("hi"), ModeFlag::Auto, true), Dispatch::Background);
        assert_eq!(select(Some("hi"), ModeFlag::Auto, false), Dispatch::Sync);
        assert_eq!(select(Some("/help"), ModeFlag::Auto, true), Dispatch::Interactive);
        assert_eq!(
            select(None, ModeFlag::Interactive, true),
            Dispatch::Interactive
        );
    }

    #[test]
    fn sync_is_an_alias_for_headless() {
        use clap::ValueEnum;
        assert_eq!(ModeFlag::from_str("sync", false).unwrap(), ModeFlag::Headless);

        #[derive(Deserialize)]
        struct Wrapper {
            mode: ModeFlag,
        }
        let parsed: Wrapper = toml::from_str("mode = \"sync\"").unwrap();
        assert_eq!(parsed.mode, ModeFlag::Headless);
    }

    proptest! {
        #[test]
        fn prompts_without_slashes_stay_headless(prompt in "[a-z \t\n.,!?]{0,80}") {
            prop_assert_eq!(resolve_mode(Some(&prompt), ModeFlag::Auto), Mode::Headless);
        }

        #[test]
        fn any_indented_slash_line_switches_to_interactive(
            before in "[a-z \n]{0,40}",
            indent in "[ \t]{0,4}",
            command in "[a-z]{1,10}",
        ) {
            let prompt = format!("{before}\n{indent}/{command}");
            prop_assert_eq!(resolve_mode(Some(&prompt), ModeFlag::Auto), Mode::Interactive);
        }
    }
}
