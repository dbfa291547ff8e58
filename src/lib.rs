pub mod app;
pub mod background;
pub mod cli;
pub mod config;
pub mod desktop;
pub mod error;
pub mod invocation;
pub mod lookup;
pub mod mode;
pub mod paths;
pub mod poll;
pub mod pty;
pub mod session;
pub mod shell_completion;
pub mod tmux;
pub mod watcher;
