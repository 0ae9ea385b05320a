//! Tooling & Integration Layer
//!
//! CLI commands and text/JSON rendering for driving the monitor from an
//! interactive shell, cron, or CI.

pub mod cli;
pub mod format;

pub use cli::{Cli, CliContext, Commands, HistoryCommands};
