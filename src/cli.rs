// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `taskgraph`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskgraph",
    version,
    about = "Run shell commands as a dependency graph of tasks.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the graph definition (TOML).
    ///
    /// Default: `Taskgraph.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Taskgraph.toml")]
    pub config: String,

    /// Number of automatic retry rounds after failed tasks.
    ///
    /// Overrides `[graph].retries` from the config file.
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Maximum number of task bodies running at the same time.
    ///
    /// Overrides `[graph].max_concurrency` from the config file.
    #[arg(long, value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKGRAPH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the graph, but don't run any commands.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
