// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::PermissionStatus;

/// Command-line arguments for `readygate`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "readygate",
    version,
    about = "Constraint-gated readiness and execution permission for scheduled work.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Readygate.toml` in the current working directory if it
    /// exists, else built-in defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Project snapshot (JSON) to operate on.
    #[arg(long, value_name = "PATH", default_value = "readygate.json")]
    pub snapshot: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `READYGATE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Save the snapshot back after the command.
    #[arg(long)]
    pub write: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Recompute readiness and permissions (one project, or every project).
    Recompute {
        #[arg(long, value_name = "ID")]
        project: Option<String>,
    },
    /// Check a predecessor edge without adding it.
    ValidateEdge { task: String, predecessor: String },
    /// Validate and add a predecessor edge.
    AddEdge { task: String, predecessor: String },
    /// Remove a predecessor edge.
    RemoveEdge { task: String, predecessor: String },
    /// Request the start of a task.
    Start { task: String },
    /// Mark a task completed.
    Complete { task: String },
    /// Put an erection area on hold.
    Hold {
        #[arg(long, value_name = "ID")]
        project: String,
        area: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Release a held erection area.
    Release {
        #[arg(long, value_name = "ID")]
        project: String,
        area: String,
    },
    /// Shift install sequence numbers from a threshold.
    Shift {
        #[arg(long, value_name = "ID")]
        project: String,
        /// First sequence number to move.
        #[arg(long, allow_hyphen_values = true)]
        from: i64,
        /// Amount to move by (may be negative).
        #[arg(long, allow_hyphen_values = true)]
        by: i64,
    },
    /// Manually set (or clear) a work package's execution permission.
    Override {
        package: String,
        #[arg(long, required_unless_present = "clear")]
        status: Option<PermissionStatus>,
        /// Approver identity.
        #[arg(long = "by", value_name = "ACTOR", required_unless_present = "clear")]
        actor: Option<String>,
        #[arg(long)]
        reason: Option<String>,
        /// Drop the override and recompute automatically.
        #[arg(long, conflicts_with = "status")]
        clear: bool,
    },
    /// Feed mutation notifications from a JSON-lines file through the engine.
    Replay { path: String },
    /// Validate the config and every project's predecessor graph.
    Check,
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
