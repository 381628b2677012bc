//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

/// Inspect and check a dbhive topology.
#[derive(Parser, Debug)]
#[command(name = "dbhive", version, about)]
pub struct Cli {
    /// Topology file (YAML, or TOML with a `.toml` extension)
    #[arg(short, long, value_name = "FILE", env = "DBHIVE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}

/// Output format for `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Tab-separated columns
    Table,
    /// JSON array
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print every registered database without connecting
    List {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Open every database and report whether it answers
    Check {
        /// Only check this group
        #[arg(short, long)]
        group: Option<String>,

        /// Deadline for each database, e.g. `5s` or `500ms`
        #[arg(long, default_value = "5s", value_parser = humantime::parse_duration)]
        timeout: Duration,
    },
}
