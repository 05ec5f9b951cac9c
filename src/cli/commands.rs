//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Solidafy Replication CLI
#[derive(Parser, Debug)]
#[command(name = "solidafy-replication")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Worker source configuration file (JSON or YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Emit the checkpoints of a reset job
    Reset {
        /// Job working directory
        #[arg(long, default_value = ".")]
        job_root: PathBuf,
    },

    /// Describe the persisted state of the job
    State,

    /// Replay captured change events (JSON lines) through the CDC source
    Replay {
        /// File with one change event per line
        #[arg(short, long)]
        events: PathBuf,

        /// Log position at which the read is complete
        #[arg(short, long)]
        target: i64,

        /// Job working directory
        #[arg(long, default_value = ".")]
        job_root: PathBuf,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
