//! CLI module
//!
//! Command-line interface for running the replication core by hand.
//!
//! # Commands
//!
//! - `reset` - Emit the checkpoints of a reset job
//! - `state` - Describe the job's persisted state
//! - `replay` - Run captured change events through the CDC source

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
