// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Solidafy Replication
//!
//! Replication core for a data-integration worker: checkpoint emission for
//! reset jobs and position tracking for change-data-capture reads.
//!
//! ## Features
//!
//! - **Reset Jobs**: Emit "empty" checkpoints in legacy, per-stream or global shape
//! - **Global Merge**: Null out only the reset streams of a shared global checkpoint
//! - **CDC Reads**: Drain a bounded change queue until a target log position is reached
//! - **Record Conversion**: Flatten change envelopes into records with CDC metadata
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use solidafy_replication::config::WorkerSourceConfig;
//! use solidafy_replication::source::{read_to_end, ResetStateEmitter, Source};
//!
//! #[tokio::main]
//! async fn main() -> solidafy_replication::Result<()> {
//!     let config = WorkerSourceConfig::from_file("source.json")?;
//!
//!     let mut source = ResetStateEmitter::new();
//!     source.start(&config, "/tmp/job".as_ref()).await?;
//!
//!     for message in read_to_end(&mut source).await? {
//!         println!("{}", message.to_json_line()?);
//!     }
//!     source.close().await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Source Interface                          │
//! │  start(config) → ()   attempt_read() → Message   close/cancel   │
//! └─────────────────────────────────────────────────────────────────┘
//!                 │                               │
//! ┌───────────────┴───────────────┐ ┌─────────────┴─────────────────┐
//! │       ResetStateEmitter       │ │          CdcSource            │
//! ├───────────────────────────────┤ ├───────────────────────────────┤
//! │ Legacy  │ Per-stream │ Global │ │ ChangeEventIterator           │
//! │         │            │ merge  │ │ PositionTracker │ Converter   │
//! └───────────────────────────────┘ └───────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Messages exchanged with the worker
pub mod protocol;

/// Checkpoint shapes, persisted state and the global merge
pub mod state;

/// Job configuration
pub mod config;

/// Change-data-capture position tracking and event iteration
pub mod cdc;

/// Sources: reset emitter and CDC source
pub mod source;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use protocol::{Message, StateMessage};
pub use source::{CdcSource, ResetStateEmitter, Source};
pub use state::{CheckpointVariant, GlobalState, ResetScope, StreamDescriptor, StreamState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
