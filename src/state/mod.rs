//! State management module
//!
//! Checkpoint shapes, the persisted state they are read from, and the
//! reset merge applied to global checkpoints.
//!
//! # Overview
//!
//! The state module provides:
//! - `StreamDescriptor`, `StreamState`, `GlobalState` - Checkpoint values
//! - `CheckpointVariant` - LEGACY / STREAM / GLOBAL checkpoint
//! - `PersistedState` - Typed view of a job's saved state blob
//! - `ResetScope` - Streams an operator asked to reset
//! - `merge_global_reset` - Global checkpoint after a (partial) reset

mod merge;
mod persisted;
mod types;

pub use merge::merge_global_reset;
pub use persisted::PersistedState;
pub use types::{CheckpointVariant, GlobalState, ResetScope, StreamDescriptor, StreamState};
