//! Protocol module
//!
//! Newline-delimited JSON messages exchanged between a source and the
//! worker that drives it.
//!
//! # Overview
//!
//! The protocol module provides:
//! - `Message` - RECORD / STATE / LOG messages
//! - `StateMessage` - Checkpoint wire shape (LEGACY, STREAM, GLOBAL)
//! - `MessageType` / `MessageCategory` - Routing of the full message set

mod types;

pub use types::{
    LogMessage, Message, MessageCategory, MessageType, RecordMessage, StateMessage, StateType,
};
