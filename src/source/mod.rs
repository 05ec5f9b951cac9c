//! Source module
//!
//! The contract every source satisfies towards the worker loop, and the
//! two in-process implementations.
//!
//! # Overview
//!
//! The source module provides:
//! - `Source` - start → attempt_read* → finished → close lifecycle
//! - `ResetStateEmitter` - Emits reset checkpoints instead of data
//! - `CdcSource` - Emits records from a change capture engine
//! - `read_to_end` - Minimal worker loop draining a source

mod cdc;
mod reset;

pub use cdc::CdcSource;
pub use reset::ResetStateEmitter;

use crate::config::WorkerSourceConfig;
use crate::error::Result;
use crate::protocol::Message;
use async_trait::async_trait;
use std::path::Path;

/// Lifecycle of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Constructed, not started
    Created,
    /// Started, nothing read yet
    Started,
    /// At least one message produced
    Producing,
    /// No further messages will be produced
    Finished,
    /// Closed by the worker
    Closed,
    /// Cancelled by the worker
    Cancelled,
}

/// A producer of protocol messages driven by a worker loop
#[async_trait]
pub trait Source: Send {
    /// Parse configuration and prepare to produce messages
    async fn start(&mut self, config: &WorkerSourceConfig, job_root: &Path) -> Result<()>;

    /// Next message, or `None` if nothing is available right now
    async fn attempt_read(&mut self) -> Result<Option<Message>>;

    /// Whether no further messages will ever be produced
    fn is_finished(&self) -> Result<bool>;

    /// Current lifecycle state
    fn lifecycle(&self) -> Lifecycle;

    /// Exit code of the source; in-process sources always succeed
    fn exit_value(&self) -> i32 {
        0
    }

    /// Release resources. Idempotent.
    async fn close(&mut self) -> Result<()>;

    /// Stop producing without blocking. Idempotent.
    fn cancel(&self) -> Result<()>;
}

/// Drive a started source until it is finished, collecting its messages
pub async fn read_to_end<S: Source + ?Sized>(source: &mut S) -> Result<Vec<Message>> {
    let mut messages = Vec::new();
    while !source.is_finished()? {
        match source.attempt_read().await? {
            Some(message) => messages.push(message),
            None => tokio::task::yield_now().await,
        }
    }
    Ok(messages)
}


#[cfg(test)]
mod cdc_tests;
