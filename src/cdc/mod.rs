//! Change data capture module
//!
//! Consumer side of a log-based capture engine: the engine runs on its own
//! task or thread and pushes `ChangeEvent`s into a bounded queue, which the
//! worker drains through a `ChangeEventIterator`.
//!
//! # Overview
//!
//! The cdc module provides:
//! - `ChangeEvent` - Data event or heartbeat from the engine
//! - `PositionTracker` / `OffsetFieldTracker` - Position extraction and comparison
//! - `ChangeEventIterator` - Heartbeat filtering and termination
//! - `EventConverter` / `DebeziumEnvelopeConverter` - Events to records
//!
//! # Example
//!
//! ```rust,ignore
//! let (tx, rx) = tokio::sync::mpsc::channel(config.queue_capacity);
//! let mut events = ChangeEventIterator::new(
//!     rx,
//!     OffsetFieldTracker::lsn(),
//!     ReplicationPosition::new(target_lsn),
//!     move || engine_running.load(Ordering::Acquire),
//!     move || engine.request_shutdown(),
//!     config.idle_wait,
//! );
//! while let Some(event) = events.next_event().await {
//!     // handle data event
//! }
//! ```

mod convert;
mod event;
mod iterator;
mod position;

pub use convert::{
    DebeziumEnvelopeConverter, EventConverter, CDC_DELETED_AT, CDC_LSN, CDC_UPDATED_AT,
};
pub use event::{ChangeEvent, HEARTBEAT_TOPIC_PREFIX};
pub use iterator::{CancelHandle, ChangeEventIterator, CloseCallback, SubscriptionProbe};
pub use position::{parse_position, OffsetFieldTracker, PositionTracker, ReplicationPosition};
