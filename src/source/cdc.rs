//! Source backed by a change capture engine

use super::{Lifecycle, Source};
use crate::cdc::{CancelHandle, ChangeEventIterator, EventConverter};
use crate::config::WorkerSourceConfig;
use crate::error::{Error, Result};
use crate::protocol::Message;
use crate::state::StreamDescriptor;
use crate::types::SyncMode;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Source emitting RECORD messages for the change events of incremental streams
pub struct CdcSource {
    events: ChangeEventIterator,
    converter: Box<dyn EventConverter>,
    cancel: CancelHandle,
    streams: HashSet<StreamDescriptor>,
    lifecycle: Lifecycle,
    records_emitted: u64,
}

impl CdcSource {
    /// Create a source over an event iterator
    pub fn new(events: ChangeEventIterator, converter: impl EventConverter + 'static) -> Self {
        let cancel = events.cancel_handle();
        Self {
            events,
            converter: Box::new(converter),
            cancel,
            streams: HashSet::new(),
            lifecycle: Lifecycle::Created,
            records_emitted: 0,
        }
    }

    /// Number of records produced so far
    pub fn records_emitted(&self) -> u64 {
        self.records_emitted
    }

    fn ensure_started(&self) -> Result<()> {
        if self.lifecycle == Lifecycle::Created {
            return Err(Error::illegal_usage("The CDC source has not been started"));
        }
        Ok(())
    }
}

#[async_trait]
impl Source for CdcSource {
    async fn start(&mut self, config: &WorkerSourceConfig, job_root: &Path) -> Result<()> {
        if self.lifecycle != Lifecycle::Created {
            return Err(Error::illegal_usage("The CDC source has already been started"));
        }

        self.streams = config
            .catalog
            .streams
            .iter()
            .filter(|s| s.sync_mode == SyncMode::Incremental)
            .map(|s| s.descriptor())
            .collect();
        info!(
            streams = self.streams.len(),
            target = %self.events.target(),
            job_root = %job_root.display(),
            "Starting CDC source"
        );

        self.lifecycle = Lifecycle::Started;
        Ok(())
    }

    async fn attempt_read(&mut self) -> Result<Option<Message>> {
        self.ensure_started()?;
        if self.lifecycle == Lifecycle::Closed {
            return Ok(None);
        }

        while let Some(event) = self.events.next_event().await {
            match self.converter.convert(&event)? {
                Some(record) if self.streams.contains(&record.descriptor()) => {
                    self.lifecycle = Lifecycle::Producing;
                    self.records_emitted += 1;
                    return Ok(Some(Message::record(record)));
                }
                Some(record) => {
                    debug!(stream = %record.descriptor(), "Skipping change event for a stream outside the catalog");
                }
                None => debug!("Skipping change event without a payload"),
            }
        }

        if self.lifecycle != Lifecycle::Finished {
            info!(records = self.records_emitted, "CDC source finished");
            self.lifecycle = Lifecycle::Finished;
        }
        Ok(None)
    }

    fn is_finished(&self) -> Result<bool> {
        self.ensure_started()?;
        Ok(self.events.is_finished() || self.lifecycle == Lifecycle::Closed)
    }

    fn lifecycle(&self) -> Lifecycle {
        if self.cancel.is_cancelled() && self.lifecycle != Lifecycle::Closed {
            Lifecycle::Cancelled
        } else {
            self.lifecycle
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.events.close();
        self.lifecycle = Lifecycle::Closed;
        Ok(())
    }

    fn cancel(&self) -> Result<()> {
        self.cancel.cancel();
        Ok(())
    }
}
