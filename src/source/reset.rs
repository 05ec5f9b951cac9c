//! Source that emits reset checkpoints
//!
//! Used by reset jobs: instead of reading data it emits the checkpoints that
//! tell the destination the requested streams no longer have any progress.

use super::{Lifecycle, Source};
use crate::config::{ResetSourceConfiguration, WorkerSourceConfig};
use crate::error::{Error, Result};
use crate::protocol::Message;
use crate::state::{
    merge_global_reset, CheckpointVariant, GlobalState, PersistedState, ResetScope,
    StreamDescriptor,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info};

/// What the emitter will produce, decided at start
#[derive(Debug)]
enum ResetPlan {
    /// One empty legacy checkpoint
    Legacy,
    /// One null stream checkpoint per requested stream
    PerStream(VecDeque<StreamDescriptor>),
    /// One merged global checkpoint
    Global {
        current: GlobalState,
        scope: ResetScope,
    },
}

/// Source emitting the checkpoints of a reset job
#[derive(Debug)]
pub struct ResetStateEmitter {
    plan: Option<ResetPlan>,
    // Guards the single LEGACY/GLOBAL emission. Contention only happens if
    // cancel races a read, which the worker loop does not normally do.
    has_emitted: AtomicBool,
    cancelled: AtomicBool,
    lifecycle: Lifecycle,
}

impl Default for ResetStateEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResetStateEmitter {
    /// Create an emitter that has not been started
    pub fn new() -> Self {
        Self {
            plan: None,
            has_emitted: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            lifecycle: Lifecycle::Created,
        }
    }

    fn plan(config: &WorkerSourceConfig) -> Result<ResetPlan> {
        let Some(connection) = config.source_connection_configuration.as_ref() else {
            info!("No reset configuration provided, resetting the whole connection");
            return Ok(ResetPlan::Legacy);
        };

        let reset = ResetSourceConfiguration::from_value(connection).inspect_err(|_| {
            error!("The configuration provided to the reset has an invalid format");
        })?;
        let scope = reset.scope();
        if scope.is_empty() {
            info!("Reset configuration lists no streams, resetting the whole connection");
            return Ok(ResetPlan::Legacy);
        }

        match PersistedState::from_blob(config.state_blob())? {
            Some(PersistedState::Legacy(_)) => {
                let catalog = config.catalog.descriptors();
                if !scope.covers(&catalog) {
                    error!("The state is a legacy one but we are trying to do a partial reset, this is not supported");
                    return Err(Error::invalid_state(
                        "cannot partially reset a legacy checkpoint",
                    ));
                }
                info!(streams = scope.len(), "Resetting every stream of a legacy state");
                Ok(ResetPlan::Legacy)
            }
            Some(PersistedState::Global(current)) => {
                info!(streams = scope.len(), "Resetting streams of a global state");
                Ok(ResetPlan::Global { current, scope })
            }
            Some(PersistedState::Stream(_)) | None => {
                info!(streams = scope.len(), "Resetting streams of a per-stream state");
                Ok(ResetPlan::PerStream(scope.to_queue()))
            }
        }
    }

    fn is_stopped(&self) -> bool {
        self.cancelled.load(Ordering::Acquire) || self.lifecycle == Lifecycle::Closed
    }
}

/// Claim the single emission; false if it already happened
fn claim_emission(has_emitted: &AtomicBool) -> bool {
    has_emitted
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
}

#[async_trait]
impl Source for ResetStateEmitter {
    async fn start(&mut self, config: &WorkerSourceConfig, job_root: &Path) -> Result<()> {
        if self.plan.is_some() {
            return Err(Error::illegal_usage("The reset source has already been started"));
        }
        debug!(job_root = %job_root.display(), "Starting reset source");

        self.plan = Some(Self::plan(config)?);
        self.lifecycle = Lifecycle::Started;
        Ok(())
    }

    async fn attempt_read(&mut self) -> Result<Option<Message>> {
        if self.plan.is_none() {
            return Err(Error::illegal_usage("The reset source has not been started"));
        }
        if self.is_stopped() {
            return Ok(None);
        }

        let checkpoint = match self.plan.as_mut() {
            Some(ResetPlan::Legacy) => {
                claim_emission(&self.has_emitted).then(CheckpointVariant::empty_legacy)
            }
            Some(ResetPlan::PerStream(queue)) => {
                queue.pop_front().map(CheckpointVariant::reset_stream)
            }
            Some(ResetPlan::Global { current, scope }) => claim_emission(&self.has_emitted)
                .then(|| CheckpointVariant::Global(merge_global_reset(current, scope))),
            None => None,
        };

        if checkpoint.is_some() {
            self.lifecycle = Lifecycle::Producing;
        }
        if self.is_finished()? {
            self.lifecycle = Lifecycle::Finished;
        }
        Ok(checkpoint.map(Message::state))
    }

    fn is_finished(&self) -> Result<bool> {
        let plan = self
            .plan
            .as_ref()
            .ok_or_else(|| Error::illegal_usage("The reset source has not been started"))?;

        if self.is_stopped() {
            return Ok(true);
        }
        Ok(match plan {
            ResetPlan::Legacy | ResetPlan::Global { .. } => self.has_emitted.load(Ordering::Acquire),
            ResetPlan::PerStream(queue) => queue.is_empty(),
        })
    }

    fn lifecycle(&self) -> Lifecycle {
        if self.cancelled.load(Ordering::Acquire) {
            Lifecycle::Cancelled
        } else {
            self.lifecycle
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.lifecycle = Lifecycle::Closed;
        Ok(())
    }

    fn cancel(&self) -> Result<()> {
        self.cancelled.store(true, Ordering::Release);
        Ok(())
    }
}
