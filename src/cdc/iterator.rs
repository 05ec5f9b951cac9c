//! Consumer side of the capture engine's event queue

use super::event::ChangeEvent;
use super::position::{PositionTracker, ReplicationPosition};
use futures::Stream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, trace};

/// Probe reporting whether the capture engine is still running
pub type SubscriptionProbe = Box<dyn Fn() -> bool + Send + Sync>;

/// Callback asking the capture engine to shut down
pub type CloseCallback = Box<dyn FnOnce() + Send>;

/// Cooperative cancellation for a [`ChangeEventIterator`].
///
/// Cancelling never blocks. The iterator notices before its next poll or at
/// the next idle timeout, whichever comes first.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Create an uncancelled handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Lazy, single-pass sequence of data events from the capture engine.
///
/// Heartbeats are consumed internally to detect when the stream has caught
/// up with the target position. The sequence ends when a heartbeat reaches
/// the target, when the engine reports it has stopped, when every producer
/// has dropped its sender, or on close/cancel. `on_close` runs at most once.
pub struct ChangeEventIterator {
    queue: mpsc::Receiver<ChangeEvent>,
    tracker: Box<dyn PositionTracker>,
    target: ReplicationPosition,
    subscription_active: SubscriptionProbe,
    on_close: Option<CloseCallback>,
    idle_wait: Duration,
    cancel: CancelHandle,
    finished: bool,
}

impl ChangeEventIterator {
    /// Create an iterator over `queue`
    pub fn new(
        queue: mpsc::Receiver<ChangeEvent>,
        tracker: impl PositionTracker + 'static,
        target: ReplicationPosition,
        subscription_active: impl Fn() -> bool + Send + Sync + 'static,
        on_close: impl FnOnce() + Send + 'static,
        idle_wait: Duration,
    ) -> Self {
        Self {
            queue,
            tracker: Box::new(tracker),
            target,
            subscription_active: Box::new(subscription_active),
            on_close: Some(Box::new(on_close)),
            idle_wait,
            cancel: CancelHandle::new(),
            finished: false,
        }
    }

    /// Position at which the read is complete
    pub fn target(&self) -> ReplicationPosition {
        self.target
    }

    /// Whether no further events will be produced
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Handle for cancelling this iterator from elsewhere
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Pull the next data event, or `None` once the sequence has ended
    pub async fn next_event(&mut self) -> Option<ChangeEvent> {
        while !self.finished {
            if self.cancel.is_cancelled() {
                self.finish("iteration cancelled");
                break;
            }

            match timeout(self.idle_wait, self.queue.recv()).await {
                Ok(Some(event)) if event.is_heartbeat() => {
                    let position = self.tracker.heartbeat_position(Some(&event));
                    if self.tracker.is_at_or_past_target(position, self.target) {
                        info!(%position, target = %self.target, "Heartbeat reached the target position");
                        self.finish("heartbeat indicates sync is done by reaching the target position");
                    } else {
                        trace!(%position, target = %self.target, "Heartbeat below target position");
                    }
                }
                Ok(Some(event)) => return Some(event),
                Ok(None) => self.finish("capture engine closed the event queue"),
                Err(_) => {
                    if self.cancel.is_cancelled() {
                        self.finish("iteration cancelled");
                    } else if !(self.subscription_active)() {
                        self.finish("capture engine is no longer running");
                    } else {
                        debug!(
                            wait_ms = self.idle_wait.as_millis() as u64,
                            "No change event received, capture engine still running"
                        );
                    }
                }
            }
        }
        None
    }

    /// Stop iterating and release the queue.
    ///
    /// Producers blocked on a full queue are woken with a send error.
    /// Idempotent.
    pub fn close(&mut self) {
        self.queue.close();
        if !self.finished {
            self.finish("iterator closed");
        }
    }

    /// Turn the iterator into a stream of data events
    pub fn into_stream(self) -> impl Stream<Item = ChangeEvent> + Send {
        futures::stream::unfold(self, |mut iterator| async move {
            let event = iterator.next_event().await?;
            Some((event, iterator))
        })
    }

    fn finish(&mut self, reason: &str) {
        info!("Closing change event iteration: {reason}");
        self.finished = true;
        if let Some(on_close) = self.on_close.take() {
            on_close();
        }
    }
}

impl std::fmt::Debug for ChangeEventIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeEventIterator")
            .field("target", &self.target)
            .field("idle_wait", &self.idle_wait)
            .field("finished", &self.finished)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
