//! Broadcast bus for monitoring events.
//!
//! Uses [`tokio::sync::broadcast`] under the hood so every subscriber
//! receives every [`LocalisationEvent`] without any single subscriber
//! blocking the others.  Publishing is best-effort: the tick loop never
//! waits on a consumer, and a slow consumer lags rather than stalling the
//! loop.

use fieldloc_types::{LocError, LocalisationEvent};
use tokio::sync::broadcast;
use tracing::warn;

/// Buffered events per subscriber before old ones are dropped.
const DEFAULT_CAPACITY: usize = 256;

/// Shared monitoring bus.  Clone it cheaply – all clones share the same
/// underlying channel.
#[derive(Clone, Debug)]
pub struct MonitorBus {
    sender: broadcast::Sender<LocalisationEvent>,
}

impl MonitorBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish `event` to every subscriber.
    ///
    /// Returns the number of receivers handed the event, or
    /// [`LocError::Channel`] when nobody is listening.  Callers on the hot
    /// path ignore the result — no subscribers is a normal condition there.
    pub fn publish(&self, event: LocalisationEvent) -> Result<usize, LocError> {
        self.sender
            .send(event)
            .map_err(|e| LocError::Channel(format!("monitor bus send error: {e}")))
    }

    /// Subscribe to all monitoring events.
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for MonitorBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Async receiver on the monitoring bus.
///
/// Lag is tolerated: when the subscriber falls behind, the dropped count is
/// logged and delivery resumes with the oldest retained event.
pub struct EventReceiver {
    receiver: broadcast::Receiver<LocalisationEvent>,
}

impl EventReceiver {
    /// Wait for the next event.  Returns `None` when the bus has shut down.
    pub async fn recv(&mut self) -> Option<LocalisationEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(lagged_by = n, "monitor subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking receive of an already-buffered event.
    pub fn try_recv(&mut self) -> Option<LocalisationEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}
