//! [`LocalisationHandle`] – the external command surface.
//!
//! Everything the host process can do to a running loop without touching
//! its internals: request re-seeds, read and update tunables, follow the
//! latest estimate, subscribe to monitoring events, and shut the loop
//! down.  Every command that changes what the next tick should do also
//! wakes the loop early, so reaction latency is bounded by processing
//! time, not by the tick period.

use crate::bus::{EventReceiver, MonitorBus};
use crate::inputs::Clock;
use fieldloc_engine::ResetCoordinator;
use fieldloc_types::{
    CustomPose, EventPayload, LocalisationEvent, PoseEstimate, ResetRequest, SharedTunables,
    Tunables,
};
use std::sync::Arc;
use tokio::sync::{Notify, watch};
use tracing::info;

/// Command handle on a running localisation loop.
pub struct LocalisationHandle {
    pub(crate) coordinator: ResetCoordinator,
    pub(crate) tunables: SharedTunables,
    pub(crate) bus: MonitorBus,
    pub(crate) estimate_rx: watch::Receiver<Option<PoseEstimate>>,
    pub(crate) wake: Arc<Notify>,
    pub(crate) shutdown_tx: watch::Sender<bool>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl LocalisationHandle {
    // ── Reset commands ───────────────────────────────────────────────────────

    /// Spread the belief over the whole field.
    pub fn reset_uniform(&self) -> bool {
        self.request(ResetRequest::Uniform)
    }

    /// Re-seed on the field borders (manual re-entry placement).
    pub fn reset_borders(&self) -> bool {
        self.request(ResetRequest::Borders)
    }

    /// Widen the belief after a fall recovery.
    pub fn reset_fall(&self) -> bool {
        self.request(ResetRequest::Fall)
    }

    /// Re-seed at an operator-provided pose.
    pub fn reset_custom(&self, pose: CustomPose) -> bool {
        self.request(ResetRequest::Custom(pose))
    }

    fn request(&self, request: ResetRequest) -> bool {
        let kind = request.kind();
        let accepted = self.coordinator.request(
            request,
            self.clock.now(),
            self.tunables.get().min_vc_observations,
        );
        if accepted {
            let _ = self.bus.publish(LocalisationEvent::new(
                "fieldloc-runtime::handle",
                EventPayload::ResetRequested { kind },
            ));
            self.wake.notify_one();
        }
        accepted
    }

    // ── Tunables ─────────────────────────────────────────────────────────────

    /// Current tunables, copied out.
    pub fn tunables(&self) -> Tunables {
        self.tunables.get()
    }

    /// Apply `f` to the live tunables; the next tick sees the change.
    pub fn update_tunables(&self, f: impl FnOnce(&mut Tunables)) {
        self.tunables.update(f);
        self.wake.notify_one();
    }

    // ── Observation ──────────────────────────────────────────────────────────

    /// Subscribe to the monitoring event stream.
    pub fn subscribe(&self) -> EventReceiver {
        self.bus.subscribe()
    }

    /// The most recently published estimate, if any tick ran yet.
    pub fn latest_estimate(&self) -> Option<PoseEstimate> {
        self.estimate_rx.borrow().clone()
    }

    /// Watch channel that updates with every published estimate.
    pub fn estimate_watch(&self) -> watch::Receiver<Option<PoseEstimate>> {
        self.estimate_rx.clone()
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Ask the loop to stop after the current tick.
    pub fn shutdown(&self) {
        info!("localisation shutdown requested");
        let _ = self.shutdown_tx.send(true);
        self.wake.notify_one();
    }
}
