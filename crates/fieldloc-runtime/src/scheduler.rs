//! [`TickScheduler`] – the localisation loop.
//!
//! One dedicated tokio task runs the whole tick: refresh tunables, stamp
//! time, pull vision, apply the safety gates, then
//! arbiter → extractor → watchdog → driver → publisher.  Each tick:
//!
//! 1. **Gate** – while the referee forbids play the pending uniform reset
//!    is cancelled, the compass bootstrap is satisfied artificially and the
//!    estimate is published without fusing; after play resumes the loop
//!    keeps publishing without fusing for a grace window, until a
//!    deliberate re-entry placement (borders, fall or custom) is pending or
//!    the window ends.  A fallen robot also publishes without fusing.
//! 2. **Orient** – the visual-compass arbiter picks the extraction mode
//!    and the extractor turns raw detections into typed observations.
//! 3. **Score** – the consistency watchdog moves the score and may request
//!    a uniform reset.
//! 4. **Advance** – the filter driver integrates odometry, applies the
//!    pending reset and steps the belief.
//! 5. **Publish** – the representative pose is projected into a
//!    [`PoseEstimate`], pushed to the sink, the watch channel and the
//!    monitoring bus.
//!
//! The inter-tick wait is a `select!` over period expiry, an early-wake
//! [`Notify`] (signalled by reset commands and tunable changes) and the
//! shutdown channel, so external commands act within one processing delay
//! rather than one period.
//!
//! In replay mode the time axis comes from the data source: each tick is
//! stamped with the vision frame's timestamp and the referee gate is
//! bypassed.

use crate::bus::MonitorBus;
use crate::handle::LocalisationHandle;
use crate::inputs::{Clock, FallSource, OdometrySource, RefereeSource, VisionSource};
use fieldloc_engine::{
    BeliefFilter, CompassControl, FilterDriver, LocalisationSink, ResetCoordinator,
    ResultPublisher, SharedBelief, SharedConsistency, TopViewSink, VisualCompassArbiter, extract,
    score_tick,
};
use fieldloc_types::{
    EventPayload, FieldGeometry, LocalisationEvent, ObservationKind, PoseEstimate, ResetKind,
    ResetRequest, SharedTunables, Timestamp, Tunables,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tracing::{debug, info, warn};

/// Source tag on events published by the loop.
const EVENT_SOURCE: &str = "fieldloc-runtime::scheduler";

/// Floor on the tick period so a zeroed tunable cannot busy-spin the task.
const MIN_PERIOD_SECS: f64 = 0.01;

// ─────────────────────────────────────────────────────────────────────────────
// Wiring
// ─────────────────────────────────────────────────────────────────────────────

/// Static configuration of one localisation loop.
pub struct LoopConfig {
    /// The belief filter implementation to drive.
    pub filter: Box<dyn BeliefFilter>,
    pub field: FieldGeometry,
    /// Initial tunables; live-updatable through the handle afterwards.
    pub tunables: Tunables,
    /// Time axis of the loop.
    pub clock: Arc<dyn Clock>,
    /// Take tick timestamps from the data source and bypass the referee.
    pub replay: bool,
}

/// The loop's external collaborators.
pub struct Collaborators {
    pub vision: Box<dyn VisionSource>,
    pub odometry: Box<dyn OdometrySource>,
    pub referee: Box<dyn RefereeSource>,
    pub fall: Box<dyn FallSource>,
    pub compass: Box<dyn CompassControl>,
    pub sink: Box<dyn LocalisationSink>,
    pub top_view: Option<Box<dyn TopViewSink>>,
}

/// Wire up a localisation loop.  Returns the scheduler (to be driven with
/// [`TickScheduler::run`]) and the command handle.
pub fn build(config: LoopConfig, collaborators: Collaborators) -> (TickScheduler, LocalisationHandle) {
    let now = config.clock.now();
    let belief = SharedBelief::new(config.filter);
    let consistency = SharedConsistency::new(now);
    let coordinator = ResetCoordinator::new(belief.clone(), consistency.clone());
    let tunables = SharedTunables::new(config.tunables);
    let bus = MonitorBus::default();
    let (estimate_tx, estimate_rx) = watch::channel(None);
    let wake = Arc::new(Notify::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = TickScheduler {
        belief,
        consistency,
        coordinator: coordinator.clone(),
        tunables: tunables.clone(),
        bus: bus.clone(),
        field: config.field,
        vision: collaborators.vision,
        odometry: collaborators.odometry,
        referee: collaborators.referee,
        fall: collaborators.fall,
        compass: collaborators.compass,
        sink: collaborators.sink,
        top_view: collaborators.top_view,
        replay: config.replay,
        arbiter: VisualCompassArbiter::new(),
        driver: FilterDriver::new(now),
        publisher: ResultPublisher::new(config.field),
        estimate_tx,
        wake: Arc::clone(&wake),
        shutdown_rx,
        clock: Arc::clone(&config.clock),
        last_forbidden: None,
    };
    let handle = LocalisationHandle {
        coordinator,
        tunables,
        bus,
        estimate_rx,
        wake,
        shutdown_tx,
        clock: config.clock,
    };
    (scheduler, handle)
}

// ─────────────────────────────────────────────────────────────────────────────
// TickScheduler
// ─────────────────────────────────────────────────────────────────────────────

/// Owns one localisation loop end to end.
pub struct TickScheduler {
    belief: SharedBelief,
    consistency: SharedConsistency,
    coordinator: ResetCoordinator,
    tunables: SharedTunables,
    bus: MonitorBus,
    field: FieldGeometry,
    vision: Box<dyn VisionSource>,
    odometry: Box<dyn OdometrySource>,
    referee: Box<dyn RefereeSource>,
    fall: Box<dyn FallSource>,
    compass: Box<dyn CompassControl>,
    sink: Box<dyn LocalisationSink>,
    top_view: Option<Box<dyn TopViewSink>>,
    replay: bool,
    arbiter: VisualCompassArbiter,
    driver: FilterDriver,
    publisher: ResultPublisher,
    estimate_tx: watch::Sender<Option<PoseEstimate>>,
    wake: Arc<Notify>,
    shutdown_rx: watch::Receiver<bool>,
    clock: Arc<dyn Clock>,
    /// Tick time when the referee last forbade play; `Some` until a tick
    /// passes the restart gate again.
    last_forbidden: Option<Timestamp>,
}

impl TickScheduler {
    /// Run ticks until shutdown.
    pub async fn run(mut self) {
        info!(replay = self.replay, "localisation loop running");
        loop {
            if *self.shutdown_rx.borrow() {
                break;
            }
            self.tick();
            if !self.wait_for_next_tick().await {
                break;
            }
        }
        info!("localisation loop stopped");
    }

    /// Sleep until the next tick is due, an external command wakes the
    /// loop, or shutdown is requested.  Returns `false` on shutdown.
    async fn wait_for_next_tick(&mut self) -> bool {
        let period = Duration::from_secs_f64(self.tunables.get().period.max(MIN_PERIOD_SECS));
        tokio::select! {
            _ = tokio::time::sleep(period) => true,
            _ = self.wake.notified() => true,
            changed = self.shutdown_rx.changed() => match changed {
                Ok(()) => !*self.shutdown_rx.borrow(),
                Err(_) => false,
            },
        }
    }

    /// One full localisation tick.
    fn tick(&mut self) {
        let tunables = self.tunables.get();
        let frame = self.vision.poll();

        // Replay takes its time axis from the source; nothing to do until
        // the source produces a frame.
        let now = if self.replay {
            match &frame {
                Some(f) => f.timestamp,
                None => return,
            }
        } else {
            self.clock.now()
        };

        // ── Safety gates ─────────────────────────────────────────────────────
        if !self.replay && self.referee.play_forbidden() {
            self.enter_forbidden(now, &tunables);
            return;
        }
        if self.fall.is_fallen() {
            self.publish_estimate(now);
            self.skip("robot fallen", now);
            return;
        }
        // After play resumes the belief stays put until a deliberate
        // re-entry placement arrives or the grace window ends; a pending
        // uniform reset does not count as a placement.
        if let Some(last) = self.last_forbidden {
            let placed = self
                .belief
                .pending_kind()
                .is_some_and(|kind| kind != ResetKind::Uniform);
            if !placed && now.diff_secs(last) < tunables.restart_grace {
                debug!(
                    elapsed = now.diff_secs(last),
                    "inside the restart grace window"
                );
                self.publish_estimate(now);
                self.skip("awaiting re-entry placement", now);
                return;
            }
            self.last_forbidden = None;
            info!("play allowed again; resuming fusion");
        }

        // ── Compass arbitration and extraction ───────────────────────────────
        let state = self.consistency.get();
        let desired = VisualCompassArbiter::desired(
            tunables.consistency_enabled,
            state.vc_observations,
            tunables.min_vc_observations,
        );
        if self.arbiter.set_active(desired, &mut *self.compass) {
            let _ = self.bus.publish(LocalisationEvent::new(
                EVENT_SOURCE,
                EventPayload::CompassMode { active: desired },
            ));
        }

        // A re-seed tick is never mixed with observations gathered from the
        // pre-reset pose.
        let snapshot = self.belief.snapshot();
        let observations = match &frame {
            Some(f) if snapshot.pending_reset.is_none() => {
                extract(&f.detections, &f.frame, &tunables, self.arbiter.is_active())
            }
            _ => Vec::new(),
        };
        let vc_count = observations
            .iter()
            .filter(|obs| obs.kind() == ObservationKind::Compass)
            .count() as u32;
        if vc_count > 0 {
            self.consistency.with(|s| s.vc_observations += vc_count);
        }

        // ── Consistency watchdog ─────────────────────────────────────────────
        if tunables.consistency_enabled {
            let reset_pending = snapshot.pending_reset.is_some();
            let elapsed_before = now.diff_secs(self.consistency.get().last_uniform_reset);
            let verdict = self.consistency.with(|s| {
                score_tick(
                    &observations,
                    &snapshot.pose,
                    &self.field,
                    &tunables,
                    s,
                    now,
                    reset_pending,
                )
            });
            if verdict.request_uniform {
                warn!(
                    elapsed = elapsed_before,
                    "consistency collapsed; requesting uniform reset"
                );
                let _ = self.bus.publish(LocalisationEvent::new(
                    EVENT_SOURCE,
                    EventPayload::ConsistencyCollapsed {
                        elapsed_since_uniform_reset: elapsed_before,
                    },
                ));
                if self.coordinator.request(
                    ResetRequest::Uniform,
                    now,
                    tunables.min_vc_observations,
                ) {
                    let _ = self.bus.publish(LocalisationEvent::new(
                        EVENT_SOURCE,
                        EventPayload::ResetRequested {
                            kind: ResetKind::Uniform,
                        },
                    ));
                }
            }
        } else {
            // The published score carries no meaning while the watchdog is
            // off.
            self.consistency.with(|s| s.score = 0.0);
        }

        // ── Filter update ────────────────────────────────────────────────────
        let state = self.consistency.get();
        let odometry = &mut self.odometry;
        let outcome = self.driver.tick(
            &self.belief,
            &state,
            &tunables,
            now,
            &observations,
            |from, to| odometry.displacement(from, to),
        );
        if let Some(reason) = outcome.skip_reason {
            self.skip(reason, now);
        } else if let Some(kind) = outcome.consumed_reset {
            info!(%kind, "belief re-seeded");
        }

        self.publish_estimate(now);
    }

    /// Referee forbids play: no fusion, no pending uniform reset, no
    /// compass bootstrap pending either — the robot will be re-placed by
    /// hand, so the estimate stream stays alive but the belief stays put.
    fn enter_forbidden(&mut self, now: Timestamp, tunables: &Tunables) {
        if self.coordinator.cancel_uniform() {
            info!("pending uniform reset cancelled while play is forbidden");
            let _ = self.bus.publish(LocalisationEvent::new(
                EVENT_SOURCE,
                EventPayload::ResetCancelled {
                    kind: ResetKind::Uniform,
                },
            ));
        }
        let min = tunables.min_vc_observations;
        self.consistency.with(|s| {
            if s.vc_observations < min {
                s.vc_observations = min;
            }
        });
        if self.arbiter.set_active(false, &mut *self.compass) {
            let _ = self.bus.publish(LocalisationEvent::new(
                EVENT_SOURCE,
                EventPayload::CompassMode { active: false },
            ));
        }
        self.last_forbidden = Some(now);
        self.publish_estimate(now);
        self.skip("play forbidden", now);
    }

    fn publish_estimate(&mut self, now: Timestamp) {
        let snapshot = self.belief.snapshot();
        let state = self.consistency.get();
        let estimate = self.publisher.publish(
            &self.belief,
            &snapshot,
            &state,
            now,
            &mut *self.sink,
            self.top_view.as_mut().map(|v| v.as_mut() as &mut dyn TopViewSink),
        );
        let _ = self.estimate_tx.send(Some(estimate.clone()));
        let _ = self.bus.publish(LocalisationEvent::new(
            EVENT_SOURCE,
            EventPayload::Estimate(estimate),
        ));
    }

    fn skip(&self, reason: &str, _now: Timestamp) {
        debug!(reason, "tick skipped");
        let _ = self.bus.publish(LocalisationEvent::new(
            EVENT_SOURCE,
            EventPayload::TickSkipped {
                reason: reason.to_string(),
            },
        ));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
