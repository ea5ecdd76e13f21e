//! [`BeliefFilter`] – the opaque particle-filter seam – and
//! [`SharedBelief`], the critical section around its externally-visible
//! surface.
//!
//! The filter's motion/measurement math is an external collaborator; this
//! crate only needs to advance it, re-seed it and read a representative
//! pose.  [`SharedBelief`] is shared between the tick task and read-only
//! consumers (renderer, command handle); every access copies the summary
//! out under a short lock, and the lock is never held across detection
//! work or I/O.
//!
//! The pending-reset slot lives here rather than inside the filter: it is
//! part of the belief's externally-visible surface (consumers poll it to
//! wake the loop early) and its override/cancellation rules belong to the
//! engine, not to the particle math.

use fieldloc_types::{Observation, Pose, ResetKind, ResetRequest};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Relative motion integrated from odometry over one update window,
/// expressed in the self frame at the window start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionUpdate {
    /// Metres, self frame.
    pub translation: [f64; 2],
    /// Radians, counter-clockwise.
    pub rotation: f64,
    /// Multiplier on the filter's motion noise; 1 is nominal.
    pub noise_gain: f64,
}

impl MotionUpdate {
    /// Displacement below this is indistinguishable from odometry jitter.
    const MOTION_EPSILON: f64 = 1e-4;

    /// Whether the robot actually moved over the window.
    pub fn is_significant(&self) -> bool {
        self.translation[0].hypot(self.translation[1]) > Self::MOTION_EPSILON
            || self.rotation.abs() > Self::MOTION_EPSILON
    }
}

impl Default for MotionUpdate {
    fn default() -> Self {
        Self {
            translation: [0.0, 0.0],
            rotation: 0.0,
            noise_gain: 1.0,
        }
    }
}

/// The probabilistic belief over the robot pose, implementation-opaque.
pub trait BeliefFilter: Send {
    /// Advance the belief by one motion delta plus this tick's
    /// observations.  `elapsed` is the window length in seconds.
    fn advance(&mut self, motion: &MotionUpdate, observations: &[Observation], elapsed: f64);

    /// Re-seed the belief according to `request`.
    fn apply_reset(&mut self, request: &ResetRequest);

    /// Representative pose and its quality in `[0, 1]`.
    fn representative(&self) -> (Pose, f64);

    /// Resize the internal resolution (particle count).
    fn resize(&mut self, particle_count: usize);

    /// Render an RGB top view of the belief into `frame`
    /// (`width * height * 3` bytes).  The default paints it black; filters
    /// without a drawable representation need not override this.
    fn render_top_view(&self, width: usize, height: usize, frame: &mut Vec<u8>) {
        frame.clear();
        frame.resize(width * height * 3, 0);
    }
}

/// Copy of the belief's externally-visible surface, taken under the lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeliefSnapshot {
    pub pose: Pose,
    pub quality: f64,
    pub pending_reset: Option<ResetKind>,
}

struct BeliefSurface {
    filter: Box<dyn BeliefFilter>,
    pending: Option<ResetRequest>,
}

/// Shared handle on the belief state.  Clones are cheap and all refer to
/// the same filter.
#[derive(Clone)]
pub struct SharedBelief {
    inner: Arc<Mutex<BeliefSurface>>,
}

impl SharedBelief {
    pub fn new(filter: Box<dyn BeliefFilter>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BeliefSurface {
                filter,
                pending: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BeliefSurface> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Representative pose, quality and pending-reset flag, copied out.
    pub fn snapshot(&self) -> BeliefSnapshot {
        let surface = self.lock();
        let (pose, quality) = surface.filter.representative();
        BeliefSnapshot {
            pose,
            quality,
            pending_reset: surface.pending.as_ref().map(ResetRequest::kind),
        }
    }

    pub fn is_reset_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    pub fn pending_kind(&self) -> Option<ResetKind> {
        self.lock().pending.as_ref().map(ResetRequest::kind)
    }

    /// Put `request` in the pending slot.
    ///
    /// A pending request is displaced only by one of equal or higher
    /// priority, so a watchdog uniform reset never overrides a deliberate
    /// re-seed.  Returns whether the request was accepted.
    pub fn request_reset(&self, request: ResetRequest) -> bool {
        let mut surface = self.lock();
        match &surface.pending {
            Some(pending) if request.kind().priority() < pending.kind().priority() => false,
            _ => {
                surface.pending = Some(request);
                true
            }
        }
    }

    /// Cancel the pending request if (and only if) it is of `kind`.
    /// Safety code uses this to drop uniform resets while play is
    /// forbidden; deliberate re-seeds are never cancelled this way.
    pub fn cancel_pending(&self, kind: ResetKind) -> bool {
        let mut surface = self.lock();
        if surface.pending.as_ref().map(ResetRequest::kind) == Some(kind) {
            surface.pending = None;
            true
        } else {
            false
        }
    }

    /// Consume the pending reset (if any), resize and advance the filter —
    /// all under one lock so no snapshot can observe a half-applied tick.
    /// Returns the kind of the reset that was consumed.
    pub fn advance(
        &self,
        motion: &MotionUpdate,
        observations: &[Observation],
        elapsed: f64,
        particle_count: usize,
    ) -> Option<ResetKind> {
        let mut surface = self.lock();
        let consumed = surface.pending.take();
        surface.filter.resize(particle_count);
        if let Some(request) = &consumed {
            surface.filter.apply_reset(request);
        }
        surface.filter.advance(motion, observations, elapsed);
        consumed.map(|r| r.kind())
    }

    /// Render the belief top view into `frame`.
    pub fn render_top_view(&self, width: usize, height: usize, frame: &mut Vec<u8>) {
        self.lock().filter.render_top_view(width, height, frame);
    }
}
