//! Reset side effects and the shared counters/score pair.
//!
//! Two critical sections exist in the engine: the belief surface
//! ([`crate::belief::SharedBelief`]) and the [`SharedConsistency`] pair
//! defined here.  They are never held simultaneously and neither is held
//! across slow work.

use crate::belief::SharedBelief;
use fieldloc_types::{ResetKind, ResetRequest, Timestamp};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

/// Consistency score, visual-compass counter and the reset timestamps they
/// are gated on.  Guarded by one mutex, shared between the tick task and
/// the external command handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsistencyState {
    /// Bounded confidence in `[0, 1]`.
    pub score: f64,
    /// Compass observations accumulated since the last uniform reset.
    pub vc_observations: u32,
    /// When the belief was last re-seeded, from any source.
    pub last_field_reset: Timestamp,
    /// When the belief was last re-seeded uniformly.
    pub last_uniform_reset: Timestamp,
}

impl ConsistencyState {
    pub fn new(now: Timestamp) -> Self {
        Self {
            score: 1.0,
            vc_observations: 0,
            last_field_reset: now,
            last_uniform_reset: now,
        }
    }
}

/// Shared handle on the counters/score pair.
#[derive(Clone, Debug)]
pub struct SharedConsistency {
    inner: Arc<Mutex<ConsistencyState>>,
}

impl SharedConsistency {
    pub fn new(now: Timestamp) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ConsistencyState::new(now))),
        }
    }

    /// Run `f` under the lock.
    pub fn with<R>(&self, f: impl FnOnce(&mut ConsistencyState) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Copy of the current state.
    pub fn get(&self) -> ConsistencyState {
        self.with(|state| *state)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Coordinator
// ─────────────────────────────────────────────────────────────────────────────

/// Applies reset requests: places them in the belief's pending slot and,
/// when accepted, applies the kind-specific side effects on the
/// counters/score pair.
///
/// - **Uniform** zeroes the compass counter and the score and stamps both
///   reset timestamps: the filter must re-bootstrap its orientation.
/// - **Borders/Custom** top the counter up to the threshold and pin the
///   score to 1: the operator-provided pose is trusted, no compass
///   bootstrap needed.
/// - **Fall** stamps only the field-reset time; falling adds uncertainty
///   but does not invalidate the prior estimate, so motion from before the
///   fall must still be integrated.
#[derive(Clone)]
pub struct ResetCoordinator {
    belief: SharedBelief,
    consistency: SharedConsistency,
}

impl ResetCoordinator {
    pub fn new(belief: SharedBelief, consistency: SharedConsistency) -> Self {
        Self {
            belief,
            consistency,
        }
    }

    /// Request a re-seed.  Returns whether the pending slot accepted it
    /// (a lower-priority request never displaces a pending deliberate
    /// reset, and its side effects are not applied either).
    pub fn request(
        &self,
        request: ResetRequest,
        now: Timestamp,
        min_vc_observations: u32,
    ) -> bool {
        let kind = request.kind();
        if !self.belief.request_reset(request) {
            warn!(%kind, "reset request rejected by a higher-priority pending reset");
            return false;
        }
        self.consistency.with(|state| {
            state.last_field_reset = now;
            match kind {
                ResetKind::Uniform => {
                    state.last_uniform_reset = now;
                    state.vc_observations = 0;
                    state.score = 0.0;
                }
                ResetKind::Borders | ResetKind::Custom => {
                    state.vc_observations = min_vc_observations;
                    state.score = 1.0;
                }
                ResetKind::Fall => {}
            }
        });
        info!(%kind, "reset requested");
        true
    }

    /// Safety cancellation: drops a pending Uniform reset only.
    pub fn cancel_uniform(&self) -> bool {
        self.belief.cancel_pending(ResetKind::Uniform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::test_support::RecordingFilter;
    use fieldloc_types::{CustomPose, Pose};

    fn setup() -> (ResetCoordinator, SharedBelief, SharedConsistency) {
        let belief = SharedBelief::new(Box::new(RecordingFilter::at(Pose::default())));
        let consistency = SharedConsistency::new(Timestamp(100.0));
        (
            ResetCoordinator::new(belief.clone(), consistency.clone()),
            belief,
            consistency,
        )
    }

    #[test]
    fn uniform_zeroes_counters_and_stamps_both_timestamps() {
        let (coordinator, belief, consistency) = setup();
        consistency.with(|state| {
            state.score = 0.7;
            state.vc_observations = 5;
        });
        assert!(coordinator.request(ResetRequest::Uniform, Timestamp(150.0), 3));
        let state = consistency.get();
        assert_eq!(state.score, 0.0);
        assert_eq!(state.vc_observations, 0);
        assert_eq!(state.last_field_reset, Timestamp(150.0));
        assert_eq!(state.last_uniform_reset, Timestamp(150.0));
        assert_eq!(belief.pending_kind(), Some(ResetKind::Uniform));
    }

    #[test]
    fn borders_tops_up_counter_and_pins_score() {
        let (coordinator, _belief, consistency) = setup();
        consistency.with(|state| state.score = 0.2);
        assert!(coordinator.request(ResetRequest::Borders, Timestamp(150.0), 3));
        let state = consistency.get();
        assert_eq!(state.score, 1.0);
        assert_eq!(state.vc_observations, 3);
        assert_eq!(state.last_field_reset, Timestamp(150.0));
        // Uniform timestamp untouched.
        assert_eq!(state.last_uniform_reset, Timestamp(100.0));
    }

    #[test]
    fn custom_behaves_like_borders_for_the_counters() {
        let (coordinator, _belief, consistency) = setup();
        assert!(coordinator.request(
            ResetRequest::Custom(CustomPose::default()),
            Timestamp(120.0),
            2
        ));
        let state = consistency.get();
        assert_eq!(state.score, 1.0);
        assert_eq!(state.vc_observations, 2);
    }

    #[test]
    fn fall_touches_only_the_field_reset_time() {
        let (coordinator, _belief, consistency) = setup();
        consistency.with(|state| {
            state.score = 0.4;
            state.vc_observations = 7;
        });
        assert!(coordinator.request(ResetRequest::Fall, Timestamp(130.0), 3));
        let state = consistency.get();
        assert_eq!(state.score, 0.4);
        assert_eq!(state.vc_observations, 7);
        assert_eq!(state.last_field_reset, Timestamp(130.0));
        assert_eq!(state.last_uniform_reset, Timestamp(100.0));
    }

    #[test]
    fn rejected_request_applies_no_side_effects() {
        let (coordinator, belief, consistency) = setup();
        assert!(coordinator.request(ResetRequest::Borders, Timestamp(110.0), 3));
        let before = consistency.get();
        // Uniform loses to the pending Borders: slot and counters unchanged.
        assert!(!coordinator.request(ResetRequest::Uniform, Timestamp(120.0), 3));
        assert_eq!(consistency.get(), before);
        assert_eq!(belief.pending_kind(), Some(ResetKind::Borders));
    }

    #[test]
    fn cancel_uniform_leaves_deliberate_resets_alone() {
        let (coordinator, belief, _consistency) = setup();
        coordinator.request(ResetRequest::Fall, Timestamp(110.0), 3);
        assert!(!coordinator.cancel_uniform());
        assert_eq!(belief.pending_kind(), Some(ResetKind::Fall));
    }

    #[test]
    fn cancel_uniform_drops_a_pending_uniform() {
        let (coordinator, belief, _consistency) = setup();
        coordinator.request(ResetRequest::Uniform, Timestamp(110.0), 3);
        assert!(coordinator.cancel_uniform());
        assert_eq!(belief.pending_kind(), None);
    }
}
