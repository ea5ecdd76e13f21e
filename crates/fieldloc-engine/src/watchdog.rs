//! Consistency scoring and the collapse decision.
//!
//! Every tick the bounded score drifts down by a fixed step and moves per
//! goal observation: up when the observation is plausible from the
//! representative pose, down when it is not.  Only goal observations are
//! scored; the field model gives them an unambiguous expected direction,
//! which corners, markers and compass readings lack.  When the score hits
//! the floor and enough time has passed since the last uniform re-seed,
//! the watchdog asks for a full re-localisation.

use crate::reset::ConsistencyState;
use fieldloc_types::{FieldGeometry, Observation, Pose, Timestamp, Tunables};
use tracing::debug;

/// What one scoring pass concluded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchdogVerdict {
    /// Score after this tick, in `[0, 1]`.
    pub score: f64,
    /// Signed change applied this tick, before clamping.
    pub delta: f64,
    /// Whether a uniform reset should be requested.
    pub request_uniform: bool,
}

/// Score this tick's observations against the representative pose and
/// decide whether the belief has collapsed.
///
/// Caller holds the consistency lock for the duration; scoring is pure
/// arithmetic, no I/O.  A collapse is never declared while a reset is
/// already pending, and never within the hold-off interval after the last
/// uniform re-seed, so one bad stretch produces one uniform reset, not a
/// storm.
pub fn score_tick(
    observations: &[Observation],
    pose: &Pose,
    field: &FieldGeometry,
    tunables: &Tunables,
    state: &mut ConsistencyState,
    now: Timestamp,
    reset_pending: bool,
) -> WatchdogVerdict {
    let mut delta = -tunables.step_cost;
    for obs in observations {
        let Observation::Goal(goal) = obs else {
            continue;
        };
        if goal.potential(pose, field) > goal.min_score() {
            delta += tunables.good_obs_gain;
        } else {
            delta -= tunables.bad_obs_cost;
        }
    }

    state.score = (state.score + delta).clamp(0.0, 1.0);

    let elapsed = now.diff_secs(state.last_uniform_reset);
    let request_uniform =
        !reset_pending && state.score <= 0.0 && elapsed > tunables.reset_interval;

    debug!(
        score = state.score,
        delta,
        elapsed,
        request_uniform,
        "consistency scored"
    );

    WatchdogVerdict {
        score: state.score,
        delta,
        request_uniform,
    }
}
