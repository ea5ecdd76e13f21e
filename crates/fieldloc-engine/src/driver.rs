//! [`FilterDriver`] – odometry window, adaptive noise gain and the
//! decision whether the belief advances at all this tick.
//!
//! The driver owns the `last integrated` timestamp: each tick integrates
//! relative motion over `(last_integrated, now]`, hands it to the belief
//! together with the observations, and moves the mark to `now` whether or
//! not the filter actually stepped, so a skipped tick never double-counts
//! motion later.

use crate::belief::{MotionUpdate, SharedBelief};
use crate::reset::ConsistencyState;
use fieldloc_types::{Observation, ResetKind, Timestamp, Tunables};
use std::f64::consts::FRAC_PI_2;
use tracing::{debug, warn};

/// What one driver pass did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    /// Whether the belief was stepped.
    pub advanced: bool,
    /// Motion handed to the filter (zero when the tick was skipped).
    pub motion: MotionUpdate,
    /// Reset consumed by the filter this tick, if any.
    pub consumed_reset: Option<ResetKind>,
    /// Why the tick was skipped, when it was.
    pub skip_reason: Option<&'static str>,
}

/// Motion-noise multiplier for this tick.
///
/// Right after a uniform reset the belief is spread over the whole field
/// and needs aggressive exploration: the gain starts at `max_noise_boost`
/// and decays linearly to nominal over `noise_boost_duration`.  Past the
/// boost, the gain tracks the consistency score — full confidence means
/// nominal noise, zero confidence means `max_noise` — unless the watchdog
/// is disabled, in which case it stays nominal.
pub fn noise_gain(elapsed_since_uniform_reset: f64, score: f64, tunables: &Tunables) -> f64 {
    if elapsed_since_uniform_reset < tunables.noise_boost_duration {
        let ratio = (elapsed_since_uniform_reset / tunables.noise_boost_duration).clamp(0.0, 1.0);
        tunables.max_noise_boost * (1.0 - ratio) + ratio
    } else if tunables.consistency_enabled {
        1.0 + (1.0 - score) * (tunables.max_noise - 1.0)
    } else {
        1.0
    }
}

/// Drives the belief forward once per tick.
#[derive(Debug)]
pub struct FilterDriver {
    last_integrated: Timestamp,
}

impl FilterDriver {
    pub fn new(now: Timestamp) -> Self {
        Self {
            last_integrated: now,
        }
    }

    /// Integrate motion over the update window, decide whether the belief
    /// should step, and step it.
    ///
    /// `odometry_diff` returns the relative displacement `[dx, dy, dθ]`
    /// (self frame at window start) between two timestamps.  When a
    /// re-seed other than a fall recovery is pending, the window is
    /// clipped to start no earlier than the re-seed: motion from before a
    /// deliberate re-placement is meaningless.  Fall recoveries keep the
    /// full window, the robot really did travel it.
    pub fn tick<F>(
        &mut self,
        belief: &SharedBelief,
        consistency: &ConsistencyState,
        tunables: &Tunables,
        now: Timestamp,
        observations: &[Observation],
        odometry_diff: F,
    ) -> TickOutcome
    where
        F: FnOnce(Timestamp, Timestamp) -> [f64; 3],
    {
        let pending = belief.pending_kind();
        let mut window_start = self.last_integrated;
        if let Some(kind) = pending {
            if kind != ResetKind::Fall && consistency.last_field_reset.0 > window_start.0 {
                window_start = consistency.last_field_reset;
            }
        }

        let elapsed = now.diff_secs(window_start).max(0.0);
        let displacement = odometry_diff(window_start, now);
        if displacement[2].abs() > FRAC_PI_2 {
            warn!(
                rotation = displacement[2],
                elapsed, "orientation jump over one update window"
            );
        }

        let elapsed_since_uniform = now.diff_secs(consistency.last_uniform_reset);
        let motion = MotionUpdate {
            translation: [displacement[0], displacement[1]],
            rotation: displacement[2],
            noise_gain: noise_gain(elapsed_since_uniform, consistency.score, tunables),
        };

        // The mark always moves: a skipped window is forfeited, never
        // replayed.
        self.last_integrated = now;

        if !tunables.field_filter_enabled {
            return TickOutcome {
                advanced: false,
                motion: MotionUpdate::default(),
                consumed_reset: None,
                skip_reason: Some("field filter disabled"),
            };
        }
        if observations.is_empty() && !motion.is_significant() && pending.is_none() {
            return TickOutcome {
                advanced: false,
                motion: MotionUpdate::default(),
                consumed_reset: None,
                skip_reason: Some("no observations, motion or pending reset"),
            };
        }

        let consumed_reset = belief.advance(&motion, observations, elapsed, tunables.particle_count);
        debug!(
            elapsed,
            noise_gain = motion.noise_gain,
            observations = observations.len(),
            ?consumed_reset,
            "belief advanced"
        );
        TickOutcome {
            advanced: true,
            motion,
            consumed_reset,
            skip_reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::test_support::RecordingFilter;
    use fieldloc_types::{GoalObservation, Pose, ResetRequest};

    fn tunables() -> Tunables {
        Tunables::default()
    }

    fn goal_obs() -> Vec<Observation> {
        vec![Observation::Goal(GoalObservation::new(0.0, 0.4, 0.5))]
    }

    #[test]
    fn gain_is_boosted_right_after_a_uniform_reset() {
        // Halfway through a 20 s boost with max 10: 10·0.5 + 0.5 = 5.5.
        let gain = noise_gain(10.0, 0.0, &tunables());
        assert!((gain - 5.5).abs() < 1e-9);
    }

    #[test]
    fn gain_tracks_the_score_past_the_boost() {
        let t = tunables();
        assert!((noise_gain(30.0, 1.0, &t) - 1.0).abs() < 1e-9);
        assert!((noise_gain(30.0, 0.0, &t) - 3.0).abs() < 1e-9);
        assert!((noise_gain(30.0, 0.5, &t) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn gain_is_continuous_at_the_boost_boundary_for_full_confidence() {
        let t = tunables();
        let just_inside = noise_gain(t.noise_boost_duration - 1e-9, 1.0, &t);
        let just_outside = noise_gain(t.noise_boost_duration, 1.0, &t);
        assert!((just_inside - just_outside).abs() < 1e-6);
    }

    #[test]
    fn gain_is_nominal_when_the_watchdog_is_disabled() {
        let mut t = tunables();
        t.consistency_enabled = false;
        assert!((noise_gain(30.0, 0.0, &t) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn still_tick_with_no_observations_is_skipped() {
        let belief = SharedBelief::new(Box::new(RecordingFilter::at(Pose::default())));
        let mut driver = FilterDriver::new(Timestamp(0.0));
        let state = ConsistencyState::new(Timestamp(0.0));
        let outcome = driver.tick(&belief, &state, &tunables(), Timestamp(3.0), &[], |_, _| {
            [0.0, 0.0, 0.0]
        });
        assert!(!outcome.advanced);
        assert_eq!(
            outcome.skip_reason,
            Some("no observations, motion or pending reset")
        );
    }

    #[test]
    fn motion_alone_advances_the_belief() {
        let belief = SharedBelief::new(Box::new(RecordingFilter::at(Pose::default())));
        let mut driver = FilterDriver::new(Timestamp(0.0));
        let state = ConsistencyState::new(Timestamp(0.0));
        let outcome = driver.tick(&belief, &state, &tunables(), Timestamp(3.0), &[], |_, _| {
            [0.3, 0.0, 0.0]
        });
        assert!(outcome.advanced);
        assert!((belief.snapshot().pose.x - 0.3).abs() < 1e-9);
    }

    #[test]
    fn pending_reset_forces_an_advance() {
        let belief = SharedBelief::new(Box::new(RecordingFilter::at(Pose::default())));
        belief.request_reset(ResetRequest::Uniform);
        let mut driver = FilterDriver::new(Timestamp(0.0));
        let state = ConsistencyState::new(Timestamp(0.0));
        let outcome = driver.tick(&belief, &state, &tunables(), Timestamp(3.0), &[], |_, _| {
            [0.0, 0.0, 0.0]
        });
        assert!(outcome.advanced);
        assert_eq!(outcome.consumed_reset, Some(ResetKind::Uniform));
    }

    #[test]
    fn disabled_filter_never_advances() {
        let belief = SharedBelief::new(Box::new(RecordingFilter::at(Pose::default())));
        let mut driver = FilterDriver::new(Timestamp(0.0));
        let state = ConsistencyState::new(Timestamp(0.0));
        let mut t = tunables();
        t.field_filter_enabled = false;
        let outcome = driver.tick(&belief, &state, &t, Timestamp(3.0), &goal_obs(), |_, _| {
            [0.3, 0.0, 0.0]
        });
        assert!(!outcome.advanced);
        assert_eq!(outcome.skip_reason, Some("field filter disabled"));
    }

    #[test]
    fn skipped_window_is_forfeited_not_replayed() {
        let belief = SharedBelief::new(Box::new(RecordingFilter::at(Pose::default())));
        let mut driver = FilterDriver::new(Timestamp(0.0));
        let state = ConsistencyState::new(Timestamp(0.0));
        // Skip at t=3.
        driver.tick(&belief, &state, &tunables(), Timestamp(3.0), &[], |_, _| {
            [0.0, 0.0, 0.0]
        });
        // Next tick's window must start at t=3, not t=0.
        let mut window = None;
        driver.tick(
            &belief,
            &state,
            &tunables(),
            Timestamp(6.0),
            &goal_obs(),
            |from, to| {
                window = Some((from, to));
                [0.0, 0.0, 0.0]
            },
        );
        assert_eq!(window, Some((Timestamp(3.0), Timestamp(6.0))));
    }

    #[test]
    fn deliberate_reset_clips_the_odometry_window() {
        let belief = SharedBelief::new(Box::new(RecordingFilter::at(Pose::default())));
        belief.request_reset(ResetRequest::Borders);
        let mut driver = FilterDriver::new(Timestamp(0.0));
        let mut state = ConsistencyState::new(Timestamp(0.0));
        state.last_field_reset = Timestamp(2.0);
        let mut window = None;
        driver.tick(&belief, &state, &tunables(), Timestamp(3.0), &[], |from, to| {
            window = Some((from, to));
            [0.0, 0.0, 0.0]
        });
        assert_eq!(window, Some((Timestamp(2.0), Timestamp(3.0))));
    }

    #[test]
    fn fall_recovery_keeps_the_full_window() {
        let belief = SharedBelief::new(Box::new(RecordingFilter::at(Pose::default())));
        belief.request_reset(ResetRequest::Fall);
        let mut driver = FilterDriver::new(Timestamp(0.0));
        let mut state = ConsistencyState::new(Timestamp(0.0));
        state.last_field_reset = Timestamp(2.0);
        let mut window = None;
        driver.tick(&belief, &state, &tunables(), Timestamp(3.0), &[], |from, to| {
            window = Some((from, to));
            [0.0, 0.0, 0.0]
        });
        assert_eq!(window, Some((Timestamp(0.0), Timestamp(3.0))));
    }

    #[test]
    fn noise_gain_reaches_the_motion_update() {
        let belief = SharedBelief::new(Box::new(RecordingFilter::at(Pose::default())));
        let mut driver = FilterDriver::new(Timestamp(0.0));
        let mut state = ConsistencyState::new(Timestamp(0.0));
        state.score = 0.0;
        state.last_uniform_reset = Timestamp(-100.0);
        let outcome = driver.tick(
            &belief,
            &state,
            &tunables(),
            Timestamp(3.0),
            &goal_obs(),
            |_, _| [0.0, 0.0, 0.0],
        );
        // Score 0 past the boost: gain = max_noise.
        assert!((outcome.motion.noise_gain - 3.0).abs() < 1e-9);
    }
}
