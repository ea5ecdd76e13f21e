//! Typed sensor observations produced once per tick by the extractor.
//!
//! The original engine singled observation kinds out at runtime; here the
//! kinds are a tagged sum type, so the consistency watchdog pattern-matches
//! only on [`Observation::Goal`] and the excluded kinds are explicit and
//! exhaustiveness-checked.
//!
//! Observations are created fresh each tick from raw detections, handed to
//! the belief filter once, and dropped at the end of the tick.  None of
//! them is ever persisted.

use crate::error::LocError;
use crate::field::FieldGeometry;
use crate::pose::{Pose, angle_between};
use serde::{Deserialize, Serialize};

/// Width of the angular agreement bell used to score a goal observation
/// against the representative pose, radians.
const GOAL_PAN_SIGMA: f64 = 0.35;

/// Score below which a goal observation is treated as disagreeing with the
/// representative pose: either vision produced a false positive or the
/// belief is grossly wrong.
const GOAL_MIN_SCORE: f64 = 0.3;

// ─────────────────────────────────────────────────────────────────────────────
// Variant payloads
// ─────────────────────────────────────────────────────────────────────────────

/// Directional observation of one goal, self-relative pan/tilt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalObservation {
    /// Bearing to the goal, counter-clockwise from straight ahead, radians.
    pub pan: f64,
    /// Downward inclination to the goal's foot point, radians.
    pub tilt: f64,
    /// Camera origin height when the observation was made, metres.
    pub robot_height: f64,
    /// Fusion weight; merging accumulates it.
    pub weight: f64,
}

impl GoalObservation {
    pub fn new(pan: f64, tilt: f64, robot_height: f64) -> Self {
        Self {
            pan,
            tilt,
            robot_height,
            weight: 1.0,
        }
    }

    /// Two goal detections below the similarity threshold are one physical
    /// goal seen as two blobs and must not be double-counted.
    pub fn is_similar(&self, other: &GoalObservation, threshold: f64) -> bool {
        angle_between(self.pan, other.pan) < threshold
            && angle_between(self.tilt, other.tilt) < threshold
    }

    /// Merge `other` into `self`, keeping the combined information: angles
    /// become the weight-weighted mean, weights accumulate.
    pub fn merge(&mut self, other: &GoalObservation) {
        let total = self.weight + other.weight;
        self.pan = (self.pan * self.weight + other.pan * other.weight) / total;
        self.tilt = (self.tilt * self.weight + other.tilt * other.weight) / total;
        self.weight = total;
    }

    /// Agreement between this observation and a candidate pose, in `[0, 1]`.
    ///
    /// Goal observations are unsigned, so the score is the best match over
    /// both goal centres: a Gaussian bell over the pan error with width
    /// [`GOAL_PAN_SIGMA`].
    pub fn potential(&self, pose: &Pose, field: &FieldGeometry) -> f64 {
        field
            .goal_centers()
            .iter()
            .map(|center| {
                let expected_pan = pose.bearing_to(*center);
                let err = angle_between(self.pan, expected_pan);
                (-0.5 * (err / GOAL_PAN_SIGMA).powi(2)).exp()
            })
            .fold(0.0, f64::max)
    }

    /// Minimum acceptable [`potential`][Self::potential] before the
    /// watchdog counts this observation as contradicting the belief.
    pub fn min_score(&self) -> f64 {
        GOAL_MIN_SCORE
    }
}

/// Directional observation of one arena corner.
///
/// Only built from detections the upstream clipping detector flagged valid;
/// construction still rejects degenerate geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArenaCornerObservation {
    pub pan: f64,
    pub tilt: f64,
    pub robot_height: f64,
    /// Ground distance from the robot to the corner, metres.
    pub corner_distance: f64,
    pub weight: f64,
}

impl ArenaCornerObservation {
    /// Build a corner observation, rejecting degenerate geometry.
    ///
    /// # Errors
    ///
    /// [`LocError::DegenerateCorner`] when any angle is non-finite or the
    /// corner distance is not strictly positive — the single observation is
    /// discarded, the tick continues.
    pub fn new(
        pan: f64,
        tilt: f64,
        robot_height: f64,
        corner_distance: f64,
    ) -> Result<Self, LocError> {
        if !pan.is_finite() || !tilt.is_finite() {
            return Err(LocError::DegenerateCorner(format!(
                "non-finite direction (pan: {pan}, tilt: {tilt})"
            )));
        }
        if !corner_distance.is_finite() || corner_distance <= 0.0 {
            return Err(LocError::DegenerateCorner(format!(
                "corner distance must be positive, got {corner_distance}"
            )));
        }
        Ok(Self {
            pan,
            tilt,
            robot_height,
            corner_distance,
            weight: 1.0,
        })
    }
}

/// All samples of one fiducial marker this tick, aggregated into a single
/// observation so a tag seen in many pixels cannot dominate the fusion
/// step with N independent observations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerClusterObservation {
    /// Marker identity.
    pub id: u32,
    /// Mean position in the self frame, metres.
    pub position: [f64; 3],
    /// Per-axis standard deviation of the sample set, metres.
    pub std_dev: [f64; 3],
    pub robot_height: f64,
    /// Number of raw samples aggregated into this cluster.
    pub samples: usize,
    pub weight: f64,
}

/// Visual-compass heading relative to the robot trunk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompassObservation {
    /// Heading in the trunk frame, radians.
    pub heading: f64,
    pub weight: f64,
}

/// Weak prior toward plausible field regions.  Appended only when at least
/// one real observation exists this tick, so an idle tick never drives the
/// filter on the prior alone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldPriorObservation {
    /// Goalkeepers get a prior concentrated around their own goal area.
    pub goalkeeper: bool,
    pub weight: f64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Sum type
// ─────────────────────────────────────────────────────────────────────────────

/// One typed sensor reading, owned by the tick that created it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Observation {
    Goal(GoalObservation),
    ArenaCorner(ArenaCornerObservation),
    MarkerCluster(MarkerClusterObservation),
    Compass(CompassObservation),
    FieldPrior(FieldPriorObservation),
}

/// Discriminant of [`Observation`], for counting and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservationKind {
    Goal,
    ArenaCorner,
    MarkerCluster,
    Compass,
    FieldPrior,
}

impl Observation {
    pub fn kind(&self) -> ObservationKind {
        match self {
            Observation::Goal(_) => ObservationKind::Goal,
            Observation::ArenaCorner(_) => ObservationKind::ArenaCorner,
            Observation::MarkerCluster(_) => ObservationKind::MarkerCluster,
            Observation::Compass(_) => ObservationKind::Compass,
            Observation::FieldPrior(_) => ObservationKind::FieldPrior,
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            Observation::Goal(o) => o.weight,
            Observation::ArenaCorner(o) => o.weight,
            Observation::MarkerCluster(o) => o.weight,
            Observation::Compass(o) => o.weight,
            Observation::FieldPrior(o) => o.weight,
        }
    }
}

impl std::fmt::Display for ObservationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ObservationKind::Goal => "goal",
            ObservationKind::ArenaCorner => "arena_corner",
            ObservationKind::MarkerCluster => "marker_cluster",
            ObservationKind::Compass => "compass",
            ObservationKind::FieldPrior => "field_prior",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn similar_goals_within_threshold() {
        let a = GoalObservation::new(0.10, 0.30, 0.5);
        let b = GoalObservation::new(0.15, 0.32, 0.5);
        assert!(a.is_similar(&b, 0.26));
    }

    #[test]
    fn distinct_goals_outside_threshold() {
        let a = GoalObservation::new(0.10, 0.30, 0.5);
        let b = GoalObservation::new(0.60, 0.30, 0.5);
        assert!(!a.is_similar(&b, 0.26));
    }

    #[test]
    fn merge_averages_by_weight_and_accumulates() {
        let mut a = GoalObservation::new(0.0, 0.2, 0.5);
        let b = GoalObservation::new(0.2, 0.4, 0.5);
        a.merge(&b);
        assert!((a.pan - 0.1).abs() < 1e-9);
        assert!((a.tilt - 0.3).abs() < 1e-9);
        assert!((a.weight - 2.0).abs() < 1e-9);
    }

    #[test]
    fn merge_is_weighted_toward_the_heavier_observation() {
        let mut a = GoalObservation::new(0.0, 0.0, 0.5);
        let b = GoalObservation::new(0.3, 0.0, 0.5);
        a.merge(&b); // a now has weight 2 at pan 0.15
        let c = GoalObservation::new(0.0, 0.0, 0.5);
        a.merge(&c);
        // (0.15 * 2 + 0.0) / 3 = 0.1
        assert!((a.pan - 0.1).abs() < 1e-9);
    }

    #[test]
    fn potential_is_high_when_looking_at_a_goal() {
        let field = FieldGeometry::default();
        // Robot at centre facing the opponent goal, observation straight ahead.
        let pose = Pose::new(0.0, 0.0, 0.0);
        let obs = GoalObservation::new(0.0, 0.3, 0.5);
        assert!(obs.potential(&pose, &field) > 0.99);
    }

    #[test]
    fn potential_matches_either_goal() {
        let field = FieldGeometry::default();
        // Observation pointing backwards matches the own goal.
        let pose = Pose::new(0.0, 0.0, 0.0);
        let obs = GoalObservation::new(PI, 0.3, 0.5);
        assert!(obs.potential(&pose, &field) > 0.99);
    }

    #[test]
    fn potential_is_low_for_a_sideways_goal() {
        let field = FieldGeometry::default();
        let pose = Pose::new(0.0, 0.0, 0.0);
        // Neither goal is anywhere near 90 degrees to the left from centre.
        let obs = GoalObservation::new(std::f64::consts::FRAC_PI_2, 0.3, 0.5);
        assert!(obs.potential(&pose, &field) < obs.min_score());
    }

    #[test]
    fn degenerate_corner_is_rejected() {
        assert!(ArenaCornerObservation::new(f64::NAN, 0.1, 0.5, 1.0).is_err());
        assert!(ArenaCornerObservation::new(0.1, 0.1, 0.5, 0.0).is_err());
        assert!(ArenaCornerObservation::new(0.1, 0.1, 0.5, -2.0).is_err());
        assert!(ArenaCornerObservation::new(0.1, 0.1, 0.5, 1.5).is_ok());
    }

    #[test]
    fn kind_discriminants() {
        let obs = Observation::Compass(CompassObservation {
            heading: 0.0,
            weight: 1.0,
        });
        assert_eq!(obs.kind(), ObservationKind::Compass);
        assert_eq!(obs.kind().to_string(), "compass");
    }

    #[test]
    fn observation_serde_roundtrip() {
        let obs = Observation::MarkerCluster(MarkerClusterObservation {
            id: 7,
            position: [1.0, -0.5, 0.3],
            std_dev: [0.01, 0.02, 0.03],
            robot_height: 0.5,
            samples: 4,
            weight: 1.0,
        });
        let json = serde_json::to_string(&obs).unwrap();
        let back: Observation = serde_json::from_str(&json).unwrap();
        assert_eq!(obs, back);
    }
}
