//! Simulated arena for the `fieldloc` binary.
//!
//! A robot walks a circle around the field centre; the camera reports a
//! goal whenever one is inside the field of view, plus a compass sample of
//! modest quality.  Odometry is derived from the same ground truth, so the
//! dead-reckoning belief filter tracks it and the full tick pipeline can
//! be exercised without hardware.

use fieldloc_engine::{
    BeliefFilter, CompassSample, LocalisationSink, MotionUpdate, RawDetections,
};
use fieldloc_runtime::{Clock, FallSource, OdometrySource, RefereeSource, VisionFrame, VisionSource};
use fieldloc_types::{
    FieldGeometry, Observation, Pose, PoseEstimate, ResetRequest, SelfFrame, Timestamp,
    normalize_angle,
};
use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;
use tracing::info;

/// Half-angle of the simulated camera's horizontal field of view.
const CAMERA_HALF_FOV: f64 = 0.7;
/// Camera height above ground, metres.
const TRUNK_HEIGHT: f64 = 0.55;

// ─────────────────────────────────────────────────────────────────────────────
// Ground truth
// ─────────────────────────────────────────────────────────────────────────────

/// Deterministic ground-truth trajectory: a circle of `radius` metres
/// walked at `angular_speed` rad/s, heading tangent to the circle.
#[derive(Debug, Clone, Copy)]
pub struct SimWorld {
    pub field: FieldGeometry,
    pub radius: f64,
    pub angular_speed: f64,
}

impl SimWorld {
    pub fn new(field: FieldGeometry) -> Self {
        Self {
            field,
            radius: 1.5,
            angular_speed: 0.1,
        }
    }

    /// True pose at time `t`.
    pub fn pose_at(&self, t: Timestamp) -> Pose {
        let phase = self.angular_speed * t.0;
        Pose::new(
            self.radius * phase.cos(),
            self.radius * phase.sin(),
            phase + FRAC_PI_2,
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Collaborators
// ─────────────────────────────────────────────────────────────────────────────

/// Camera simulation: one frame per poll, goals gated on the field of view.
pub struct SimVision {
    world: SimWorld,
    clock: Arc<dyn Clock>,
    /// In replay mode the source stamps its own time axis, advancing this
    /// many seconds per frame.
    replay_step: Option<f64>,
    replay_time: f64,
}

impl SimVision {
    pub fn new(world: SimWorld, clock: Arc<dyn Clock>, replay_step: Option<f64>) -> Self {
        Self {
            world,
            clock,
            replay_step,
            replay_time: 0.0,
        }
    }

    fn visible_goals(&self, pose: &Pose) -> Vec<[f64; 2]> {
        self.world
            .field
            .goal_centers()
            .into_iter()
            .filter(|goal| pose.bearing_to(*goal).abs() < CAMERA_HALF_FOV)
            .collect()
    }
}

impl VisionSource for SimVision {
    fn poll(&mut self) -> Option<VisionFrame> {
        let now = match self.replay_step {
            Some(step) => {
                self.replay_time += step;
                Timestamp(self.replay_time)
            }
            None => self.clock.now(),
        };
        let pose = self.world.pose_at(now);
        Some(VisionFrame {
            detections: RawDetections {
                goals: self.visible_goals(&pose),
                compass: vec![CompassSample {
                    direction: pose.theta,
                    quality: 0.8,
                }],
                ..Default::default()
            },
            frame: SelfFrame {
                position: [pose.x, pose.y],
                yaw: pose.theta,
                trunk_height: TRUNK_HEIGHT,
            },
            timestamp: now,
        })
    }
}

/// Perfect odometry derived from the ground truth.
pub struct SimOdometry {
    world: SimWorld,
}

impl SimOdometry {
    pub fn new(world: SimWorld) -> Self {
        Self { world }
    }
}

impl OdometrySource for SimOdometry {
    fn displacement(&mut self, from: Timestamp, to: Timestamp) -> [f64; 3] {
        let a = self.world.pose_at(from);
        let b = self.world.pose_at(to);
        // World-frame delta, rotated into the self frame at `from`.
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let (sin, cos) = a.theta.sin_cos();
        [
            dx * cos + dy * sin,
            -dx * sin + dy * cos,
            normalize_angle(b.theta - a.theta),
        ]
    }
}

/// Referee that always allows play.
pub struct AlwaysPlaying;

impl RefereeSource for AlwaysPlaying {
    fn play_forbidden(&mut self) -> bool {
        false
    }
}

/// Fall detector for a robot that never falls.
pub struct NeverFallen;

impl FallSource for NeverFallen {
    fn is_fallen(&mut self) -> bool {
        false
    }
}

/// Sink that logs each estimate.
pub struct LogSink;

impl LocalisationSink for LogSink {
    fn publish(&mut self, estimate: &PoseEstimate) {
        info!(
            heading = estimate.heading,
            quality = estimate.quality,
            consistency = estimate.consistency,
            center_x = estimate.center_in_self[0],
            center_y = estimate.center_in_self[1],
            t = estimate.timestamp.0,
            "estimate"
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Belief filter
// ─────────────────────────────────────────────────────────────────────────────

/// Minimal belief: a single pose integrated from odometry.
///
/// Quality rises while observations keep arriving and decays on blind
/// ticks; re-seeds move the pose to the requested placement.  Enough to
/// exercise every path of the tick pipeline without a particle cloud.
pub struct DeadReckoningFilter {
    field: FieldGeometry,
    pose: Pose,
    quality: f64,
    particles: usize,
}

impl DeadReckoningFilter {
    pub fn new(field: FieldGeometry, start: Pose) -> Self {
        Self {
            field,
            pose: start,
            quality: 0.5,
            particles: 0,
        }
    }
}

impl BeliefFilter for DeadReckoningFilter {
    fn advance(&mut self, motion: &MotionUpdate, observations: &[Observation], _elapsed: f64) {
        let (sin, cos) = self.pose.theta.sin_cos();
        self.pose = Pose::new(
            self.pose.x + motion.translation[0] * cos - motion.translation[1] * sin,
            self.pose.y + motion.translation[0] * sin + motion.translation[1] * cos,
            self.pose.theta + motion.rotation,
        );
        self.quality = if observations.is_empty() {
            (self.quality * 0.95).max(0.2)
        } else {
            (self.quality + 0.05).min(0.9)
        };
    }

    fn apply_reset(&mut self, request: &ResetRequest) {
        match request {
            ResetRequest::Uniform => {
                self.pose = Pose::default();
                self.quality = 0.1;
            }
            ResetRequest::Borders => {
                // Re-entry on the touch line, facing the field.
                self.pose = Pose::new(0.0, -self.field.width / 2.0, FRAC_PI_2);
                self.quality = 0.5;
            }
            ResetRequest::Fall => {
                self.quality *= 0.8;
            }
            ResetRequest::Custom(custom) => {
                self.pose = Pose::new(custom.x, custom.y, custom.theta);
                self.quality = 0.8;
            }
        }
    }

    fn representative(&self) -> (Pose, f64) {
        (self.pose, self.quality)
    }

    fn resize(&mut self, particle_count: usize) {
        self.particles = particle_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> SimWorld {
        SimWorld::new(FieldGeometry::default())
    }

    #[test]
    fn odometry_matches_the_ground_truth() {
        let w = world();
        let mut odometry = SimOdometry::new(w);
        let from = Timestamp(0.0);
        let to = Timestamp(2.0);
        let d = odometry.displacement(from, to);

        // Re-integrating the displacement from the start pose must land on
        // the ground-truth pose at `to`.
        let a = w.pose_at(from);
        let (sin, cos) = a.theta.sin_cos();
        let x = a.x + d[0] * cos - d[1] * sin;
        let y = a.y + d[0] * sin + d[1] * cos;
        let b = w.pose_at(to);
        assert!((x - b.x).abs() < 1e-9);
        assert!((y - b.y).abs() < 1e-9);
        assert!((normalize_angle(a.theta + d[2] - b.theta)).abs() < 1e-9);
    }

    #[test]
    fn vision_reports_only_goals_in_view() {
        let w = world();
        // At phase 0 the robot is at (1.5, 0) heading +Y: both goals are
        // off to the sides, outside the field of view.
        let vision = SimVision::new(w, Arc::new(FixedClock(Timestamp(0.0))), None);
        let pose = w.pose_at(Timestamp(0.0));
        assert!(vision.visible_goals(&pose).is_empty());

        // Facing along +X sees the opponent goal.
        let facing_goal = Pose::new(0.0, 0.0, 0.0);
        let goals = vision.visible_goals(&facing_goal);
        assert_eq!(goals, vec![[4.5, 0.0]]);
    }

    #[test]
    fn replay_vision_stamps_its_own_time_axis() {
        let w = world();
        let mut vision = SimVision::new(w, Arc::new(FixedClock(Timestamp(99.0))), Some(0.5));
        let first = vision.poll().unwrap();
        let second = vision.poll().unwrap();
        assert_eq!(first.timestamp, Timestamp(0.5));
        assert_eq!(second.timestamp, Timestamp(1.0));
    }

    #[test]
    fn filter_tracks_motion_updates() {
        let mut filter = DeadReckoningFilter::new(FieldGeometry::default(), Pose::default());
        filter.advance(
            &MotionUpdate {
                translation: [1.0, 0.0],
                rotation: 0.0,
                noise_gain: 1.0,
            },
            &[],
            1.0,
        );
        let (pose, _) = filter.representative();
        assert!((pose.x - 1.0).abs() < 1e-9);
    }

    #[test]
    fn uniform_reset_floors_the_quality() {
        let mut filter = DeadReckoningFilter::new(FieldGeometry::default(), Pose::new(2.0, 1.0, 0.3));
        filter.apply_reset(&ResetRequest::Uniform);
        let (pose, quality) = filter.representative();
        assert_eq!(pose, Pose::default());
        assert!(quality <= 0.1);
    }

    #[test]
    fn borders_reset_places_on_the_touch_line() {
        let mut filter = DeadReckoningFilter::new(FieldGeometry::default(), Pose::default());
        filter.apply_reset(&ResetRequest::Borders);
        let (pose, _) = filter.representative();
        assert_eq!(pose.y, -3.0);
    }

    struct FixedClock(Timestamp);

    impl Clock for FixedClock {
        fn now(&self) -> Timestamp {
            self.0
        }
    }
}
