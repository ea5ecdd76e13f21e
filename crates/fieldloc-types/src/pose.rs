//! Robot pose, the trunk transform and the localisation time axis.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Normalise an angle to the half-open interval `(-π, π]`.
pub fn normalize_angle(mut theta: f64) -> f64 {
    while theta > PI {
        theta -= 2.0 * PI;
    }
    while theta <= -PI {
        theta += 2.0 * PI;
    }
    theta
}

/// Absolute angular separation between two directions, in `[0, π]`.
pub fn angle_between(a: f64, b: f64) -> f64 {
    normalize_angle(a - b).abs()
}

// ─────────────────────────────────────────────────────────────────────────────
// Pose
// ─────────────────────────────────────────────────────────────────────────────

/// Robot pose in the field frame.
///
/// Metres and radians; `theta` is measured counter-clockwise from the +X
/// axis, which points at the opponent goal.  The field origin is the centre
/// mark.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl Pose {
    /// Build a pose, normalising `theta` to `(-π, π]`.
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self {
            x,
            y,
            theta: normalize_angle(theta),
        }
    }

    /// Express a field-frame point in this pose's self frame
    /// (+X forward, +Y left).
    pub fn field_to_self(&self, point: [f64; 2]) -> [f64; 2] {
        let dx = point[0] - self.x;
        let dy = point[1] - self.y;
        let (sin, cos) = self.theta.sin_cos();
        [dx * cos + dy * sin, -dx * sin + dy * cos]
    }

    /// Bearing from this pose to a field-frame point, relative to the
    /// robot's heading.
    pub fn bearing_to(&self, point: [f64; 2]) -> f64 {
        let p = self.field_to_self(point);
        p[1].atan2(p[0])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SelfFrame
// ─────────────────────────────────────────────────────────────────────────────

/// Trunk transform established by the vision pipeline for this tick's
/// detections: where the robot trunk sits in the world frame and how high
/// the camera origin is above the ground.
///
/// The extractor uses it to project world-frame detections into
/// self-relative pan/tilt directions.  When no transform could be
/// established this tick the vision source reports `None` and extraction is
/// skipped rather than run on a stale basis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SelfFrame {
    /// Trunk position in the world frame, metres.
    pub position: [f64; 2],
    /// Trunk yaw in the world frame, radians.
    pub yaw: f64,
    /// Camera origin height above the ground, metres.
    pub trunk_height: f64,
}

impl SelfFrame {
    /// Express a world-frame ground point in the trunk's self frame.
    pub fn world_to_self(&self, point: [f64; 2]) -> [f64; 2] {
        let dx = point[0] - self.position[0];
        let dy = point[1] - self.position[1];
        let (sin, cos) = self.yaw.sin_cos();
        [dx * cos + dy * sin, -dx * sin + dy * cos]
    }

    /// Pan/tilt direction from the camera origin to a self-frame ground
    /// point.  Pan is counter-clockwise from straight ahead; tilt is
    /// positive downwards.
    pub fn pan_tilt_to(&self, point_in_self: [f64; 2]) -> (f64, f64) {
        let pan = point_in_self[1].atan2(point_in_self[0]);
        let distance = point_in_self[0].hypot(point_in_self[1]);
        let tilt = self.trunk_height.atan2(distance);
        (pan, tilt)
    }

    /// Trunk yaw in the world frame, radians.
    pub fn trunk_yaw(&self) -> f64 {
        self.yaw
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Timestamp
// ─────────────────────────────────────────────────────────────────────────────

/// A point on the localisation time axis, in seconds.
///
/// Monotonic wall-clock seconds in live mode; in replay mode the axis is
/// driven by the data source's own timestamps, so elapsed-time gates behave
/// identically on logs and on the robot.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Timestamp(pub f64);

impl Timestamp {
    /// Seconds elapsed since `earlier`.  Negative if `earlier` is later.
    pub fn diff_secs(self, earlier: Timestamp) -> f64 {
        self.0 - earlier.0
    }

    /// Shift this timestamp forward by `secs`.
    pub fn plus_secs(self, secs: f64) -> Timestamp {
        Timestamp(self.0 + secs)
    }
}
