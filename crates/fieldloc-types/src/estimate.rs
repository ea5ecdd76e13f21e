//! Fused per-tick output of the localisation engine.

use crate::field::FieldGeometry;
use crate::pose::{Pose, Timestamp};
use serde::{Deserialize, Serialize};

/// The fused pose estimate pushed to downstream consumers once per tick.
///
/// Landmark positions are self-relative (what the behaviour stack wants to
/// aim at), the heading is the field-frame orientation of the robot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseEstimate {
    /// Left post of the opponent goal, self frame, metres.
    pub left_goal_in_self: [f64; 2],
    /// Right post of the opponent goal, self frame, metres.
    pub right_goal_in_self: [f64; 2],
    /// Field centre mark, self frame, metres.
    pub center_in_self: [f64; 2],
    /// Robot heading in the field frame, radians.
    pub heading: f64,
    /// Representative-particle quality in `[0, 1]`.
    pub quality: f64,
    /// Consistency-watchdog score in `[0, 1]`.
    pub consistency: f64,
    /// When the estimate was produced.
    pub timestamp: Timestamp,
}

impl PoseEstimate {
    /// Project a representative pose into the consumer-facing estimate.
    pub fn from_pose(
        pose: &Pose,
        quality: f64,
        consistency: f64,
        field: &FieldGeometry,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            left_goal_in_self: pose.field_to_self(field.opponent_left_post()),
            right_goal_in_self: pose.field_to_self(field.opponent_right_post()),
            center_in_self: pose.field_to_self([0.0, 0.0]),
            heading: pose.theta,
            quality,
            consistency,
            timestamp,
        }
    }
}
