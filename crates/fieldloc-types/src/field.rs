//! Arena dimensions used for goal scoring and estimate projection.

use serde::{Deserialize, Serialize};

/// Field geometry in metres.  Defaults match a 9 × 6 m humanoid-league
/// field with 2.6 m goals; override through the CLI tunables file for other
/// arenas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldGeometry {
    /// Touch-line to touch-line, along +X.
    #[serde(default = "default_length")]
    pub length: f64,
    /// Goal-line to goal-line, along +Y.
    #[serde(default = "default_width")]
    pub width: f64,
    /// Distance between the two posts of one goal.
    #[serde(default = "default_goal_width")]
    pub goal_width: f64,
}

fn default_length() -> f64 {
    9.0
}
fn default_width() -> f64 {
    6.0
}
fn default_goal_width() -> f64 {
    2.6
}

impl Default for FieldGeometry {
    fn default() -> Self {
        Self {
            length: default_length(),
            width: default_width(),
            goal_width: default_goal_width(),
        }
    }
}

impl FieldGeometry {
    /// Centre of the goal the robot attacks, field frame.
    pub fn opponent_goal_center(&self) -> [f64; 2] {
        [self.length / 2.0, 0.0]
    }

    /// Centre of the goal the robot defends, field frame.
    pub fn own_goal_center(&self) -> [f64; 2] {
        [-self.length / 2.0, 0.0]
    }

    /// Both goal centres; goal observations are unsigned, so scoring checks
    /// each of them.
    pub fn goal_centers(&self) -> [[f64; 2]; 2] {
        [self.opponent_goal_center(), self.own_goal_center()]
    }

    /// Left post of the opponent goal as seen from the field centre.
    pub fn opponent_left_post(&self) -> [f64; 2] {
        [self.length / 2.0, self.goal_width / 2.0]
    }

    /// Right post of the opponent goal as seen from the field centre.
    pub fn opponent_right_post(&self) -> [f64; 2] {
        [self.length / 2.0, -self.goal_width / 2.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_geometry_is_nine_by_six() {
        let f = FieldGeometry::default();
        assert_eq!(f.length, 9.0);
        assert_eq!(f.width, 6.0);
    }

    #[test]
    fn goal_centers_are_opposed() {
        let f = FieldGeometry::default();
        let [opp, own] = f.goal_centers();
        assert_eq!(opp, [4.5, 0.0]);
        assert_eq!(own, [-4.5, 0.0]);
    }

    #[test]
    fn posts_straddle_the_goal_center() {
        let f = FieldGeometry::default();
        assert_eq!(f.opponent_left_post(), [4.5, 1.3]);
        assert_eq!(f.opponent_right_post(), [4.5, -1.3]);
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let f: FieldGeometry = serde_json::from_str("{}").unwrap();
        assert_eq!(f, FieldGeometry::default());
    }
}
