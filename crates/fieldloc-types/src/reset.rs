//! Typed re-seeding requests for the belief state.
//!
//! At most one request is pending at a time; it is consumed exactly once by
//! the filter driver and the slot returns to its resting state.  A new
//! request replaces a pending one only at equal or higher
//! [`priority`][ResetKind::priority], so a deliberate re-seed (borders,
//! fall, custom) is never silently displaced by a watchdog uniform reset.

use serde::{Deserialize, Serialize};

/// One request to re-seed the belief state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum ResetRequest {
    /// Spatially uniform prior over the whole field: full re-localisation.
    Uniform,
    /// Re-seed along the field borders, facing inwards (robots enter the
    /// field from the touch lines).
    Borders,
    /// Keep the estimate, inflate its uncertainty after a fall.
    Fall,
    /// Operator-provided pose with explicit noise magnitudes.
    Custom(CustomPose),
}

/// Payload of [`ResetRequest::Custom`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomPose {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
    /// Position spread around `(x, y)`, metres.
    pub position_noise: f64,
    /// Heading spread around `theta`, radians.
    pub theta_noise: f64,
}

impl ResetRequest {
    pub fn kind(&self) -> ResetKind {
        match self {
            ResetRequest::Uniform => ResetKind::Uniform,
            ResetRequest::Borders => ResetKind::Borders,
            ResetRequest::Fall => ResetKind::Fall,
            ResetRequest::Custom(_) => ResetKind::Custom,
        }
    }
}

/// Discriminant of [`ResetRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResetKind {
    Uniform,
    Borders,
    Fall,
    Custom,
}

impl ResetKind {
    /// Override ranking: a new request displaces a pending one only at
    /// equal or higher priority.  Uniform sits at the bottom — it is the
    /// only kind safety code may cancel, and it must never displace a
    /// deliberate re-seed.
    pub fn priority(self) -> u8 {
        match self {
            ResetKind::Uniform => 1,
            ResetKind::Fall => 2,
            ResetKind::Borders => 3,
            ResetKind::Custom => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ResetKind::Uniform => "uniform",
            ResetKind::Borders => "borders",
            ResetKind::Fall => "fall",
            ResetKind::Custom => "custom",
        }
    }
}

impl std::fmt::Display for ResetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_match_requests() {
        assert_eq!(ResetRequest::Uniform.kind(), ResetKind::Uniform);
        assert_eq!(
            ResetRequest::Custom(CustomPose::default()).kind(),
            ResetKind::Custom
        );
    }

    #[test]
    fn uniform_has_the_lowest_priority() {
        for kind in [ResetKind::Borders, ResetKind::Fall, ResetKind::Custom] {
            assert!(kind.priority() > ResetKind::Uniform.priority());
        }
    }

    #[test]
    fn custom_request_roundtrip() {
        let req = ResetRequest::Custom(CustomPose {
            x: 1.0,
            y: -2.0,
            theta: 0.5,
            position_noise: 0.3,
            theta_noise: 0.2,
        });
        let json = serde_json::to_string(&req).unwrap();
        let back: ResetRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req, back);
    }

    #[test]
    fn display_names() {
        assert_eq!(ResetKind::Borders.to_string(), "borders");
        assert_eq!(ResetKind::Uniform.to_string(), "uniform");
    }
}
