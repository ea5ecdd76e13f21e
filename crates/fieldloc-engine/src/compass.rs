//! [`VisualCompassArbiter`] – decides when the extractor runs in
//! compass-only mode.
//!
//! After a uniform reset the belief has no usable orientation; until enough
//! compass observations have been accumulated, the tick uses only the
//! visual compass so the calibration sweep is not mixed with goal/marker
//! fusion.  Deliberate resets skip the bootstrap entirely (the operator's
//! pose is trusted).

use fieldloc_types::LocError;
use tracing::{error, info};

/// Control surface of the upstream visual-compass detector.
///
/// Toggling can fail when the external node is missing; that is logged and
/// not fatal — the arbiter keeps its decision and the flag stays accurate.
pub trait CompassControl: Send {
    fn set_enabled(&mut self, enabled: bool) -> Result<(), LocError>;
}

/// A [`CompassControl`] for deployments without a visual compass.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCompass;

impl CompassControl for NoCompass {
    fn set_enabled(&mut self, _enabled: bool) -> Result<(), LocError> {
        Ok(())
    }
}

/// Tracks whether the engine is currently in compass-only mode.
#[derive(Debug, Default)]
pub struct VisualCompassArbiter {
    active: bool,
}

impl VisualCompassArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether compass-only extraction is in force this tick.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The mode the engine should be in: bootstrap on the compass while the
    /// watchdog is enabled and too few compass observations have been
    /// accumulated since the last uniform reset.
    pub fn desired(consistency_enabled: bool, vc_observations: u32, min_vc_observations: u32) -> bool {
        consistency_enabled && vc_observations < min_vc_observations
    }

    /// Switch modes if needed, toggling the upstream detector.  Returns
    /// whether the mode changed.
    pub fn set_active(&mut self, active: bool, control: &mut dyn CompassControl) -> bool {
        if active == self.active {
            return false;
        }
        info!(active, previous = self.active, "visual compass mode change");
        self.active = active;
        if let Err(err) = control.set_enabled(active) {
            error!(%err, "unable to toggle visual compass detector");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlagControl {
        enabled: Option<bool>,
        fail: bool,
    }

    impl CompassControl for FlagControl {
        fn set_enabled(&mut self, enabled: bool) -> Result<(), LocError> {
            if self.fail {
                return Err(LocError::CompassControl("node missing".to_string()));
            }
            self.enabled = Some(enabled);
            Ok(())
        }
    }

    #[test]
    fn desired_follows_counter_and_threshold() {
        assert!(VisualCompassArbiter::desired(true, 0, 1));
        assert!(!VisualCompassArbiter::desired(true, 1, 1));
        assert!(!VisualCompassArbiter::desired(false, 0, 1));
    }

    #[test]
    fn mode_change_toggles_the_detector() {
        let mut arbiter = VisualCompassArbiter::new();
        let mut control = FlagControl {
            enabled: None,
            fail: false,
        };
        assert!(arbiter.set_active(true, &mut control));
        assert!(arbiter.is_active());
        assert_eq!(control.enabled, Some(true));

        assert!(arbiter.set_active(false, &mut control));
        assert_eq!(control.enabled, Some(false));
    }

    #[test]
    fn unchanged_mode_is_a_noop() {
        let mut arbiter = VisualCompassArbiter::new();
        let mut control = FlagControl {
            enabled: None,
            fail: false,
        };
        assert!(!arbiter.set_active(false, &mut control));
        assert_eq!(control.enabled, None);
    }

    #[test]
    fn toggle_failure_is_not_fatal_and_flag_still_tracks() {
        let mut arbiter = VisualCompassArbiter::new();
        let mut control = FlagControl {
            enabled: None,
            fail: true,
        };
        assert!(arbiter.set_active(true, &mut control));
        // The external toggle failed but the decision stands.
        assert!(arbiter.is_active());
    }
}
