//! Runtime-tunable parameters of the localisation engine.
//!
//! A strongly-typed structure constructed at startup and shared by
//! reference, replacing the dynamic named-parameter tree of the original
//! engine.  Every field has a serde default so operator override files only
//! need to name what they change; the CLI deserialises the whole struct
//! from TOML.
//!
//! Runtime tuning goes through [`SharedTunables`], the narrow read/write
//! accessor: the tick loop re-reads the values at the top of every tick.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

/// All tunable parameters, with the defaults the original engine shipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tunables {
    /// Seconds between two localisation ticks.
    #[serde(default = "default_period")]
    pub period: f64,

    /// Master switch of the consistency watchdog.  When disabled the score
    /// is pinned to 0 every tick and no watchdog resets are requested.
    #[serde(default = "default_true")]
    pub consistency_enabled: bool,
    /// Ambient per-tick decay of the consistency score.
    #[serde(default = "default_step_cost")]
    pub step_cost: f64,
    /// Score penalty per goal observation contradicting the belief.
    #[serde(default = "default_bad_obs_cost")]
    pub bad_obs_cost: f64,
    /// Score gain per goal observation agreeing with the belief.
    #[serde(default = "default_good_obs_gain")]
    pub good_obs_gain: f64,
    /// Minimum seconds between two watchdog uniform resets.
    #[serde(default = "default_reset_interval")]
    pub reset_interval: f64,
    /// Motion-noise multiplier when the consistency score reaches 0.
    #[serde(default = "default_max_noise")]
    pub max_noise: f64,

    /// Motion-noise multiplier right after a uniform reset.
    #[serde(default = "default_max_noise_boost")]
    pub max_noise_boost: f64,
    /// Seconds over which the post-reset boost decays linearly to 1.
    #[serde(default = "default_noise_boost_duration")]
    pub noise_boost_duration: f64,

    /// Compass observations needed since the last uniform reset before the
    /// visual compass is released.
    #[serde(default = "default_min_vc_observations")]
    pub min_vc_observations: u32,
    /// Homography quality below which a compass sample is rejected.
    #[serde(default = "default_compass_quality_threshold")]
    pub compass_quality_threshold: f64,

    /// Particle count the belief filter is resized to each advancing tick.
    #[serde(default = "default_particle_count")]
    pub particle_count: usize,
    /// Master switch of belief fusion.
    #[serde(default = "default_true")]
    pub field_filter_enabled: bool,

    /// Angular separation below which two goal detections merge.
    #[serde(default = "default_goal_similarity_threshold")]
    pub goal_similarity_threshold: f64,
    /// Field-prior shape: goalkeepers concentrate around their own goal.
    #[serde(default)]
    pub goalkeeper: bool,

    /// Seconds to keep waiting for a deliberate re-seed after the referee
    /// allows play again.
    #[serde(default = "default_restart_grace")]
    pub restart_grace: f64,
}

fn default_period() -> f64 {
    3.0
}
fn default_true() -> bool {
    true
}
fn default_step_cost() -> f64 {
    0.005
}
fn default_bad_obs_cost() -> f64 {
    0.05
}
fn default_good_obs_gain() -> f64 {
    0.08
}
fn default_reset_interval() -> f64 {
    90.0
}
fn default_max_noise() -> f64 {
    3.0
}
fn default_max_noise_boost() -> f64 {
    10.0
}
fn default_noise_boost_duration() -> f64 {
    20.0
}
fn default_min_vc_observations() -> u32 {
    1
}
fn default_compass_quality_threshold() -> f64 {
    0.5
}
fn default_particle_count() -> usize {
    3000
}
fn default_goal_similarity_threshold() -> f64 {
    0.26
}
fn default_restart_grace() -> f64 {
    10.0
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            period: default_period(),
            consistency_enabled: true,
            step_cost: default_step_cost(),
            bad_obs_cost: default_bad_obs_cost(),
            good_obs_gain: default_good_obs_gain(),
            reset_interval: default_reset_interval(),
            max_noise: default_max_noise(),
            max_noise_boost: default_max_noise_boost(),
            noise_boost_duration: default_noise_boost_duration(),
            min_vc_observations: default_min_vc_observations(),
            compass_quality_threshold: default_compass_quality_threshold(),
            particle_count: default_particle_count(),
            field_filter_enabled: true,
            goal_similarity_threshold: default_goal_similarity_threshold(),
            goalkeeper: false,
            restart_grace: default_restart_grace(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared accessor
// ─────────────────────────────────────────────────────────────────────────────

/// Thread-safe handle on the live tunables.
///
/// Readers take a cheap clone of the whole struct; writers mutate in place.
/// The tick loop calls [`get`][SharedTunables::get] once at the top of every
/// tick, so an operator change takes effect on the next tick.
#[derive(Clone, Debug, Default)]
pub struct SharedTunables {
    inner: Arc<RwLock<Tunables>>,
}

impl SharedTunables {
    pub fn new(tunables: Tunables) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tunables)),
        }
    }

    /// Snapshot of the current values.
    pub fn get(&self) -> Tunables {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply an operator change; visible from the next tick on.
    pub fn update(&self, apply: impl FnOnce(&mut Tunables)) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut guard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_shipped_constants() {
        let t = Tunables::default();
        assert_eq!(t.period, 3.0);
        assert_eq!(t.step_cost, 0.005);
        assert_eq!(t.bad_obs_cost, 0.05);
        assert_eq!(t.good_obs_gain, 0.08);
        assert_eq!(t.reset_interval, 90.0);
        assert_eq!(t.max_noise, 3.0);
        assert_eq!(t.max_noise_boost, 10.0);
        assert_eq!(t.noise_boost_duration, 20.0);
        assert_eq!(t.min_vc_observations, 1);
        assert_eq!(t.particle_count, 3000);
        assert!(t.consistency_enabled);
        assert!(!t.goalkeeper);
    }

    #[test]
    fn empty_override_yields_defaults() {
        let t: Tunables = serde_json::from_str("{}").unwrap();
        assert_eq!(t, Tunables::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let t: Tunables = serde_json::from_str(r#"{"period": 0.5, "goalkeeper": true}"#).unwrap();
        assert_eq!(t.period, 0.5);
        assert!(t.goalkeeper);
        assert_eq!(t.step_cost, 0.005);
    }

    #[test]
    fn shared_update_is_visible_to_readers() {
        let shared = SharedTunables::new(Tunables::default());
        shared.update(|t| t.period = 1.25);
        assert_eq!(shared.get().period, 1.25);
    }

    #[test]
    fn clones_share_the_same_values() {
        let shared = SharedTunables::new(Tunables::default());
        let other = shared.clone();
        shared.update(|t| t.min_vc_observations = 9);
        assert_eq!(other.get().min_vc_observations, 9);
    }
}
