//! Operator configuration – reads `~/.fieldloc/config.toml`.
//!
//! The file is optional and every key has a default, so an override file
//! only needs to name what it changes:
//!
//! ```toml
//! replay = false
//!
//! [tunables]
//! period = 1.0
//! goalkeeper = true
//!
//! [field]
//! length = 9.0
//! width = 6.0
//! ```

use fieldloc_types::{FieldGeometry, LocError, Tunables};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Persisted operator configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tunables: Tunables,
    #[serde(default)]
    pub field: FieldGeometry,
    /// Drive the tick time axis from the data source.
    #[serde(default)]
    pub replay: bool,
}

/// Return the path to `~/.fieldloc/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
/// Extracted for testability without mutating environment variables.
fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".fieldloc").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, LocError> {
    load_from(&config_path())
}

fn load_from(path: &PathBuf) -> Result<Option<Config>, LocError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| LocError::Config(format!("failed to read {}: {e}", path.display())))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| LocError::Config(format!("failed to parse: {e}")))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `FIELDLOC_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `FIELDLOC_PERIOD` | `tunables.period` (seconds) |
/// | `FIELDLOC_PARTICLES` | `tunables.particle_count` |
/// | `FIELDLOC_REPLAY=1` | `replay` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("FIELDLOC_PERIOD")
        && let Ok(period) = v.parse::<f64>()
    {
        cfg.tunables.period = period;
    }
    if let Ok(v) = std::env::var("FIELDLOC_PARTICLES")
        && let Ok(particles) = v.parse::<usize>()
    {
        cfg.tunables.particle_count = particles;
    }
    if std::env::var("FIELDLOC_REPLAY").as_deref() == Ok("1") {
        cfg.replay = true;
    }
}
