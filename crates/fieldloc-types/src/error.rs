//! Error type spanning extraction failures, missing collaborators and
//! monitoring plumbing.

use thiserror::Error;

/// Errors surfaced by the localisation engine.
///
/// Nothing here is fatal to the tick loop: degenerate observations are
/// discarded and missing collaborators leave prior state unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocError {
    /// A single corner observation had degenerate geometry; it is dropped
    /// and the tick continues.
    #[error("degenerate corner observation: {0}")]
    DegenerateCorner(String),

    /// The upstream visual-compass detector could not be toggled; the
    /// arbiter keeps its decision and retries on the next mode change.
    #[error("visual compass control unavailable: {0}")]
    CompassControl(String),

    /// Monitoring bus plumbing failed.
    #[error("monitoring channel error: {0}")]
    Channel(String),

    /// Malformed tunables file or field override.
    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        let err = LocError::DegenerateCorner("distance -1".to_string());
        assert!(err.to_string().contains("distance -1"));

        let err = LocError::Config("bad period".to_string());
        assert!(err.to_string().contains("bad period"));
    }
}
