//! Monitoring events published on the runtime broadcast bus.
//!
//! Skipped ticks, forced resets and compass-mode toggles are all observable
//! here; no decision of the engine is silent.

use crate::estimate::PoseEstimate;
use crate::reset::ResetKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope for one monitoring event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalisationEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. `"fieldloc-runtime::scheduler"`.
    pub source: String,
    pub payload: EventPayload,
}

impl LocalisationEvent {
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    /// The fused estimate produced by this tick.
    Estimate(PoseEstimate),
    /// A reset entered the pending slot.
    ResetRequested { kind: ResetKind },
    /// A pending reset was cancelled by safety code.
    ResetCancelled { kind: ResetKind },
    /// The extractor switched in or out of compass-only mode.
    CompassMode { active: bool },
    /// Fusion was skipped this tick.
    TickSkipped { reason: String },
    /// The consistency score collapsed to zero.
    ConsistencyCollapsed { elapsed_since_uniform_reset: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_fills_envelope() {
        let event = LocalisationEvent::new(
            "fieldloc-runtime::scheduler",
            EventPayload::CompassMode { active: true },
        );
        assert_eq!(event.source, "fieldloc-runtime::scheduler");
        assert!(matches!(
            event.payload,
            EventPayload::CompassMode { active: true }
        ));
    }

    #[test]
    fn event_serde_roundtrip() {
        let event = LocalisationEvent::new(
            "test",
            EventPayload::ResetRequested {
                kind: ResetKind::Uniform,
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: LocalisationEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event.id, back.id);
        assert_eq!(event.payload, back.payload);
    }
}
