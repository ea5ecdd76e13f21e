//! `fieldloc-types` – leaf data model of the localisation engine.
//!
//! Plain, serialisable types shared by every other FieldLoc crate.  Nothing
//! in here spawns tasks or holds locks beyond the thin [`SharedTunables`]
//! accessor.
//!
//! # Modules
//!
//! - [`pose`] – [`Pose`][pose::Pose], [`SelfFrame`][pose::SelfFrame] and the
//!   [`Timestamp`][pose::Timestamp] seconds axis the tick loop runs on.
//! - [`field`] – [`FieldGeometry`][field::FieldGeometry]: arena dimensions
//!   and goal-post positions used for scoring and estimate projection.
//! - [`observation`] – the tagged [`Observation`][observation::Observation]
//!   sum type (goal, arena corner, marker cluster, compass, field prior).
//! - [`reset`] – [`ResetRequest`][reset::ResetRequest]: the typed re-seeding
//!   requests consumed once per tick by the filter driver.
//! - [`estimate`] – [`PoseEstimate`][estimate::PoseEstimate]: the fused
//!   per-tick output pushed to downstream consumers.
//! - [`tunables`] – [`Tunables`][tunables::Tunables]: the strongly-typed
//!   runtime-tunable parameter set with persisted defaults.
//! - [`event`] – [`LocalisationEvent`][event::LocalisationEvent]: monitoring
//!   events published on the runtime broadcast bus.
//! - [`error`] – [`LocError`][error::LocError].

pub mod error;
pub mod estimate;
pub mod event;
pub mod field;
pub mod observation;
pub mod pose;
pub mod reset;
pub mod tunables;

pub use error::LocError;
pub use estimate::PoseEstimate;
pub use event::{EventPayload, LocalisationEvent};
pub use field::FieldGeometry;
pub use observation::{
    ArenaCornerObservation, CompassObservation, FieldPriorObservation, GoalObservation,
    MarkerClusterObservation, Observation, ObservationKind,
};
pub use pose::{Pose, SelfFrame, Timestamp, normalize_angle};
pub use reset::{CustomPose, ResetKind, ResetRequest};
pub use tunables::{SharedTunables, Tunables};
