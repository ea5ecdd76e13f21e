//! `fieldloc-engine` – the observation-fusion pipeline.
//!
//! Everything that happens inside one localisation tick, between pulling
//! raw detections and publishing the fused estimate.  The tick cadence and
//! safety gating live in `fieldloc-runtime`; this crate is synchronous and
//! runs entirely on the caller's thread.
//!
//! # Modules
//!
//! - [`belief`] – [`BeliefFilter`][belief::BeliefFilter]: the opaque
//!   particle-filter seam, and [`SharedBelief`][belief::SharedBelief], the
//!   single critical section guarding its externally-visible surface
//!   (representative pose, pending-reset slot, rendering).
//! - [`extractor`] – raw detections → typed
//!   [`Observation`][fieldloc_types::Observation]s: goal merging, corner
//!   validity gating, marker aggregation, compass quality filtering and the
//!   conditional field prior.
//! - [`compass`] – [`VisualCompassArbiter`][compass::VisualCompassArbiter]:
//!   decides when the extractor runs in compass-only mode and toggles the
//!   upstream detector.
//! - [`watchdog`] – consistency scoring of goal observations against the
//!   representative pose, and the collapse decision that requests a full
//!   re-localisation.
//! - [`reset`] – the pending-reset state machine, the shared
//!   counters/score pair and the [`ResetCoordinator`][reset::ResetCoordinator]
//!   that applies a request's side effects.
//! - [`driver`] – [`FilterDriver`][driver::FilterDriver]: odometry window,
//!   adaptive noise gain and the decision whether to advance the belief at
//!   all this tick.
//! - [`publisher`] – projection of the representative pose into the
//!   consumer-facing estimate, plus the on-demand top-view render.

pub mod belief;
pub mod compass;
pub mod driver;
pub mod extractor;
pub mod publisher;
pub mod reset;
pub mod watchdog;

pub use belief::{BeliefFilter, BeliefSnapshot, MotionUpdate, SharedBelief};
pub use compass::{CompassControl, NoCompass, VisualCompassArbiter};
pub use driver::{FilterDriver, TickOutcome, noise_gain};
pub use extractor::{CornerDetection, CompassSample, MarkerDetection, RawDetections, extract};
pub use publisher::{LocalisationSink, ResultPublisher, TopViewSink};
pub use reset::{ConsistencyState, ResetCoordinator, SharedConsistency};
pub use watchdog::{WatchdogVerdict, score_tick};
