//! `fieldloc-runtime` – the concurrent shell around the localisation
//! engine.
//!
//! Hosts the tick loop as a tokio task, exposes the external command
//! surface and the monitoring event stream, and defines the trait seams
//! through which the host process supplies vision, odometry, referee
//! state, fall detection and time.
//!
//! # Modules
//!
//! - [`scheduler`] – [`TickScheduler`][scheduler::TickScheduler]: the loop
//!   itself, the safety gates and the early-wake inter-tick wait; plus
//!   [`build`][scheduler::build], which wires a loop and its handle.
//! - [`handle`] – [`LocalisationHandle`][handle::LocalisationHandle]:
//!   reset commands, tunables access, estimate watch, event subscription,
//!   shutdown.
//! - [`inputs`] – the collaborator seams and the two clocks (monotonic and
//!   externally driven).
//! - [`bus`] – [`MonitorBus`][bus::MonitorBus]: best-effort broadcast of
//!   [`LocalisationEvent`][fieldloc_types::LocalisationEvent]s.
//! - [`telemetry`] – tracing subscriber bootstrap.

pub mod bus;
pub mod handle;
pub mod inputs;
pub mod scheduler;
pub mod telemetry;

pub use bus::{EventReceiver, MonitorBus};
pub use handle::LocalisationHandle;
pub use inputs::{
    Clock, FallSource, ManualClock, OdometrySource, RefereeSource, SystemClock, VisionFrame,
    VisionSource,
};
pub use scheduler::{Collaborators, LoopConfig, TickScheduler, build};
pub use telemetry::init_tracing;
