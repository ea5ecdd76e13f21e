//! `fieldloc` – runs the localisation loop against a simulated arena.
//!
//! 1. Loads operator configuration from `~/.fieldloc/config.toml` (every
//!    key optional, `FIELDLOC_*` environment overrides applied).
//! 2. Wires the tick loop to the simulated vision/odometry arena and a
//!    logging sink.
//! 3. Intercepts **Ctrl-C** to shut the loop down after the current tick.
//!
//! Pass `--replay` to drive the time axis from the simulated data source
//! instead of the wall clock.

mod config;
mod sim;

use fieldloc_engine::NoCompass;
use fieldloc_runtime::{Clock, Collaborators, LoopConfig, SystemClock, build, init_tracing};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    init_tracing();

    let mut cfg = match config::load() {
        Ok(Some(cfg)) => {
            info!(path = %config::config_path().display(), "configuration loaded");
            cfg
        }
        Ok(None) => {
            info!("no configuration file; using defaults");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            error!(error = %e, "configuration unreadable; using defaults");
            config::Config::default()
        }
    };
    if std::env::args().any(|arg| arg == "--replay") {
        cfg.replay = true;
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let world = sim::SimWorld::new(cfg.field);
    let replay_step = cfg.replay.then_some(cfg.tunables.period);
    let start = world.pose_at(clock.now());

    let (scheduler, handle) = build(
        LoopConfig {
            filter: Box::new(sim::DeadReckoningFilter::new(cfg.field, start)),
            field: cfg.field,
            tunables: cfg.tunables,
            clock: Arc::clone(&clock),
            replay: cfg.replay,
        },
        Collaborators {
            vision: Box::new(sim::SimVision::new(world, Arc::clone(&clock), replay_step)),
            odometry: Box::new(sim::SimOdometry::new(world)),
            referee: Box::new(sim::AlwaysPlaying),
            fall: Box::new(sim::NeverFallen),
            compass: Box::new(NoCompass),
            sink: Box::new(sim::LogSink),
            top_view: None,
        },
    );
    let handle = Arc::new(handle);

    // Graceful shutdown on Ctrl-C: the loop stops after the current tick.
    if let Err(e) = ctrlc::set_handler({
        let handle = Arc::clone(&handle);
        move || handle.shutdown()
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler");
    }

    // Echo monitoring events alongside the estimate log.
    let mut events = handle.subscribe();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!(source = %event.source, payload = ?event.payload, "event");
        }
    });

    scheduler.run().await;
    info!("fieldloc exited");
}
