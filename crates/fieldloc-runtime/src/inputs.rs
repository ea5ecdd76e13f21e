//! Collaborator seams of the tick loop.
//!
//! The loop itself owns no hardware: vision, odometry, the referee link,
//! the fall detector and the clock are all trait objects supplied by the
//! host process.  Production wires robot services behind these traits; the
//! CLI wires a simulated arena; tests wire scripted fakes.

use fieldloc_engine::RawDetections;
use fieldloc_types::{SelfFrame, Timestamp};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// One processed camera image: what was detected, from where, and when.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisionFrame {
    pub detections: RawDetections,
    /// Robot self frame at image capture time.
    pub frame: SelfFrame,
    /// Capture time on the loop's time axis.
    pub timestamp: Timestamp,
}

/// Vision pipeline seam.
pub trait VisionSource: Send {
    /// The newest unseen frame, or `None` when nothing new arrived since
    /// the last poll.
    fn poll(&mut self) -> Option<VisionFrame>;
}

/// Odometry seam: relative displacement `[dx, dy, dθ]` in the self frame
/// at `from`, integrated over `(from, to]`.
pub trait OdometrySource: Send {
    fn displacement(&mut self, from: Timestamp, to: Timestamp) -> [f64; 3];
}

/// Referee/game-controller seam.
pub trait RefereeSource: Send {
    /// Whether play is currently forbidden (penalised, set phase, robot
    /// handled).
    fn play_forbidden(&mut self) -> bool;
}

/// Fall detector seam.
pub trait FallSource: Send {
    /// Whether the robot is currently on the ground.
    fn is_fallen(&mut self) -> bool;
}

// ─────────────────────────────────────────────────────────────────────────────
// Clocks
// ─────────────────────────────────────────────────────────────────────────────

/// Time axis of the loop.  Monotonic in production; externally driven in
/// replay and tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Monotonic clock counting seconds since construction.
#[derive(Debug)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.start.elapsed().as_secs_f64())
    }
}

/// Externally-driven clock for replay and tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn at(seconds: f64) -> Self {
        Self {
            now: Arc::new(Mutex::new(seconds)),
        }
    }

    pub fn set(&self, seconds: f64) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = seconds;
    }

    pub fn advance(&self, seconds: f64) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) += seconds;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(*self.now.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_frame_is_empty_at_the_origin() {
        let frame = VisionFrame::default();
        assert_eq!(frame.detections, RawDetections::default());
        assert_eq!(frame.frame.position, [0.0, 0.0]);
        assert_eq!(frame.timestamp, Timestamp(0.0));
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b.0 >= a.0);
    }

    #[test]
    fn manual_clock_is_externally_driven() {
        let clock = ManualClock::at(5.0);
        assert_eq!(clock.now(), Timestamp(5.0));
        clock.advance(2.5);
        assert_eq!(clock.now(), Timestamp(7.5));
        clock.set(1.0);
        assert_eq!(clock.now(), Timestamp(1.0));
    }

    #[test]
    fn manual_clock_clones_share_the_axis() {
        let clock = ManualClock::at(0.0);
        let other = clock.clone();
        clock.advance(3.0);
        assert_eq!(other.now(), Timestamp(3.0));
    }
}
