//! Projection of the representative pose into the consumer-facing
//! estimate, plus the on-demand top-view render.
//!
//! Consumers never see the filter; they see a [`PoseEstimate`] of
//! self-relative landmark directions, published once per tick whether or
//! not the belief advanced.  The top view is rendered only while someone
//! is actually watching the stream.

use crate::belief::{BeliefSnapshot, SharedBelief};
use crate::reset::ConsistencyState;
use fieldloc_types::{FieldGeometry, PoseEstimate, Timestamp};
use tracing::trace;

/// Downstream consumer of the fused estimate.
pub trait LocalisationSink: Send {
    fn publish(&mut self, estimate: &PoseEstimate);
}

/// Optional debug-video consumer of the belief top view.
pub trait TopViewSink: Send {
    /// Whether anyone is watching; rendering is skipped otherwise.
    fn is_streaming(&self) -> bool;
    /// Requested frame size, pixels.
    fn resolution(&self) -> (usize, usize);
    /// Deliver one RGB frame of `width * height * 3` bytes.
    fn push(&mut self, width: usize, height: usize, frame: &[u8]);
}

/// Builds and publishes the per-tick estimate.
pub struct ResultPublisher {
    field: FieldGeometry,
    // Reused render buffer, sized lazily to the sink's resolution.
    frame: Vec<u8>,
}

impl ResultPublisher {
    pub fn new(field: FieldGeometry) -> Self {
        Self {
            field,
            frame: Vec::new(),
        }
    }

    /// Publish this tick's estimate and, when watched, the top view.
    pub fn publish(
        &mut self,
        belief: &SharedBelief,
        snapshot: &BeliefSnapshot,
        consistency: &ConsistencyState,
        now: Timestamp,
        sink: &mut dyn LocalisationSink,
        top_view: Option<&mut dyn TopViewSink>,
    ) -> PoseEstimate {
        let estimate = PoseEstimate::from_pose(
            &snapshot.pose,
            snapshot.quality,
            consistency.score,
            &self.field,
            now,
        );
        sink.publish(&estimate);
        trace!(
            x = snapshot.pose.x,
            y = snapshot.pose.y,
            theta = snapshot.pose.theta,
            quality = snapshot.quality,
            consistency = consistency.score,
            "estimate published"
        );

        if let Some(view) = top_view {
            if view.is_streaming() {
                let (width, height) = view.resolution();
                belief.render_top_view(width, height, &mut self.frame);
                view.push(width, height, &self.frame);
            }
        }

        estimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::test_support::RecordingFilter;
    use fieldloc_types::Pose;

    #[derive(Default)]
    struct VecSink {
        estimates: Vec<PoseEstimate>,
    }

    impl LocalisationSink for VecSink {
        fn publish(&mut self, estimate: &PoseEstimate) {
            self.estimates.push(estimate.clone());
        }
    }

    struct CountingView {
        streaming: bool,
        frames: usize,
        last_len: usize,
    }

    impl TopViewSink for CountingView {
        fn is_streaming(&self) -> bool {
            self.streaming
        }
        fn resolution(&self) -> (usize, usize) {
            (8, 4)
        }
        fn push(&mut self, _width: usize, _height: usize, frame: &[u8]) {
            self.frames += 1;
            self.last_len = frame.len();
        }
    }

    fn setup() -> (SharedBelief, ResultPublisher, ConsistencyState) {
        let belief = SharedBelief::new(Box::new(RecordingFilter::at(Pose::new(1.0, 0.0, 0.0))));
        (
            belief,
            ResultPublisher::new(FieldGeometry::default()),
            ConsistencyState::new(Timestamp(0.0)),
        )
    }

    #[test]
    fn estimate_carries_pose_quality_and_consistency() {
        let (belief, mut publisher, mut state) = setup();
        state.score = 0.8;
        let snapshot = belief.snapshot();
        let mut sink = VecSink::default();
        let estimate = publisher.publish(
            &belief,
            &snapshot,
            &state,
            Timestamp(5.0),
            &mut sink,
            None,
        );
        assert_eq!(sink.estimates.len(), 1);
        assert_eq!(estimate.consistency, 0.8);
        assert_eq!(estimate.quality, snapshot.quality);
        assert_eq!(estimate.timestamp, Timestamp(5.0));
    }

    #[test]
    fn top_view_rendered_only_while_streaming() {
        let (belief, mut publisher, state) = setup();
        let snapshot = belief.snapshot();
        let mut sink = VecSink::default();

        let mut idle = CountingView {
            streaming: false,
            frames: 0,
            last_len: 0,
        };
        publisher.publish(
            &belief,
            &snapshot,
            &state,
            Timestamp(5.0),
            &mut sink,
            Some(&mut idle),
        );
        assert_eq!(idle.frames, 0);

        let mut watching = CountingView {
            streaming: true,
            frames: 0,
            last_len: 0,
        };
        publisher.publish(
            &belief,
            &snapshot,
            &state,
            Timestamp(6.0),
            &mut sink,
            Some(&mut watching),
        );
        assert_eq!(watching.frames, 1);
        assert_eq!(watching.last_len, 8 * 4 * 3);
    }
}
