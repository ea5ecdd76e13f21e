//! Raw vision detections → typed [`Observation`]s.
//!
//! One call per tick.  Goals are projected to self-relative pan/tilt and
//! merged when two detections are one physical goal; corners pass only
//! with the upstream validity flag and non-degenerate geometry; marker
//! samples of one identity collapse into a single cluster; compass samples
//! are gated on homography quality.  A weak field prior is appended only
//! when something else was seen, so an empty tick stays empty.

use fieldloc_types::{
    ArenaCornerObservation, CompassObservation, FieldPriorObservation, GoalObservation,
    MarkerClusterObservation, Observation, SelfFrame, Tunables, normalize_angle,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Raw detections
// ─────────────────────────────────────────────────────────────────────────────

/// One corner-clipping result from the vision pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerDetection {
    /// Corner position in the world frame, metres.
    pub world_position: [f64; 2],
    /// Whether the upstream detector considers this observation usable.
    pub valid: bool,
}

/// One fiducial-marker sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerDetection {
    pub id: u32,
    /// Marker position in the world frame, metres.
    pub world_position: [f64; 3],
}

/// One visual-compass result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompassSample {
    /// Heading in the world frame, radians.
    pub direction: f64,
    /// Homography quality in `[0, 1]`.
    pub quality: f64,
}

/// Everything the vision pipeline produced since the last tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDetections {
    /// Goal foot points in the world frame, metres.
    pub goals: Vec<[f64; 2]>,
    pub corners: Vec<CornerDetection>,
    pub markers: Vec<MarkerDetection>,
    pub compass: Vec<CompassSample>,
}

impl RawDetections {
    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
            && self.corners.is_empty()
            && self.markers.is_empty()
            && self.compass.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Extraction
// ─────────────────────────────────────────────────────────────────────────────

/// Produce this tick's observation list.
///
/// In compass-only mode every non-compass detector is suppressed: the
/// calibration sweep must not be mixed with goal/marker fusion.  The field
/// prior is appended in either mode, but only on top of at least one real
/// observation.
pub fn extract(
    raw: &RawDetections,
    frame: &SelfFrame,
    tunables: &Tunables,
    compass_only: bool,
) -> Vec<Observation> {
    let mut observations: Vec<Observation> = Vec::new();

    if compass_only {
        observations.extend(
            extract_compass(&raw.compass, frame, tunables.compass_quality_threshold)
                .into_iter()
                .map(Observation::Compass),
        );
    } else {
        observations.extend(
            extract_goals(&raw.goals, frame, tunables.goal_similarity_threshold)
                .into_iter()
                .map(Observation::Goal),
        );
        observations.extend(
            extract_corners(&raw.corners, frame)
                .into_iter()
                .map(Observation::ArenaCorner),
        );
        observations.extend(
            extract_markers(&raw.markers, frame)
                .into_iter()
                .map(Observation::MarkerCluster),
        );
    }

    for (index, obs) in observations.iter().enumerate() {
        debug!(index, kind = %obs.kind(), weight = obs.weight(), "extracted observation");
    }

    if !observations.is_empty() {
        observations.push(Observation::FieldPrior(FieldPriorObservation {
            goalkeeper: tunables.goalkeeper,
            weight: 1.0,
        }));
    }

    observations
}

/// Project goal detections to pan/tilt and merge near-identical ones.
pub fn extract_goals(
    goals: &[[f64; 2]],
    frame: &SelfFrame,
    similarity_threshold: f64,
) -> Vec<GoalObservation> {
    let mut merged: Vec<GoalObservation> = Vec::new();
    for world_pos in goals {
        let in_self = frame.world_to_self(*world_pos);
        let (pan, tilt) = frame.pan_tilt_to(in_self);
        let observation = GoalObservation::new(pan, tilt, frame.trunk_height);
        match merged
            .iter_mut()
            .find(|existing| existing.is_similar(&observation, similarity_threshold))
        {
            Some(existing) => existing.merge(&observation),
            None => merged.push(observation),
        }
    }
    merged
}

/// Keep valid corner detections, dropping degenerate geometry per
/// observation without aborting the tick.
pub fn extract_corners(
    corners: &[CornerDetection],
    frame: &SelfFrame,
) -> Vec<ArenaCornerObservation> {
    let mut observations = Vec::new();
    for detection in corners {
        if !detection.valid {
            continue;
        }
        let in_self = frame.world_to_self(detection.world_position);
        let (pan, tilt) = frame.pan_tilt_to(in_self);
        let distance = in_self[0].hypot(in_self[1]);
        match ArenaCornerObservation::new(pan, tilt, frame.trunk_height, distance) {
            Ok(observation) => observations.push(observation),
            Err(error) => warn!(%error, "discarding corner observation"),
        }
    }
    observations
}

/// Aggregate marker samples by identity: mean position, per-axis standard
/// deviation over the sample set, one cluster observation per id.
pub fn extract_markers(
    markers: &[MarkerDetection],
    frame: &SelfFrame,
) -> Vec<MarkerClusterObservation> {
    let mut by_id: BTreeMap<u32, Vec<[f64; 3]>> = BTreeMap::new();
    for marker in markers {
        let ground = frame.world_to_self([marker.world_position[0], marker.world_position[1]]);
        by_id
            .entry(marker.id)
            .or_default()
            .push([ground[0], ground[1], marker.world_position[2]]);
    }

    by_id
        .into_iter()
        .map(|(id, samples)| {
            let n = samples.len() as f64;
            let mut mean = [0.0; 3];
            for sample in &samples {
                for axis in 0..3 {
                    mean[axis] += sample[axis] / n;
                }
            }
            let mut variance = [0.0; 3];
            for sample in &samples {
                for axis in 0..3 {
                    let diff = sample[axis] - mean[axis];
                    variance[axis] += diff * diff / n;
                }
            }
            MarkerClusterObservation {
                id,
                position: mean,
                std_dev: [variance[0].sqrt(), variance[1].sqrt(), variance[2].sqrt()],
                robot_height: frame.trunk_height,
                samples: samples.len(),
                weight: 1.0,
            }
        })
        .collect()
}

/// Keep compass samples above the quality threshold and convert them to
/// trunk-relative headings.
pub fn extract_compass(
    samples: &[CompassSample],
    frame: &SelfFrame,
    quality_threshold: f64,
) -> Vec<CompassObservation> {
    samples
        .iter()
        .filter(|sample| sample.quality > quality_threshold)
        .map(|sample| CompassObservation {
            heading: normalize_angle(sample.direction - frame.trunk_yaw()),
            weight: 1.0,
        })
        .collect()
}
