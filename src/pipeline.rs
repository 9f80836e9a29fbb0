//! Frame-by-frame TTC pipeline.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::association::{cluster_range_points_with_roi, AssociationStats, RangeCrop};
use crate::clustering::{cluster_kpt_matches_with_roi, DEFAULT_OUTLIER_DISPLACEMENT_FACTOR};
use crate::detection::BoundingBox;
use crate::frame::DataFrame;
use crate::geometry::{Calibration, Projector};
use crate::matching::{match_bounding_boxes_with, BoxCorrespondence, BoxPair};
use crate::reporter::{LogReporter, TtcReporter};
use crate::ttc::{estimate_camera_ttc, estimate_lidar_ttc, valid_ttc, CameraTtc, LidarTtc};
use crate::ttc::{DEFAULT_MIN_DISTANCE, DEFAULT_TRIM_FRACTION};
use crate::{Error, Result};

/// Configuration for the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtcConfig {
    /// Sensor frame rate in Hz, shared by both estimators.
    pub frame_rate: f64,

    /// Fraction in [0, 1) by which boxes shrink before range points are associated.
    pub shrink_factor: f64,

    /// Minimum current keypoint separation (pixels) for a camera distance ratio.
    pub min_distance_threshold: f64,

    /// Keypoint matches moving at least this multiple of the mean displacement are dropped.
    pub outlier_displacement_factor: f64,

    /// LiDAR points deviating from the mean range by at least this fraction of it are dropped.
    pub lidar_trim_fraction: f64,

    /// Ego-lane crop applied to every scan, `None` to use scans as given.
    pub crop: Option<RangeCrop>,

    /// Ignore the last keypoint match when voting box correspondences.
    pub skip_final_match: bool,

    /// Number of frames kept in the ring buffer (at least 2 for TTC).
    pub buffer_size: usize,

    /// Log TTC values at `info` level instead of `debug`.
    pub verbose: bool,
}

impl Default for TtcConfig {
    fn default() -> Self {
        Self {
            frame_rate: 10.0,
            shrink_factor: 0.10,
            min_distance_threshold: DEFAULT_MIN_DISTANCE,
            outlier_displacement_factor: DEFAULT_OUTLIER_DISPLACEMENT_FACTOR,
            lidar_trim_fraction: DEFAULT_TRIM_FRACTION,
            crop: Some(RangeCrop::default()),
            skip_final_match: false,
            buffer_size: 2,
            verbose: false,
        }
    }
}

impl TtcConfig {
    /// Default configuration for the given frame rate.
    pub fn new(frame_rate: f64) -> Self {
        Self {
            frame_rate,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "frame_rate must be positive, got {}",
                self.frame_rate
            )));
        }
        if !(0.0..1.0).contains(&self.shrink_factor) {
            return Err(Error::InvalidConfig(format!(
                "shrink_factor must be in [0, 1), got {}",
                self.shrink_factor
            )));
        }
        if self.min_distance_threshold < 0.0 {
            return Err(Error::InvalidConfig(
                "min_distance_threshold must be non-negative".to_string(),
            ));
        }
        if self.outlier_displacement_factor <= 0.0 {
            return Err(Error::InvalidConfig(
                "outlier_displacement_factor must be positive".to_string(),
            ));
        }
        if self.lidar_trim_fraction <= 0.0 {
            return Err(Error::InvalidConfig(
                "lidar_trim_fraction must be positive".to_string(),
            ));
        }
        if self.buffer_size < 2 {
            return Err(Error::InvalidConfig(
                "buffer_size must hold at least two frames".to_string(),
            ));
        }
        Ok(())
    }
}

/// TTC estimates for one tracked object in the current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTtc {
    pub track_id: Option<usize>,
    pub prev_box_id: usize,
    pub curr_box_id: usize,
    /// Keypoint matches that voted for this box pair.
    pub votes: u32,
    /// LiDAR TTC in seconds, `None` when missing, non-finite or non-positive.
    pub ttc_lidar: Option<f64>,
    /// Camera TTC in seconds, `None` when missing, non-finite or non-positive.
    pub ttc_camera: Option<f64>,
    pub lidar: Option<LidarTtc>,
    pub camera: Option<CameraTtc>,
}

/// Output of [`TtcPipeline::push_frame`].
#[derive(Debug, Clone)]
pub struct FrameResult {
    pub frame_index: usize,
    pub association: AssociationStats,
    /// `None` for the first frame.
    pub correspondence: Option<BoxCorrespondence>,
    pub objects: Vec<ObjectTtc>,
}

/// Runs association, box matching and both TTC estimators on a stream of frames.
///
/// Each pushed frame is paired with the previous one. Frames are kept in a
/// small ring buffer; box point sets of the previous frame are trimmed in
/// place by the LiDAR estimator.
pub struct TtcPipeline<R: TtcReporter = LogReporter> {
    pub config: TtcConfig,
    projector: Projector,
    reporter: R,
    buffer: VecDeque<DataFrame>,
    frame_count: usize,
    track_id_counter: usize,
}

impl TtcPipeline<LogReporter> {
    /// Create a pipeline that logs through `tracing`.
    pub fn new(config: TtcConfig, calibration: &Calibration) -> Result<Self> {
        let reporter = LogReporter::new(config.verbose);
        Self::with_reporter(config, calibration, reporter)
    }
}

impl<R: TtcReporter> TtcPipeline<R> {
    pub fn with_reporter(config: TtcConfig, calibration: &Calibration, reporter: R) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            buffer: VecDeque::with_capacity(config.buffer_size),
            config,
            projector: Projector::new(calibration),
            reporter,
            frame_count: 0,
            track_id_counter: 0,
        })
    }

    /// Process the next frame against the previous one.
    ///
    /// `frame.kpt_matches` must link the previous frame's keypoints
    /// (`query_idx`) to this frame's keypoints (`train_idx`).
    pub fn push_frame(&mut self, mut frame: DataFrame) -> Result<FrameResult> {
        let frame_index = self.frame_count;
        let Self {
            config,
            projector,
            reporter,
            buffer,
            track_id_counter,
            ..
        } = self;

        if let Some(crop) = &config.crop {
            frame.range_points = crop.apply(&frame.range_points);
        }
        let association = cluster_range_points_with_roi(
            &mut frame.bounding_boxes,
            &frame.range_points,
            config.shrink_factor,
            projector,
        );
        reporter.on_association(frame_index, &association);

        let mut objects = Vec::new();
        let mut correspondence = None;
        if let Some(prev) = buffer.back_mut() {
            let corr = match_bounding_boxes_with(&frame.kpt_matches, prev, &frame, config.skip_final_match)?;
            reporter.on_correspondence(frame_index, &corr);

            for pair in corr.pairs() {
                if let Some(object) = process_pair(config, reporter, frame_index, pair, prev, &mut frame)? {
                    objects.push(object);
                }
            }
            correspondence = Some(corr);
        }

        // Boxes without a predecessor start a new track
        for bbox in frame.bounding_boxes.iter_mut().filter(|b| b.track_id.is_none()) {
            bbox.track_id = Some(*track_id_counter);
            *track_id_counter += 1;
        }

        buffer.push_back(frame);
        while buffer.len() > config.buffer_size {
            buffer.pop_front();
        }
        self.frame_count += 1;

        Ok(FrameResult {
            frame_index,
            association,
            correspondence,
            objects,
        })
    }

    /// Most recently pushed frame, with its associated points and matches.
    pub fn last_frame(&self) -> Option<&DataFrame> {
        self.buffer.back()
    }

    /// Buffered frames, oldest first.
    pub fn frames(&self) -> impl Iterator<Item = &DataFrame> {
        self.buffer.iter()
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Number of distinct track ids handed out so far.
    pub fn total_track_count(&self) -> usize {
        self.track_id_counter
    }

    /// Drop all buffered frames, keeping configuration and track ids.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

fn find_box(boxes: &mut [BoundingBox], box_id: usize) -> Option<&mut BoundingBox> {
    boxes.iter_mut().find(|b| b.box_id == box_id)
}

/// Compute both TTC estimates for one matched box pair.
fn process_pair<R: TtcReporter>(
    config: &TtcConfig,
    reporter: &mut R,
    frame_index: usize,
    pair: &BoxPair,
    prev: &mut DataFrame,
    curr: &mut DataFrame,
) -> Result<Option<ObjectTtc>> {
    let Some(prev_box) = find_box(&mut prev.bounding_boxes, pair.prev_box_id) else {
        return Ok(None);
    };
    let Some(curr_box) = find_box(&mut curr.bounding_boxes, pair.curr_box_id) else {
        return Ok(None);
    };

    if curr_box.track_id.is_none() {
        curr_box.track_id = prev_box.track_id;
    }

    let lidar = if !prev_box.range_points.is_empty() && !curr_box.range_points.is_empty() {
        let result = estimate_lidar_ttc(
            &mut prev_box.range_points,
            &mut curr_box.range_points,
            config.frame_rate,
            config.lidar_trim_fraction,
        );
        reporter.on_lidar_ttc(frame_index, curr_box.box_id, &result);
        Some(result)
    } else {
        None
    };

    curr_box.kpt_matches.clear();
    let cluster = cluster_kpt_matches_with_roi(
        curr_box,
        &prev.keypoints,
        &curr.keypoints,
        &curr.kpt_matches,
        config.outlier_displacement_factor,
    )?;
    reporter.on_cluster(frame_index, curr_box.box_id, &cluster);

    let camera = if curr_box.kpt_matches.is_empty() {
        None
    } else {
        let result = estimate_camera_ttc(
            &prev.keypoints,
            &curr.keypoints,
            &curr_box.kpt_matches,
            config.frame_rate,
            config.min_distance_threshold,
        )?;
        reporter.on_camera_ttc(frame_index, curr_box.box_id, &result);
        Some(result)
    };

    Ok(Some(ObjectTtc {
        track_id: curr_box.track_id,
        prev_box_id: pair.prev_box_id,
        curr_box_id: pair.curr_box_id,
        votes: pair.votes,
        ttc_lidar: lidar.and_then(|r| valid_ttc(r.ttc)),
        ttc_camera: camera.and_then(|r| valid_ttc(r.ttc)),
        lidar,
        camera,
    }))
}
