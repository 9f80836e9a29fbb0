//! Per-frame sensor data: range points, keypoints, keypoint matches.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::detection::BoundingBox;
use crate::{Error, Result};

/// A single LiDAR return in the sensor frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RangePoint {
    /// Forward distance in metres.
    pub x: f64,
    /// Lateral offset in metres (positive to the left).
    pub y: f64,
    /// Height in metres (positive up).
    pub z: f64,
    /// Reflectivity, normalised to [0, 1].
    pub r: f64,
}

impl RangePoint {
    pub fn new(x: f64, y: f64, z: f64, r: f64) -> Self {
        Self { x, y, z, r }
    }
}

/// A 2D image feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// Pixel position.
    pub pt: Point2<f64>,
    /// Diameter of the meaningful neighbourhood.
    pub size: f64,
    /// Orientation in degrees, or -1 if not applicable.
    pub angle: f64,
    pub response: f64,
    pub octave: i32,
}

impl Keypoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            pt: Point2::new(x, y),
            size: 1.0,
            angle: -1.0,
            response: 0.0,
            octave: 0,
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }
}

/// Correspondence between a previous-frame keypoint (`query_idx`)
/// and a current-frame keypoint (`train_idx`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeypointMatch {
    pub query_idx: usize,
    pub train_idx: usize,
    /// Descriptor distance reported by the matcher.
    #[serde(default)]
    pub distance: f64,
}

impl KeypointMatch {
    pub fn new(query_idx: usize, train_idx: usize) -> Self {
        Self {
            query_idx,
            train_idx,
            distance: 0.0,
        }
    }

    /// Resolve both keypoints of this match.
    ///
    /// # Arguments
    /// * `kpts_prev` - Keypoints of the previous frame (indexed by `query_idx`)
    /// * `kpts_curr` - Keypoints of the current frame (indexed by `train_idx`)
    pub fn resolve<'a>(
        &self,
        kpts_prev: &'a [Keypoint],
        kpts_curr: &'a [Keypoint],
    ) -> Result<(&'a Keypoint, &'a Keypoint)> {
        let prev = kpts_prev.get(self.query_idx).ok_or(Error::KeypointIndexOutOfRange {
            index: self.query_idx,
            len: kpts_prev.len(),
        })?;
        let curr = kpts_curr.get(self.train_idx).ok_or(Error::KeypointIndexOutOfRange {
            index: self.train_idx,
            len: kpts_curr.len(),
        })?;
        Ok((prev, curr))
    }
}

/// Everything known about one camera/LiDAR frame.
#[derive(Debug, Clone, Default)]
pub struct DataFrame {
    pub keypoints: Vec<Keypoint>,
    pub bounding_boxes: Vec<BoundingBox>,
    pub range_points: Vec<RangePoint>,
    /// Matches from the previous frame's keypoints to this frame's keypoints.
    pub kpt_matches: Vec<KeypointMatch>,
}

impl DataFrame {
    pub fn new(keypoints: Vec<Keypoint>, bounding_boxes: Vec<BoundingBox>, range_points: Vec<RangePoint>) -> Self {
        Self {
            keypoints,
            bounding_boxes,
            range_points,
            kpt_matches: Vec::new(),
        }
    }

    pub fn with_matches(mut self, kpt_matches: Vec<KeypointMatch>) -> Self {
        self.kpt_matches = kpt_matches;
        self
    }

    /// Find a bounding box by its detector id.
    pub fn box_by_id(&self, box_id: usize) -> Option<&BoundingBox> {
        self.bounding_boxes.iter().find(|b| b.box_id == box_id)
    }

    pub fn box_by_id_mut(&mut self, box_id: usize) -> Option<&mut BoundingBox> {
        self.bounding_boxes.iter_mut().find(|b| b.box_id == box_id)
    }
}
