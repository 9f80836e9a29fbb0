//! Bounding boxes produced by the object detector.

use serde::{Deserialize, Serialize};

use crate::frame::{KeypointMatch, RangePoint};
use crate::geometry::Roi;

/// A detected object in one frame.
///
/// The region and identity come from the detector; `range_points` and
/// `kpt_matches` are filled in by association and clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Unique id of this box within its frame.
    pub box_id: usize,

    /// Id of the tracked object this box belongs to, if known.
    #[serde(default)]
    pub track_id: Option<usize>,

    /// Image region in pixels.
    pub roi: Roi,

    /// Detector class label.
    #[serde(default)]
    pub class_id: i32,

    /// Detector confidence.
    #[serde(default)]
    pub confidence: f64,

    /// Range points whose projection falls into the shrunk region.
    #[serde(default)]
    pub range_points: Vec<RangePoint>,

    /// Keypoint matches whose current keypoint falls into the region.
    #[serde(default)]
    pub kpt_matches: Vec<KeypointMatch>,
}

impl BoundingBox {
    /// Create a box with empty point and match sets.
    pub fn new(box_id: usize, roi: Roi) -> Self {
        Self {
            box_id,
            track_id: None,
            roi,
            class_id: 0,
            confidence: 0.0,
            range_points: Vec::new(),
            kpt_matches: Vec::new(),
        }
    }

    /// Create a box with detector metadata.
    pub fn with_detection(box_id: usize, roi: Roi, class_id: i32, confidence: f64) -> Self {
        Self {
            class_id,
            confidence,
            ..Self::new(box_id, roi)
        }
    }

    /// Forget all associated range points and matches.
    pub fn clear(&mut self) {
        self.range_points.clear();
        self.kpt_matches.clear();
    }

    /// Summarise the associated range points as seen from above.
    pub fn summary(&self) -> Option<PointCloudSummary> {
        PointCloudSummary::from_points(&self.range_points)
    }
}

/// Top-down extent of the range points attached to one box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointCloudSummary {
    pub num_points: usize,
    /// Closest forward distance in metres.
    pub x_min: f64,
    /// Lateral extent `y_max - y_min` in metres.
    pub y_width: f64,
}

impl PointCloudSummary {
    pub fn from_points(points: &[RangePoint]) -> Option<Self> {
        let first = points.first()?;

        let mut x_min = first.x;
        let mut y_min = first.y;
        let mut y_max = first.y;
        for p in points {
            x_min = x_min.min(p.x);
            y_min = y_min.min(p.y);
            y_max = y_max.max(p.y);
        }

        Some(Self {
            num_points: points.len(),
            x_min,
            y_width: y_max - y_min,
        })
    }
}
