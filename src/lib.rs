//! # ttc-fusion-rs - Camera/LiDAR time-to-collision estimation
//!
//! Estimates the time to collision with objects ahead of the ego vehicle from a
//! pair of consecutive frames, combining detector bounding boxes, keypoint
//! matches and LiDAR scans.
//!
//! ## Features
//!
//! - Projection of LiDAR points into the image and association with boxes
//! - Cross-frame bounding-box matching by keypoint-match voting
//! - Keypoint-match clustering with displacement outlier rejection
//! - Camera TTC from the median keypoint distance ratio
//! - LiDAR TTC from the trimmed mean forward distance
//! - A frame pipeline with pluggable reporting
//!
//! ## Example
//!
//! ```rust,ignore
//! use ttc_fusion_rs::{Calibration, DataFrame, TtcConfig, TtcPipeline};
//!
//! let mut pipeline = TtcPipeline::new(TtcConfig::new(10.0), &Calibration::kitti()).unwrap();
//!
//! for frame in frames {
//!     let result = pipeline.push_frame(frame)?;
//!     for object in &result.objects {
//!         println!("{:?}: lidar {:?} camera {:?}", object.track_id, object.ttc_lidar, object.ttc_camera);
//!     }
//! }
//! ```

pub mod association;
pub mod clustering;
pub mod detection;
pub mod frame;
pub mod geometry;
pub mod matching;
pub mod pipeline;
pub mod reporter;
pub mod ttc;
pub mod utils;

// Re-exports for convenience
pub use association::{cluster_range_points_with_roi, AssociationStats, RangeCrop};
pub use clustering::{cluster_kpt_matches_with_roi, ClusterStats};
pub use detection::{BoundingBox, PointCloudSummary};
pub use frame::{DataFrame, Keypoint, KeypointMatch, RangePoint};
pub use geometry::{Calibration, Projector, Roi};
pub use matching::{match_bounding_boxes, BoxCorrespondence, BoxPair};
pub use pipeline::{FrameResult, ObjectTtc, TtcConfig, TtcPipeline};
pub use reporter::{CollectingReporter, LogReporter, NoOpReporter, TtcReporter};
pub use ttc::{compute_ttc_camera, compute_ttc_lidar};

// Error types
pub use crate::error::{Error, Result};

mod error {
    use thiserror::Error;

    /// Errors that can occur while estimating time to collision
    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Invalid calibration: {0}")]
        InvalidCalibration(String),

        #[error("Keypoint index {index} out of range for {len} keypoints")]
        KeypointIndexOutOfRange { index: usize, len: usize },
    }

    /// Result type for ttc-fusion operations
    pub type Result<T> = std::result::Result<T, Error>;
}
