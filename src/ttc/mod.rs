//! Time-to-collision estimators.
//!
//! Both estimators assume a constant relative velocity between two frames:
//!
//! - `camera` - median scale change of keypoint pairs inside the object's box
//! - `lidar` - change of the trimmed mean forward distance of the object's points
//!
//! Neither estimator interprets its result. Use [`valid_ttc`] to turn a raw
//! value into "estimate or nothing".

mod camera;
mod lidar;

pub use camera::{
    compute_ttc_camera, distance_ratios, estimate_camera_ttc, ttc_from_distance_ratios, CameraTtc,
    DEFAULT_MIN_DISTANCE,
};
pub use lidar::{compute_ttc_lidar, estimate_lidar_ttc, trim_by_mean_x, LidarTtc, DEFAULT_TRIM_FRACTION};

use crate::utils::is_positive_finite;

/// Keep a TTC only if it is finite and positive.
pub fn valid_ttc(ttc: f64) -> Option<f64> {
    is_positive_finite(ttc).then_some(ttc)
}
