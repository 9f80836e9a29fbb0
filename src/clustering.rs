//! Assignment of keypoint matches to a bounding box with displacement outlier rejection.

use crate::detection::BoundingBox;
use crate::frame::{Keypoint, KeypointMatch};
use crate::utils::{mean, pixel_distance};
use crate::Result;

/// Default outlier threshold as a multiple of the mean match displacement.
pub const DEFAULT_OUTLIER_DISPLACEMENT_FACTOR: f64 = 2.0;

/// Counts from one clustering pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClusterStats {
    /// Matches whose current keypoint fell inside the box.
    pub enclosed: usize,
    /// Matches removed as displacement outliers.
    pub rejected: usize,
    /// Mean displacement used as reference, `None` for an empty match set.
    pub mean_displacement: Option<f64>,
}

impl ClusterStats {
    pub fn kept(&self) -> usize {
        self.enclosed - self.rejected
    }
}

/// Attach the matches whose current keypoint lies in the box region and drop
/// matches whose displacement is at least `outlier_factor` times the mean.
///
/// The mean is computed once over the enclosed matches. If no match falls into
/// the box, the box is left without matches.
///
/// # Arguments
/// * `bbox` - Current-frame box; its `kpt_matches` are appended to
/// * `kpts_prev` - Previous-frame keypoints
/// * `kpts_curr` - Current-frame keypoints
/// * `matches` - All matches between the two frames
/// * `outlier_factor` - Displacement multiple at which a match is rejected
pub fn cluster_kpt_matches_with_roi(
    bbox: &mut BoundingBox,
    kpts_prev: &[Keypoint],
    kpts_curr: &[Keypoint],
    matches: &[KeypointMatch],
    outlier_factor: f64,
) -> Result<ClusterStats> {
    let mut enclosed = Vec::new();
    let mut displacements = Vec::new();
    for m in matches {
        let (prev, curr) = m.resolve(kpts_prev, kpts_curr)?;
        if bbox.roi.contains(&curr.pt) {
            enclosed.push(*m);
            displacements.push(pixel_distance(&curr.pt, &prev.pt));
        }
    }

    let mut stats = ClusterStats {
        enclosed: enclosed.len(),
        ..ClusterStats::default()
    };

    let Some(mean_displacement) = mean(&displacements) else {
        return Ok(stats);
    };
    stats.mean_displacement = Some(mean_displacement);

    let threshold = mean_displacement * outlier_factor;
    for (m, d) in enclosed.into_iter().zip(displacements) {
        if d >= threshold {
            stats.rejected += 1;
        } else {
            bbox.kpt_matches.push(m);
        }
    }

    Ok(stats)
}
