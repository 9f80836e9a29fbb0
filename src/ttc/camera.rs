//! Camera TTC from the scale change of keypoint constellations.

use crate::frame::{Keypoint, KeypointMatch};
use crate::utils::{median, pixel_distance};
use crate::Result;

/// Default minimum current-frame keypoint separation in pixels.
pub const DEFAULT_MIN_DISTANCE: f64 = 90.0;

/// Result of the camera estimator with its intermediate values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTtc {
    /// Time to collision in seconds, `NaN` if no distance ratio qualified.
    pub ttc: f64,
    pub median_ratio: Option<f64>,
    pub num_ratios: usize,
}

/// Distance ratios `dist_curr / dist_prev` over all unordered pairs of matches.
///
/// A pair contributes only if its previous separation exceeds machine epsilon
/// and its current separation is at least `min_distance`.
pub fn distance_ratios(
    kpts_prev: &[Keypoint],
    kpts_curr: &[Keypoint],
    matches: &[KeypointMatch],
    min_distance: f64,
) -> Result<Vec<f64>> {
    let resolved = matches
        .iter()
        .map(|m| m.resolve(kpts_prev, kpts_curr))
        .collect::<Result<Vec<_>>>()?;

    let mut ratios = Vec::new();
    for (i, (outer_prev, outer_curr)) in resolved.iter().enumerate() {
        for (inner_prev, inner_curr) in &resolved[i + 1..] {
            let dist_curr = pixel_distance(&outer_curr.pt, &inner_curr.pt);
            let dist_prev = pixel_distance(&outer_prev.pt, &inner_prev.pt);

            if dist_prev > f64::EPSILON && dist_curr >= min_distance {
                ratios.push(dist_curr / dist_prev);
            }
        }
    }

    Ok(ratios)
}

/// TTC from a set of distance ratios using their median.
///
/// `TTC = -dT / (1 - median)` with `dT = 1 / frame_rate`; `NaN` for no ratios.
pub fn ttc_from_distance_ratios(ratios: &[f64], frame_rate: f64) -> CameraTtc {
    match median(ratios) {
        Some(med) => {
            let dt = 1.0 / frame_rate;
            CameraTtc {
                ttc: -dt / (1.0 - med),
                median_ratio: Some(med),
                num_ratios: ratios.len(),
            }
        }
        None => CameraTtc {
            ttc: f64::NAN,
            median_ratio: None,
            num_ratios: 0,
        },
    }
}

/// Estimate TTC from the matches of one object.
///
/// # Arguments
/// * `kpts_prev` - Previous-frame keypoints
/// * `kpts_curr` - Current-frame keypoints
/// * `matches` - Matches clustered into the object's box
/// * `frame_rate` - Camera frame rate in Hz
/// * `min_distance` - Minimum current keypoint separation in pixels
pub fn estimate_camera_ttc(
    kpts_prev: &[Keypoint],
    kpts_curr: &[Keypoint],
    matches: &[KeypointMatch],
    frame_rate: f64,
    min_distance: f64,
) -> Result<CameraTtc> {
    let ratios = distance_ratios(kpts_prev, kpts_curr, matches, min_distance)?;
    Ok(ttc_from_distance_ratios(&ratios, frame_rate))
}

/// Camera TTC in seconds with the default minimum separation.
pub fn compute_ttc_camera(
    kpts_prev: &[Keypoint],
    kpts_curr: &[Keypoint],
    matches: &[KeypointMatch],
    frame_rate: f64,
) -> Result<f64> {
    estimate_camera_ttc(kpts_prev, kpts_curr, matches, frame_rate, DEFAULT_MIN_DISTANCE).map(|r| r.ttc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::mean;
    use approx::assert_relative_eq;

    /// Keypoints on a ring around (600, 200), scaled by `scale` in the current frame.
    fn expanding_ring(n: usize, radius: f64, scale: f64) -> (Vec<Keypoint>, Vec<Keypoint>, Vec<KeypointMatch>) {
        let mut prev = Vec::new();
        let mut curr = Vec::new();
        for k in 0..n {
            let a = k as f64 * std::f64::consts::TAU / n as f64;
            let (dx, dy) = (radius * a.cos(), radius * a.sin());
            prev.push(Keypoint::new(600.0 + dx, 200.0 + dy));
            curr.push(Keypoint::new(600.0 + scale * dx, 200.0 + scale * dy));
        }
        let matches = (0..n).map(|i| KeypointMatch::new(i, i)).collect();
        (prev, curr, matches)
    }

    #[test]
    fn test_scenario_even_median() {
        let result = ttc_from_distance_ratios(&[1.02, 1.03, 1.05, 1.04], 10.0);
        assert_relative_eq!(result.median_ratio.unwrap(), 1.035, epsilon = 1e-12);
        assert_relative_eq!(result.ttc, 2.857142857, epsilon = 1e-6);
        assert_eq!(result.num_ratios, 4);
    }

    #[test]
    fn test_no_ratios_is_nan() {
        let result = ttc_from_distance_ratios(&[], 10.0);
        assert!(result.ttc.is_nan());
        assert!(result.median_ratio.is_none());
    }

    #[test]
    fn test_uniform_expansion() {
        let (prev, curr, matches) = expanding_ring(12, 100.0, 1.02);
        let ttc = compute_ttc_camera(&prev, &curr, &matches, 10.0).unwrap();

        // Every qualifying pair has ratio 1.02: TTC = 0.1 / 0.02
        assert_relative_eq!(ttc, 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_min_distance_filters_close_pairs() {
        let prev = vec![Keypoint::new(0.0, 0.0), Keypoint::new(50.0, 0.0), Keypoint::new(200.0, 0.0)];
        let curr = vec![Keypoint::new(0.0, 0.0), Keypoint::new(55.0, 0.0), Keypoint::new(220.0, 0.0)];
        let matches: Vec<_> = (0..3).map(|i| KeypointMatch::new(i, i)).collect();

        let ratios = distance_ratios(&prev, &curr, &matches, 90.0).unwrap();

        // (0,1) has current separation 55 < 90 and is skipped
        assert_eq!(ratios.len(), 2);
        assert_relative_eq!(ratios[0], 1.1, epsilon = 1e-12);
        assert_relative_eq!(ratios[1], 165.0 / 150.0, epsilon = 1e-12);
    }

    #[test]
    fn test_coincident_previous_keypoints_skipped() {
        let prev = vec![Keypoint::new(10.0, 10.0), Keypoint::new(10.0, 10.0)];
        let curr = vec![Keypoint::new(0.0, 0.0), Keypoint::new(200.0, 0.0)];
        let matches = vec![KeypointMatch::new(0, 0), KeypointMatch::new(1, 1)];

        let ttc = compute_ttc_camera(&prev, &curr, &matches, 10.0).unwrap();
        assert!(ttc.is_nan());
    }

    #[test]
    fn test_pairs_are_unordered_and_distinct() {
        let (prev, curr, matches) = expanding_ring(6, 200.0, 1.01);
        let ratios = distance_ratios(&prev, &curr, &matches, 0.0).unwrap();
        assert_eq!(ratios.len(), 6 * 5 / 2);
    }

    #[test]
    fn test_median_robust_to_outlier() {
        let mut ratios = vec![1.010, 1.011, 1.009, 1.010, 1.012, 1.008, 1.010];
        let clean = ttc_from_distance_ratios(&ratios, 10.0).ttc;

        ratios.push(3.0);
        let with_outlier = ttc_from_distance_ratios(&ratios, 10.0).ttc;

        let mean_clean = -0.1 / (1.0 - mean(&ratios[..7]).unwrap());
        let mean_with_outlier = -0.1 / (1.0 - mean(&ratios).unwrap());

        assert!((with_outlier - clean).abs() < 0.5, "median ttc moved {} -> {}", clean, with_outlier);
        assert!((mean_with_outlier - mean_clean).abs() > 5.0);
    }

    #[test]
    fn test_bad_index_propagates() {
        let prev = vec![Keypoint::new(0.0, 0.0)];
        let curr = vec![Keypoint::new(0.0, 0.0)];
        assert!(compute_ttc_camera(&prev, &curr, &[KeypointMatch::new(0, 1)], 10.0).is_err());
    }
}
