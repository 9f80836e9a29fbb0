//! LiDAR TTC from the change of the trimmed mean forward distance.

use crate::frame::RangePoint;

/// Default trim band as a fraction of the mean forward distance.
pub const DEFAULT_TRIM_FRACTION: f64 = 0.03;

/// Result of the LiDAR estimator with its intermediate values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LidarTtc {
    /// Time to collision in seconds. Not interpreted: may be infinite,
    /// negative, or `NaN` when a point set is empty.
    pub ttc: f64,
    pub mean_x_prev: f64,
    pub mean_x_curr: f64,
    /// Points removed from the previous and current sets.
    pub trimmed: (usize, usize),
}

fn mean_x(points: &[RangePoint]) -> Option<f64> {
    if points.is_empty() {
        return None;
    }
    Some(points.iter().map(|p| p.x).sum::<f64>() / points.len() as f64)
}

/// Remove points whose forward distance deviates from the mean by at least
/// `fraction * mean`. Returns the number of removed points.
///
/// The mean is computed once before filtering.
pub fn trim_by_mean_x(points: &mut Vec<RangePoint>, fraction: f64) -> usize {
    let Some(mean) = mean_x(points) else {
        return 0;
    };
    let band = fraction * mean;
    let before = points.len();
    let kept: Vec<RangePoint> = points
        .iter()
        .filter(|p| (mean - p.x).abs() < band)
        .copied()
        .collect();
    *points = kept;
    before - points.len()
}

/// Estimate TTC from two range point sets of the same object.
///
/// Both sets are trimmed in place before the means are compared:
/// `TTC = mean_curr * dT / (mean_prev - mean_curr)` with `dT = 1 / frame_rate`.
///
/// # Arguments
/// * `prev_points` - Points of the object in the previous frame
/// * `curr_points` - Points of the object in the current frame
/// * `frame_rate` - Sensor frame rate in Hz
/// * `trim_fraction` - Trim band as a fraction of the mean
pub fn estimate_lidar_ttc(
    prev_points: &mut Vec<RangePoint>,
    curr_points: &mut Vec<RangePoint>,
    frame_rate: f64,
    trim_fraction: f64,
) -> LidarTtc {
    let trimmed = (
        trim_by_mean_x(prev_points, trim_fraction),
        trim_by_mean_x(curr_points, trim_fraction),
    );

    match (mean_x(prev_points), mean_x(curr_points)) {
        (Some(mean_x_prev), Some(mean_x_curr)) => {
            let dt = 1.0 / frame_rate;
            LidarTtc {
                ttc: mean_x_curr * dt / (mean_x_prev - mean_x_curr),
                mean_x_prev,
                mean_x_curr,
                trimmed,
            }
        }
        (prev, curr) => LidarTtc {
            ttc: f64::NAN,
            mean_x_prev: prev.unwrap_or(f64::NAN),
            mean_x_curr: curr.unwrap_or(f64::NAN),
            trimmed,
        },
    }
}

/// LiDAR TTC in seconds with the default trim fraction.
pub fn compute_ttc_lidar(prev_points: &mut Vec<RangePoint>, curr_points: &mut Vec<RangePoint>, frame_rate: f64) -> f64 {
    estimate_lidar_ttc(prev_points, curr_points, frame_rate, DEFAULT_TRIM_FRACTION).ttc
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn at_x(xs: &[f64]) -> Vec<RangePoint> {
        xs.iter().map(|&x| RangePoint::new(x, 0.0, -1.0, 0.5)).collect()
    }

    #[test]
    fn test_scenario_mean_range() {
        let mut prev = at_x(&[9.9, 10.0, 10.1]);
        let mut curr = at_x(&[9.4, 9.5, 9.6]);

        let ttc = compute_ttc_lidar(&mut prev, &mut curr, 10.0);

        assert_relative_eq!(ttc, 1.9, epsilon = 1e-9);
        assert_eq!(prev.len(), 3);
        assert_eq!(curr.len(), 3);
    }

    #[test]
    fn test_outliers_trimmed_before_estimate() {
        // 12.0 and 11.5 are far outside 3% of the mean
        let mut prev = at_x(&[9.95, 9.95, 9.95, 10.0, 10.0, 10.0, 10.05, 10.05, 10.05, 12.0]);
        let mut curr = at_x(&[9.45, 9.45, 9.45, 9.5, 9.5, 9.5, 9.55, 9.55, 9.55, 11.5]);

        let result = estimate_lidar_ttc(&mut prev, &mut curr, 10.0, 0.03);

        assert_eq!(result.trimmed, (1, 1));
        assert_relative_eq!(result.mean_x_prev, 10.0, epsilon = 1e-9);
        assert_relative_eq!(result.mean_x_curr, 9.5, epsilon = 1e-9);
        assert_relative_eq!(result.ttc, 1.9, epsilon = 1e-9);
    }

    #[test]
    fn test_trim_is_idempotent_on_settled_set() {
        let mut points = at_x(&[9.95, 9.95, 9.95, 10.0, 10.0, 10.0, 10.05, 10.05, 10.05, 12.0]);

        assert_eq!(trim_by_mean_x(&mut points, 0.03), 1);
        let settled = points.clone();

        assert_eq!(trim_by_mean_x(&mut points, 0.03), 0);
        assert_eq!(points, settled);
    }

    #[test]
    fn test_trim_removes_points_outside_band() {
        // mean 10, band 0.3: deviations of 0.5 are removed, 0.25 kept
        let mut points = at_x(&[9.5, 10.5, 9.75, 10.25]);
        assert_eq!(trim_by_mean_x(&mut points, 0.03), 2);
        assert_eq!(points, at_x(&[9.75, 10.25]));
    }

    #[test]
    fn test_receding_object_negative_ttc() {
        let mut prev = at_x(&[10.0]);
        let mut curr = at_x(&[10.5]);
        assert!(compute_ttc_lidar(&mut prev, &mut curr, 10.0) < 0.0);
    }

    #[test]
    fn test_static_object_infinite_ttc() {
        let mut prev = at_x(&[10.0]);
        let mut curr = at_x(&[10.0]);
        assert!(compute_ttc_lidar(&mut prev, &mut curr, 10.0).is_infinite());
    }

    #[test]
    fn test_empty_set_is_nan() {
        let mut prev = Vec::new();
        let mut curr = at_x(&[9.5]);
        let result = estimate_lidar_ttc(&mut prev, &mut curr, 10.0, 0.03);
        assert!(result.ttc.is_nan());
        assert!(result.mean_x_prev.is_nan());
        assert_relative_eq!(result.mean_x_curr, 9.5, epsilon = 1e-12);
    }
}
