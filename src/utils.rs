//! Small numeric helpers shared by the estimators.

use nalgebra::Point2;

/// Euclidean distance between two pixel positions.
pub fn pixel_distance(a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    (a - b).norm()
}

/// Arithmetic mean of a slice.
///
/// Returns `None` for an empty slice instead of dividing by zero.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median of a slice (mean of the two middle elements for even lengths).
///
/// The input is copied and sorted; NaN values sort last.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Check that a scalar is finite and strictly positive.
pub fn is_positive_finite(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pixel_distance() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(3.0, 4.0);
        assert_relative_eq!(pixel_distance(&a, &b), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mean() {
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0, 6.0]).unwrap(), 3.0, epsilon = 1e-12);
        assert!(mean(&[]).is_none());
    }

    #[test]
    fn test_median_odd() {
        assert_relative_eq!(median(&[5.0, 1.0, 3.0]).unwrap(), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_median_even() {
        let m = median(&[1.02, 1.03, 1.05, 1.04]).unwrap();
        assert_relative_eq!(m, 1.035, epsilon = 1e-12);
    }

    #[test]
    fn test_median_empty() {
        assert!(median(&[]).is_none());
    }

    #[test]
    fn test_is_positive_finite() {
        assert!(is_positive_finite(1.9));
        assert!(!is_positive_finite(0.0));
        assert!(!is_positive_finite(-2.0));
        assert!(!is_positive_finite(f64::INFINITY));
        assert!(!is_positive_finite(f64::NAN));
    }
}
