//! Range-point cropping and range-point-to-box association.

use serde::{Deserialize, Serialize};

use crate::detection::BoundingBox;
use crate::frame::RangePoint;
use crate::geometry::Projector;

/// Ego-lane crop applied to raw scans before association.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeCrop {
    pub min_x: f64,
    pub max_x: f64,
    /// Maximum absolute lateral offset.
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
    /// Minimum reflectivity.
    pub min_r: f64,
}

impl Default for RangeCrop {
    fn default() -> Self {
        Self {
            min_x: 2.0,
            max_x: 20.0,
            max_y: 2.0,
            min_z: -1.5,
            max_z: -0.9,
            min_r: 0.1,
        }
    }
}

impl RangeCrop {
    /// Whether a point survives the crop. Points above the sensor are always rejected.
    pub fn keeps(&self, p: &RangePoint) -> bool {
        p.x >= self.min_x
            && p.x <= self.max_x
            && p.z >= self.min_z
            && p.z <= self.max_z
            && p.z <= 0.0
            && p.y.abs() <= self.max_y
            && p.r >= self.min_r
    }

    /// Return the points that survive the crop, preserving order.
    pub fn apply(&self, points: &[RangePoint]) -> Vec<RangePoint> {
        points.iter().filter(|p| self.keeps(p)).copied().collect()
    }
}

/// Outcome counts of one association pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssociationStats {
    /// Points added to exactly one box.
    pub assigned: usize,
    /// Points outside every shrunk region.
    pub unmatched: usize,
    /// Points inside two or more shrunk regions.
    pub ambiguous: usize,
}

/// Attach range points to the boxes whose shrunk region contains their projection.
///
/// A point enclosed by zero or several shrunk regions is dropped.
///
/// # Arguments
/// * `boxes` - Boxes of the frame, point sets are appended to
/// * `points` - Range points of the same frame
/// * `shrink_factor` - Fraction in [0, 1) by which each box dimension is reduced
/// * `projector` - Calibrated projection into the image
pub fn cluster_range_points_with_roi(
    boxes: &mut [BoundingBox],
    points: &[RangePoint],
    shrink_factor: f64,
    projector: &Projector,
) -> AssociationStats {
    let shrunk: Vec<_> = boxes.iter().map(|b| b.roi.shrink(shrink_factor)).collect();
    let mut stats = AssociationStats::default();
    let mut enclosing = Vec::with_capacity(2);

    for point in points {
        let px = projector.project(point);

        enclosing.clear();
        for (idx, roi) in shrunk.iter().enumerate() {
            if roi.contains(&px) {
                enclosing.push(idx);
            }
        }

        match enclosing.as_slice() {
            [only] => {
                boxes[*only].range_points.push(*point);
                stats.assigned += 1;
            }
            [] => stats.unmatched += 1,
            _ => stats.ambiguous += 1,
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Calibration, Roi};
    use nalgebra::{Matrix3x4, Matrix4};

    /// Projection where pixel (u, v) = (-y, -z) * 100 + (500, 500) regardless of range,
    /// so tests can place points directly in the image.
    fn planar_projector() -> Projector {
        let intrinsic = Matrix3x4::new(
            100.0, 0.0, 500.0, 0.0,
            0.0, 100.0, 500.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
        );
        let extrinsic = Matrix4::new(
            0.0, -1.0, 0.0, 0.0,
            0.0, 0.0, -1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
            0.0, 0.0, 0.0, 1.0,
        );
        Projector::new(&Calibration::new(intrinsic, Matrix4::identity(), extrinsic))
    }

    /// Range point that projects onto pixel (u, v) with the planar projector.
    fn at_pixel(u: f64, v: f64) -> RangePoint {
        RangePoint::new(10.0, -(u - 500.0) / 100.0, -(v - 500.0) / 100.0, 0.5)
    }

    #[test]
    fn test_planar_projector_helper() {
        let projector = planar_projector();
        let px = projector.project(&at_pixel(123.0, 456.0));
        assert!((px.x - 123.0).abs() < 1e-9);
        assert!((px.y - 456.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_box_assignment() {
        let projector = planar_projector();
        let mut boxes = vec![
            BoundingBox::new(0, Roi::new(0.0, 0.0, 100.0, 100.0)),
            BoundingBox::new(1, Roi::new(300.0, 300.0, 100.0, 100.0)),
        ];
        let points = vec![at_pixel(50.0, 50.0), at_pixel(350.0, 320.0), at_pixel(900.0, 900.0)];

        let stats = cluster_range_points_with_roi(&mut boxes, &points, 0.0, &projector);

        assert_eq!(stats, AssociationStats { assigned: 2, unmatched: 1, ambiguous: 0 });
        assert_eq!(boxes[0].range_points, vec![points[0]]);
        assert_eq!(boxes[1].range_points, vec![points[1]]);
    }

    #[test]
    fn test_overlap_is_ambiguous() {
        let projector = planar_projector();
        let mut boxes = vec![
            BoundingBox::new(0, Roi::new(0.0, 0.0, 100.0, 100.0)),
            BoundingBox::new(1, Roi::new(50.0, 0.0, 100.0, 100.0)),
        ];
        let points = vec![at_pixel(75.0, 50.0), at_pixel(25.0, 50.0)];

        let stats = cluster_range_points_with_roi(&mut boxes, &points, 0.0, &projector);

        assert_eq!(stats.ambiguous, 1);
        assert_eq!(boxes[0].range_points, vec![points[1]]);
        assert!(boxes[1].range_points.is_empty());
    }

    #[test]
    fn test_shared_edge_assigned_to_neither() {
        let projector = planar_projector();

        // Touching boxes without shrinking: the edge pixel lies in both
        let mut boxes = vec![
            BoundingBox::new(0, Roi::new(0.0, 0.0, 100.0, 100.0)),
            BoundingBox::new(1, Roi::new(100.0, 0.0, 100.0, 100.0)),
        ];
        let edge = vec![at_pixel(100.0, 50.0)];
        let stats = cluster_range_points_with_roi(&mut boxes, &edge, 0.0, &projector);
        assert_eq!(stats.ambiguous, 1);
        assert!(boxes.iter().all(|b| b.range_points.is_empty()));

        // With shrinking the shrunk boxes are disjoint and the edge lies in the gap
        let stats = cluster_range_points_with_roi(&mut boxes, &edge, 0.1, &projector);
        assert_eq!(stats.unmatched, 1);
        assert!(boxes.iter().all(|b| b.range_points.is_empty()));
    }

    #[test]
    fn test_shrink_drops_border_points() {
        let projector = planar_projector();
        let mut boxes = vec![BoundingBox::new(0, Roi::new(0.0, 0.0, 100.0, 100.0))];
        let points = vec![at_pixel(3.0, 50.0), at_pixel(50.0, 50.0)];

        cluster_range_points_with_roi(&mut boxes, &points, 0.1, &projector);

        assert_eq!(boxes[0].range_points, vec![points[1]]);
    }

    #[test]
    fn test_exclusivity() {
        let projector = planar_projector();
        let mut boxes = vec![
            BoundingBox::new(0, Roi::new(0.0, 0.0, 120.0, 120.0)),
            BoundingBox::new(1, Roi::new(100.0, 100.0, 120.0, 120.0)),
            BoundingBox::new(2, Roi::new(400.0, 0.0, 50.0, 300.0)),
        ];
        let mut points = Vec::new();
        for i in 0..25 {
            for j in 0..25 {
                points.push(at_pixel(i as f64 * 20.0, j as f64 * 20.0));
            }
        }

        let stats = cluster_range_points_with_roi(&mut boxes, &points, 0.05, &projector);

        let total: usize = boxes.iter().map(|b| b.range_points.len()).sum();
        assert_eq!(total, stats.assigned);
        assert_eq!(stats.assigned + stats.unmatched + stats.ambiguous, points.len());
        for p in &points {
            let owners = boxes.iter().filter(|b| b.range_points.contains(p)).count();
            assert!(owners <= 1);
        }
    }

    #[test]
    fn test_crop_defaults() {
        let crop = RangeCrop::default();
        assert!(crop.keeps(&RangePoint::new(8.0, 0.5, -1.2, 0.4)));
        assert!(!crop.keeps(&RangePoint::new(1.0, 0.5, -1.2, 0.4)));
        assert!(!crop.keeps(&RangePoint::new(25.0, 0.5, -1.2, 0.4)));
        assert!(!crop.keeps(&RangePoint::new(8.0, -2.5, -1.2, 0.4)));
        assert!(!crop.keeps(&RangePoint::new(8.0, 0.5, -0.5, 0.4)));
        assert!(!crop.keeps(&RangePoint::new(8.0, 0.5, -1.2, 0.05)));
    }

    #[test]
    fn test_crop_apply_preserves_order() {
        let crop = RangeCrop::default();
        let points = vec![
            RangePoint::new(9.0, 0.0, -1.0, 0.5),
            RangePoint::new(30.0, 0.0, -1.0, 0.5),
            RangePoint::new(7.0, 0.0, -1.0, 0.5),
        ];
        let kept = crop.apply(&points);
        assert_eq!(kept, vec![points[0], points[2]]);
    }
}
