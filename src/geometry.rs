//! Camera calibration, range-point projection and image regions.

use nalgebra::{Matrix3x4, Matrix4, Point2, Vector4};
use serde::{Deserialize, Serialize};

use crate::frame::RangePoint;
use crate::{Error, Result};

/// Fixed calibration linking the range sensor to the camera image.
///
/// Points are mapped as `intrinsic * rectification * extrinsic * [x, y, z, 1]^T`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Rectified camera projection (3x4).
    pub intrinsic: Matrix3x4<f64>,
    /// Rectifying rotation, padded to 4x4.
    pub rectification: Matrix4<f64>,
    /// Range sensor to camera rigid transform (4x4).
    pub extrinsic: Matrix4<f64>,
}

impl Calibration {
    /// Create a calibration from its three matrices.
    pub fn new(intrinsic: Matrix3x4<f64>, rectification: Matrix4<f64>, extrinsic: Matrix4<f64>) -> Self {
        Self {
            intrinsic,
            rectification,
            extrinsic,
        }
    }

    /// Create a calibration from row-major slices.
    ///
    /// # Arguments
    /// * `intrinsic` - 12 values (3x4)
    /// * `rectification` - 16 values (4x4)
    /// * `extrinsic` - 16 values (4x4)
    pub fn from_row_slices(intrinsic: &[f64], rectification: &[f64], extrinsic: &[f64]) -> Result<Self> {
        check_len("intrinsic", intrinsic, 12)?;
        check_len("rectification", rectification, 16)?;
        check_len("extrinsic", extrinsic, 16)?;

        Ok(Self::new(
            Matrix3x4::from_row_slice(intrinsic),
            Matrix4::from_row_slice(rectification),
            Matrix4::from_row_slice(extrinsic),
        ))
    }

    /// KITTI raw-data calibration
    /// (Velodyne to left grey camera, `R_rect_00`, `P_rect_00`).
    pub fn kitti() -> Self {
        let extrinsic = Matrix4::new(
            7.533745e-03, -9.999714e-01, -6.166020e-04, -4.069766e-03,
            1.480249e-02, 7.280733e-04, -9.998902e-01, -7.631618e-02,
            9.998621e-01, 7.523790e-03, 1.480755e-02, -2.717806e-01,
            0.0, 0.0, 0.0, 1.0,
        );
        let rectification = Matrix4::new(
            9.999239e-01, 9.837760e-03, -7.445048e-03, 0.0,
            -9.869795e-03, 9.999421e-01, -4.278459e-03, 0.0,
            7.402527e-03, 4.351614e-03, 9.999631e-01, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        let intrinsic = Matrix3x4::new(
            7.215377e+02, 0.0, 6.095593e+02, 0.0,
            0.0, 7.215377e+02, 1.728540e+02, 0.0,
            0.0, 0.0, 1.0, 0.0,
        );
        Self::new(intrinsic, rectification, extrinsic)
    }

    /// Combined 3x4 transform `intrinsic * rectification * extrinsic`.
    pub fn projection_matrix(&self) -> Matrix3x4<f64> {
        self.intrinsic * self.rectification * self.extrinsic
    }
}

fn check_len(name: &str, values: &[f64], expected: usize) -> Result<()> {
    if values.len() != expected {
        return Err(Error::InvalidCalibration(format!(
            "{} expects {} values, got {}",
            name,
            expected,
            values.len()
        )));
    }
    Ok(())
}

/// Projects range points into image pixel coordinates.
#[derive(Debug, Clone)]
pub struct Projector {
    projection: Matrix3x4<f64>,
}

impl Projector {
    pub fn new(calibration: &Calibration) -> Self {
        Self {
            projection: calibration.projection_matrix(),
        }
    }

    /// Project a 3D position to pixel coordinates `(u, v)`.
    ///
    /// Points at or behind the camera plane are not rejected; the perspective
    /// divide is applied as is.
    pub fn project_xyz(&self, x: f64, y: f64, z: f64) -> Point2<f64> {
        let y_h = self.projection * Vector4::new(x, y, z, 1.0);
        Point2::new(y_h[0] / y_h[2], y_h[1] / y_h[2])
    }

    pub fn project(&self, point: &RangePoint) -> Point2<f64> {
        self.project_xyz(point.x, point.y, point.z)
    }
}

/// Axis-aligned image region in pixels (top-left corner plus size).
///
/// Containment is inclusive on every edge, so a pixel on an edge shared by
/// two touching regions is inside both.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Roi {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Roi {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Build a region from corner coordinates `[x1, y1, x2, y2]`.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(x1.min(x2), y1.min(y2), (x2 - x1).abs(), (y2 - y1).abs())
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point2<f64> {
        Point2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Shrink around the centre: each dimension is scaled by `1 - factor`.
    pub fn shrink(&self, factor: f64) -> Roi {
        Roi {
            x: self.x + factor * self.width / 2.0,
            y: self.y + factor * self.height / 2.0,
            width: self.width * (1.0 - factor),
            height: self.height * (1.0 - factor),
        }
    }

    pub fn contains(&self, pt: &Point2<f64>) -> bool {
        pt.x >= self.x && pt.x <= self.right() && pt.y >= self.y && pt.y <= self.bottom()
    }
}
