//! 2D affine transform applied to every scanner coordinate.
//!
//! The transform is a 2×2 linear map followed by a translation, using the
//! column-vector convention:
//!
//! ```text
//! x' = m11 * x + m12 * y + offset_x
//! y' = m21 * x + m22 * y + offset_y
//! ```

use serde::{Deserialize, Serialize};

use crate::types::Point2D;

/// Rotation/scale matrix plus translation.
///
/// # Examples
///
/// ```
/// use lasercard_core::CoordinateTransform;
///
/// let mut transform = CoordinateTransform::identity();
/// transform.set_translational(5.0, -2.0);
/// assert_eq!(transform.apply_transform(1.0, 1.0), (6.0, -1.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateTransform {
    m11: f64,
    m12: f64,
    m21: f64,
    m22: f64,
    offset_x: f64,
    offset_y: f64,
}

impl CoordinateTransform {
    /// Identity matrix with zero offset.
    pub const fn identity() -> Self {
        Self {
            m11: 1.0,
            m12: 0.0,
            m21: 0.0,
            m22: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    pub fn set_rotational(&mut self, m11: f64, m12: f64, m21: f64, m22: f64) {
        self.m11 = m11;
        self.m12 = m12;
        self.m21 = m21;
        self.m22 = m22;
    }

    /// Returns `(m11, m12, m21, m22)`.
    pub fn get_rotational(&self) -> (f64, f64, f64, f64) {
        (self.m11, self.m12, self.m21, self.m22)
    }

    pub fn set_translational(&mut self, offset_x: f64, offset_y: f64) {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
    }

    /// Returns `(offset_x, offset_y)`.
    pub fn get_translational(&self) -> (f64, f64) {
        (self.offset_x, self.offset_y)
    }

    /// Set the matrix to a pure rotation by `angle_degrees` counter-clockwise.
    pub fn set_rotation_degrees(&mut self, angle_degrees: f64) {
        let (sin, cos) = angle_degrees.to_radians().sin_cos();
        self.set_rotational(cos, -sin, sin, cos);
    }

    pub fn apply_transform(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.m11 * x + self.m12 * y + self.offset_x,
            self.m21 * x + self.m22 * y + self.offset_y,
        )
    }

    pub fn apply(&self, point: Point2D) -> Point2D {
        let (x, y) = self.apply_transform(point.x, point.y);
        Point2D::new(x, y)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

impl Default for CoordinateTransform {
    fn default() -> Self {
        Self::identity()
    }
}
