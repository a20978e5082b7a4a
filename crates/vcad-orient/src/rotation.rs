//! Rotation encoding of a chosen build direction.

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::{Point3, Vec3};

/// Componentwise tolerance for recognising the two axis-aligned special cases.
const VECTOR_TOL: f64 = 0.001;

/// Decimals kept in the encoded axis, angle and matrix.
const ROUND_DECIMALS: i32 = 6;

/// Rotation that brings a mesh into its print orientation.
///
/// `matrix` maps world up `(0, 0, 1)` onto the chosen alignment; mesh
/// coordinates are rotated into print orientation with its transpose (see
/// [`Rotation::apply`]), which is the same as multiplying row vectors by
/// `matrix`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    /// Unit rotation axis.
    pub axis: Vec3,
    /// Rotation angle in radians.
    pub angle: f64,
    /// Equivalent 3x3 rotation matrix.
    pub matrix: Matrix3<f64>,
}

impl Rotation {
    /// Identity rotation.
    pub fn identity() -> Self {
        Self::from_axis_angle(Vec3::x(), 0.0)
    }

    /// Encode the rotation for a unit alignment (the up vector after rotation,
    /// i.e. the negated down direction).
    pub fn from_alignment(alignment: &Vec3) -> Self {
        if all_close(alignment, &-Vec3::z()) {
            return Self::from_axis_angle(Vec3::x(), std::f64::consts::PI);
        }
        if all_close(alignment, &Vec3::z()) {
            return Self::identity();
        }

        let angle = round(std::f64::consts::PI - (-alignment.z).clamp(-1.0, 1.0).acos());
        let axis = Vec3::new(-alignment.y, alignment.x, 0.0).normalize().map(round);
        Self::from_axis_angle(axis, angle)
    }

    /// Rotation about `axis` by `angle` radians (Rodrigues' formula).
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (axis.x, axis.y, axis.z);
        let matrix = Matrix3::new(
            t * x * x + c,
            t * x * y - s * z,
            t * x * z + s * y,
            t * x * y + s * z,
            t * y * y + c,
            t * y * z - s * x,
            t * x * z - s * y,
            t * y * z + s * x,
            t * z * z + c,
        )
        .map(round);
        Self {
            axis,
            angle,
            matrix,
        }
    }

    /// Whether this is (numerically) no rotation at all.
    pub fn is_identity(&self) -> bool {
        self.angle.abs() < 1e-12
    }

    /// Rotate a mesh point into print orientation.
    pub fn apply(&self, p: &Point3) -> Point3 {
        Point3::from(self.matrix.tr_mul(&p.coords))
    }

    /// Rotate a direction vector into print orientation.
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        self.matrix.tr_mul(v)
    }

    /// Rotate flat `[x, y, z, ..]` vertex data in place.
    pub fn apply_to_vertices(&self, data: &mut [f64]) {
        for xyz in data.chunks_exact_mut(3) {
            let v = self.apply_vec(&Vec3::new(xyz[0], xyz[1], xyz[2]));
            xyz.copy_from_slice(v.as_slice());
        }
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::identity()
    }
}

fn all_close(a: &Vec3, b: &Vec3) -> bool {
    (a - b).amax() <= VECTOR_TOL
}

fn round(v: f64) -> f64 {
    let scale = 10f64.powi(ROUND_DECIMALS);
    (v * scale).round() / scale
}
