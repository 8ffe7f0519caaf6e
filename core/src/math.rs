//! Math type aliases, helper functions and axis-aligned bounds.
//!
//! All vector and matrix types are `f32` nalgebra types. Matrices follow the
//! column-vector convention: `m * p` transforms `p`.

use serde::{Deserialize, Serialize};

pub use nalgebra;

/// 2D vector (f32).
pub type Vec2 = nalgebra::Vector2<f32>;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 4D vector (f32).
pub type Vec4 = nalgebra::Vector4<f32>;

/// 3x3 matrix (f32).
pub type Mat3 = nalgebra::Matrix3<f32>;

/// 4x4 matrix (f32).
pub type Mat4 = nalgebra::Matrix4<f32>;

/// Quaternion (f32). Stored as `[x, y, z, w]` in memory.
/// Use [`quat_from_array`] or `Quaternion::new(w, x, y, z)` to construct.
pub type Quat = nalgebra::Quaternion<f32>;

/// Linear RGBA color.
pub type Color = Vec4;

/// Build a 4x4 TRS matrix from scale, rotation (quaternion), and translation.
pub fn mat4_from_scale_rotation_translation(
    scale: Vec3,
    rotation: Quat,
    translation: Vec3,
) -> Mat4 {
    let r = nalgebra::UnitQuaternion::new_normalize(rotation);
    let m = r.to_rotation_matrix();
    let rm = m.matrix();
    #[rustfmt::skip]
    let result = Mat4::new(
        rm[(0, 0)] * scale.x, rm[(0, 1)] * scale.y, rm[(0, 2)] * scale.z, translation.x,
        rm[(1, 0)] * scale.x, rm[(1, 1)] * scale.y, rm[(1, 2)] * scale.z, translation.y,
        rm[(2, 0)] * scale.x, rm[(2, 1)] * scale.y, rm[(2, 2)] * scale.z, translation.z,
        0.0,                  0.0,                  0.0,                  1.0,
    );
    result
}

/// Create a quaternion from a `[x, y, z, w]` array.
pub fn quat_from_array(a: [f32; 4]) -> Quat {
    nalgebra::Quaternion::new(a[3], a[0], a[1], a[2])
}

/// Transform a point (w = 1) by a 4x4 matrix.
pub fn transform_point(m: &Mat4, p: &Vec3) -> Vec3 {
    m.transform_point(&nalgebra::Point3::from(*p)).coords
}

/// Upper-left 3x3 block of a 4x4 matrix.
pub fn linear_part(m: &Mat4) -> Mat3 {
    m.fixed_view::<3, 3>(0, 0).into_owned()
}

/// Matrix that transforms surface normals under `m`.
///
/// This is the inverse-transpose of the linear part. Falls back to the linear
/// part itself when it is singular.
pub fn normal_matrix(m: &Mat4) -> Mat3 {
    let linear = linear_part(m);
    match linear.try_inverse() {
        Some(inverse) => inverse.transpose(),
        None => linear,
    }
}

/// Axis-aligned bounding box stored as center and half-extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Box center.
    pub center: Vec3,
    /// Half size along each axis. Never negative.
    pub extents: Vec3,
}

impl Bounds {
    /// Create bounds spanning `min..max`.
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self {
            center: (min + max) * 0.5,
            extents: (max - min).abs() * 0.5,
        }
    }

    /// Smallest bounds containing all points, or `None` for an empty set.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.inf(p), max.sup(p)));
        Some(Self::from_min_max(min, max))
    }

    /// Minimum corner.
    pub fn min(&self) -> Vec3 {
        self.center - self.extents
    }

    /// Maximum corner.
    pub fn max(&self) -> Vec3 {
        self.center + self.extents
    }

    /// The eight corners of the box.
    pub fn corners(&self) -> [Vec3; 8] {
        let (min, max) = (self.min(), self.max());
        [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(min.x, max.y, max.z),
            Vec3::new(max.x, max.y, max.z),
        ]
    }

    /// Grow this box so it also contains `other`.
    pub fn encapsulate(&mut self, other: &Bounds) {
        *self = Self::from_min_max(self.min().inf(&other.min()), self.max().sup(&other.max()));
    }

    /// Axis-aligned box containing this box after transformation by `m`.
    pub fn transformed(&self, m: &Mat4) -> Bounds {
        let corners = self.corners().map(|c| transform_point(m, &c));
        // Eight corners are never empty.
        Self::from_points(corners.iter()).unwrap_or(*self)
    }

}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            center: Vec3::zeros(),
            extents: Vec3::zeros(),
        }
    }
}
