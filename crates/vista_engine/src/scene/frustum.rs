//! View frustum extraction and box classification
//!
//! Planes are pulled straight out of a view-projection matrix with the
//! Gribb-Hartmann row combinations, so any perspective or orthographic
//! projection (camera, spot light, cube face, cascade) works the same way.

use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::scene::AABB;

/// Clip-space depth convention of the matrix a frustum is extracted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthRange {
    /// `0 <= z <= w` (Vulkan, Direct3D, Metal)
    #[default]
    ZeroToOne,
    /// `-w <= z <= w` (OpenGL)
    NegativeOneToOne,
}

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector (unit length after extraction)
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal: normal.normalize(), distance }
    }

    /// Plane `(a, b, c, d)` scaled so `(a, b, c)` has unit length
    ///
    /// A zero-length normal is kept as-is instead of producing NaNs.
    fn from_coefficients(coefficients: Vec4) -> Self {
        let normal = coefficients.xyz();
        let length = normal.magnitude();
        if length > f32::EPSILON {
            Self { normal: normal / length, distance: coefficients.w / length }
        } else {
            Self { normal, distance: coefficients.w }
        }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }
}

/// Frustum for visibility culling
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    /// Six planes defining the frustum (left, right, bottom, top, near, far),
    /// normals pointing inward
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Index of the left plane in [`Frustum::planes`]
    pub const LEFT: usize = 0;
    /// Index of the right plane
    pub const RIGHT: usize = 1;
    /// Index of the bottom plane
    pub const BOTTOM: usize = 2;
    /// Index of the top plane
    pub const TOP: usize = 3;
    /// Index of the near plane
    pub const NEAR: usize = 4;
    /// Index of the far plane
    pub const FAR: usize = 5;

    /// Create a frustum from six planes
    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extract frustum planes from a zero-to-one depth view-projection matrix
    pub fn from_matrix(vp_matrix: &Mat4) -> Self {
        Self::from_matrix_with_depth(vp_matrix, DepthRange::ZeroToOne)
    }

    /// Extract frustum planes from a view-projection matrix
    ///
    /// Uses the Gribb-Hartmann method: every clip-space inequality
    /// (`-w <= x <= w`, ...) becomes a combination of matrix rows.
    pub fn from_matrix_with_depth(vp_matrix: &Mat4, depth: DepthRange) -> Self {
        let row = |i: usize| -> Vec4 { vp_matrix.row(i).transpose() };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        let near = match depth {
            DepthRange::ZeroToOne => r2,
            DepthRange::NegativeOneToOne => r3 + r2,
        };

        Self {
            planes: [
                Plane::from_coefficients(r3 + r0),
                Plane::from_coefficients(r3 - r0),
                Plane::from_coefficients(r3 + r1),
                Plane::from_coefficients(r3 - r1),
                Plane::from_coefficients(near),
                Plane::from_coefficients(r3 - r2),
            ],
        }
    }

    /// Check if a box given by its corners is inside or intersects the frustum
    ///
    /// Conservative: boxes near frustum edges may be accepted even though they
    /// are outside, but a box that is visible is never rejected.
    pub fn intersects(&self, min: Vec3, max: Vec3) -> bool {
        for plane in &self.planes {
            // Corner of the box furthest along the plane normal
            let mut p = min;
            if plane.normal.x >= 0.0 { p.x = max.x; }
            if plane.normal.y >= 0.0 { p.y = max.y; }
            if plane.normal.z >= 0.0 { p.z = max.z; }

            // If even this corner is outside, the entire box is outside
            if plane.distance_to_point(p) < 0.0 {
                return false;
            }
        }

        true
    }

    /// Check if an AABB is inside or intersects the frustum
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        self.intersects(aabb.min, aabb.max)
    }

    /// Check if a point lies on the inner side of all six planes
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|plane| plane.distance_to_point(point) >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Mat4Ext;
    use approx::assert_relative_eq;

    fn box_frustum() -> Frustum {
        // x, y in [-2, 2], view depth 0..20 in front of a camera at the origin
        let proj = Mat4::orthographic(-2.0, 2.0, -2.0, 2.0, 0.0, 20.0);
        Frustum::from_matrix(&proj)
    }

    #[test]
    fn test_identity_contains_origin() {
        let frustum = Frustum::from_matrix(&Mat4::identity());
        for plane in &frustum.planes {
            assert!(plane.distance_to_point(Vec3::zeros()) >= 0.0);
        }
        assert!(frustum.contains_point(Vec3::zeros()));
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, -0.5)));
    }

    #[test]
    fn test_planes_are_normalized() {
        let proj = Mat4::perspective(1.2, 1.6, 0.1, 100.0);
        let view = Mat4::look_at(Vec3::new(1.0, 2.0, 3.0), Vec3::zeros(), Vec3::y());
        let frustum = Frustum::from_matrix(&(proj * view));

        for plane in &frustum.planes {
            assert_relative_eq!(plane.normal.magnitude(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_box_classification() {
        let frustum = box_frustum();

        let inside = AABB::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(1.0, 1.0, -4.0));
        let straddling = AABB::new(Vec3::new(1.5, 0.0, -5.0), Vec3::new(3.0, 1.0, -4.0));
        let beside = AABB::new(Vec3::new(10.0, 0.0, -5.0), Vec3::new(11.0, 1.0, -4.0));
        let behind = AABB::new(Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 1.0, 2.0));
        let beyond_far = AABB::new(Vec3::new(0.0, 0.0, -40.0), Vec3::new(1.0, 1.0, -30.0));

        assert!(frustum.intersects_aabb(&inside));
        assert!(frustum.intersects_aabb(&straddling));
        assert!(!frustum.intersects_aabb(&beside));
        assert!(!frustum.intersects_aabb(&behind));
        assert!(!frustum.intersects_aabb(&beyond_far));
    }

    #[test]
    fn test_opengl_depth_range_moves_near_plane() {
        // A zero-to-one projection read as -1..1 admits points behind the near plane
        let proj = Mat4::orthographic(-1.0, 1.0, -1.0, 1.0, 1.0, 10.0);
        let zo = Frustum::from_matrix_with_depth(&proj, DepthRange::ZeroToOne);
        let gl = Frustum::from_matrix_with_depth(&proj, DepthRange::NegativeOneToOne);

        let just_behind_near = Vec3::new(0.0, 0.0, -0.5);
        assert!(!zo.contains_point(just_behind_near));
        assert!(gl.contains_point(just_behind_near));
    }

    #[test]
    fn test_y_flip_does_not_change_culling() {
        let proj = Mat4::perspective(1.0, 1.0, 0.1, 50.0);
        let mut flip = Mat4::identity();
        flip[(1, 1)] = -1.0;

        let normal = Frustum::from_matrix(&proj);
        let flipped = Frustum::from_matrix(&(flip * proj));

        let probe = AABB::new(Vec3::new(-0.2, 3.0, -10.0), Vec3::new(0.2, 3.5, -9.0));
        assert_eq!(normal.intersects_aabb(&probe), flipped.intersects_aabb(&probe));
        assert_relative_eq!(normal.planes[Frustum::TOP].normal, flipped.planes[Frustum::BOTTOM].normal, epsilon = 1e-6);
    }
}
