//! # 3D Camera
//!
//! Perspective camera used both for the main view and as the source of the
//! frustum slices fitted by the cascaded shadow maps.
//!
//! ## Coordinate System
//! Right-handed, Y-up view space; the camera looks down -Z. Projection maps
//! view depth to clip `[0, 1]` with +Y up. Graphics API specific corrections
//! (Vulkan Y-down, OpenGL `[-1, 1]` depth) are applied separately through
//! [`crate::render::backend::ClipSpace`], so camera math stays API-agnostic.

use nalgebra::Unit;

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};

/// 3D perspective camera
///
/// Matrices are computed on demand rather than cached.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,

    /// Vertical field of view in radians
    pub fov: f32,

    /// Aspect ratio (width / height) for projection calculations
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a new perspective camera looking at the origin
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees (stored in radians)
    /// * `aspect` - Aspect ratio (width / height) of the viewport
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    ///
    /// Degenerate values (near >= far) are not rejected; they produce a
    /// degenerate but finite culling volume.
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
        }
    }

    /// Update camera position in world space
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Point the camera at `target` with a custom up vector
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.target = target;
        self.up = up;
        log::trace!("Camera look_at updated - target: {:?}, up: {:?}", target, up);
    }

    /// Update aspect ratio after a viewport change
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    /// Unit view direction
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }

    /// Orthonormal `(forward, right, up)` basis of the view
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = self.forward();
        let right = forward.cross(&self.up).normalize();
        let up = right.cross(&forward);
        (forward, right, up)
    }

    /// World-to-view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    /// View-to-clip matrix (zero-to-one depth, Y up)
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective(self.fov, self.aspect, self.near, self.far)
    }

    /// Combined `projection * view`
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Turn the camera in place
    ///
    /// `yaw` rotates about world +Y, `pitch` about the camera's right axis,
    /// both in radians. The position and the distance to the target are kept.
    pub fn rotate_about_position(&mut self, yaw: f32, pitch: f32) {
        let offset = self.target - self.position;
        let yawed = Mat4::rotation_y(yaw).transform_vector(&offset);

        let right = yawed.cross(&self.up);
        let rotated = match Unit::try_new(right, f32::EPSILON) {
            Some(axis) => Mat4::from_axis_angle(&axis, pitch).transform_vector(&yawed),
            None => yawed,
        };

        self.target = self.position + rotated;
        log::trace!("Camera rotated by yaw {:.3}, pitch {:.3}", yaw, pitch);
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(Vec3::new(0.0, 2.0, 5.0), 60.0, 16.0 / 9.0, 0.1, 100.0)
    }
}
