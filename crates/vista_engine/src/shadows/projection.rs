//! Light-space projection helpers
//!
//! Pure math shared by the atlas and the cascades. All matrices returned here
//! use the engine's base convention (zero-to-one depth, +Y up); callers
//! pre-multiply the backend [`crate::render::ClipSpace`] correction.

use crate::foundation::math::{constants, Mat4, Mat4Ext, Vec3, Vec4};
use crate::render::Camera;

/// One face of a point-light cube map
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubeFace {
    /// View direction of the face
    pub direction: Vec3,
    /// Up vector of the face
    pub up: Vec3,
}

/// Cube faces in the usual `+X, -X, +Y, -Y, +Z, -Z` layer order
///
/// The Y faces take ±Z as up since ±Y would be parallel to the view axis.
pub const CUBE_FACES: [CubeFace; 6] = [
    CubeFace { direction: Vec3::new(1.0, 0.0, 0.0), up: Vec3::new(0.0, 1.0, 0.0) },
    CubeFace { direction: Vec3::new(-1.0, 0.0, 0.0), up: Vec3::new(0.0, 1.0, 0.0) },
    CubeFace { direction: Vec3::new(0.0, 1.0, 0.0), up: Vec3::new(0.0, 0.0, -1.0) },
    CubeFace { direction: Vec3::new(0.0, -1.0, 0.0), up: Vec3::new(0.0, 0.0, 1.0) },
    CubeFace { direction: Vec3::new(0.0, 0.0, 1.0), up: Vec3::new(0.0, 1.0, 0.0) },
    CubeFace { direction: Vec3::new(0.0, 0.0, -1.0), up: Vec3::new(0.0, 1.0, 0.0) },
];

/// Smallest far-minus-near gap allowed for light frusta
const MIN_DEPTH_SPAN: f32 = 0.01;

/// Narrowest and widest spot frustum angles
const MIN_SPOT_FOV: f32 = 0.01;
const MAX_SPOT_FOV: f32 = constants::PI - 0.1;

/// Up vector for a light looking along `direction`
///
/// +Y unless the direction is within ~8 degrees of ±Y, then +Z.
pub fn light_up_vector(direction: Vec3) -> Vec3 {
    if direction.dot(&Vec3::y()).abs() > 0.99 {
        Vec3::z()
    } else {
        Vec3::y()
    }
}

/// Far plane for a light with the given range
pub fn light_far_plane(range: f32, near: f32) -> f32 {
    range.max(near + MIN_DEPTH_SPAN)
}

/// View-projection of one cube face of a point light
pub fn point_face_view_proj(position: Vec3, face: usize, near: f32, far: f32, fov_epsilon: f32) -> Mat4 {
    let face = CUBE_FACES[face % CUBE_FACES.len()];
    let view = Mat4::look_at(position, position + face.direction, face.up);
    let proj = Mat4::perspective(constants::HALF_PI + fov_epsilon, 1.0, near, far);
    proj * view
}

/// View-projection of a spot light with half angle `outer_cone`
pub fn spot_view_proj(position: Vec3, direction: Vec3, outer_cone: f32, near: f32, far: f32) -> Mat4 {
    let direction = direction.try_normalize(f32::EPSILON).unwrap_or_else(|| -Vec3::y());
    let fov = (2.0 * outer_cone).clamp(MIN_SPOT_FOV, MAX_SPOT_FOV);
    let view = Mat4::look_at(position, position + direction, light_up_vector(direction));
    let proj = Mat4::perspective(fov, 1.0, near, far);
    proj * view
}

/// World-space corners of the camera frustum between two view distances
///
/// Near corners first, then far corners, each in the order
/// bottom-left, bottom-right, top-right, top-left.
pub fn frustum_slice_corners(camera: &Camera, near: f32, far: f32) -> [Vec3; 8] {
    let (forward, right, up) = camera.basis();
    let tan_half_fov = (camera.fov * 0.5).tan();

    let mut corners = [Vec3::zeros(); 8];
    for (slice, distance) in [near, far].into_iter().enumerate() {
        let half_height = distance * tan_half_fov;
        let half_width = half_height * camera.aspect;
        let center = camera.position + forward * distance;

        let base = slice * 4;
        corners[base] = center - right * half_width - up * half_height;
        corners[base + 1] = center + right * half_width - up * half_height;
        corners[base + 2] = center + right * half_width + up * half_height;
        corners[base + 3] = center - right * half_width + up * half_height;
    }
    corners
}

/// Bounding sphere of a point set: centroid and max distance
///
/// The radius is rounded up to a multiple of 1/16 so that tiny floating
/// point differences between frames do not resize the shadow projection.
pub fn bounding_sphere(points: &[Vec3]) -> (Vec3, f32) {
    if points.is_empty() {
        return (Vec3::zeros(), 0.0);
    }
    let center = points.iter().sum::<Vec3>() / points.len() as f32;
    let radius = points
        .iter()
        .map(|point| (point - center).magnitude())
        .fold(0.0_f32, f32::max);
    (center, (radius * 16.0).ceil() / 16.0)
}

/// Shift an orthographic projection so the world origin lands on a texel
///
/// Rounds the clip-space origin to the texel grid of a `resolution` sized
/// map and folds the remainder back into the projection's translation.
pub fn snap_to_texel_grid(proj: &Mat4, view: &Mat4, resolution: u32) -> Mat4 {
    let half_size = resolution as f32 * 0.5;
    let origin = (proj * view) * Vec4::new(0.0, 0.0, 0.0, 1.0);

    let texel_x = origin.x * half_size;
    let texel_y = origin.y * half_size;
    let offset_x = (texel_x.round() - texel_x) / half_size;
    let offset_y = (texel_y.round() - texel_y) / half_size;

    let mut snapped = *proj;
    snapped[(0, 3)] += offset_x;
    snapped[(1, 3)] += offset_y;
    snapped
}

/// Sphere-fitted directional light view and snapped projection
///
/// The eye sits one radius behind the sphere center along `light_dir`; the
/// depth range spans ten radii either side so casters outside the camera
/// slice still land in the map.
pub fn cascade_matrices(center: Vec3, radius: f32, light_dir: Vec3, resolution: u32) -> (Mat4, Mat4) {
    let eye = center - light_dir * radius;
    let view = Mat4::look_at(eye, center, light_up_vector(light_dir));
    let proj = Mat4::orthographic(-radius, radius, -radius, radius, -10.0 * radius, 10.0 * radius);
    (view, snap_to_texel_grid(&proj, &view, resolution))
}
