//! # Cascaded Shadow Maps
//!
//! Four cascades for the directional light, one layer each in a square depth
//! texture array. Every frame the camera range is split with a blend of
//! logarithmic and uniform distribution, and each slice gets an orthographic
//! light projection fitted to its bounding sphere.
//!
//! ## Stability
//!
//! - The sphere radius does not depend on camera orientation, so turning the
//!   camera does not resize the projection.
//! - The radius is rounded up to 1/16 units and the projection origin is
//!   snapped to whole texels, so moving the camera shifts the shadow map in
//!   texel steps only.

use crate::core::config::CsmConfig;
use crate::foundation::math::{Mat4, Vec3};
use crate::render::backend::{ClipSpace, FramebufferHandle, RenderBackend, TextureDesc, TextureHandle};
use crate::render::{Camera, RenderResult};
use crate::shadows::projection;
use crate::shadows::uniforms::CascadeUniform;

/// Number of cascades
pub const CASCADE_COUNT: usize = 4;

/// One cascade of the directional shadow
#[derive(Debug, Clone, PartialEq)]
pub struct Cascade {
    /// Cascade index, 0 nearest the camera
    pub index: usize,
    /// View distance where this cascade starts
    pub near_split: f32,
    /// View distance where this cascade ends
    pub split: f32,
    /// Bounding sphere center of the camera slice
    pub center: Vec3,
    /// Bounding sphere radius (multiple of 1/16)
    pub radius: f32,
    /// Light view matrix
    pub view: Mat4,
    /// Snapped light view-projection including the backend correction
    pub view_proj: Mat4,
}

impl Cascade {
    fn empty(index: usize) -> Self {
        Self {
            index,
            near_split: 0.0,
            split: 0.0,
            center: Vec3::zeros(),
            radius: 0.0,
            view: Mat4::identity(),
            view_proj: Mat4::identity(),
        }
    }
}

/// Far distances of each cascade
///
/// `split[i] = λ·near·(far/near)^p + (1 − λ)·(near + (far − near)·p)` with
/// `p = (i + 1) / CASCADE_COUNT`. The last split is exactly `far`.
pub fn cascade_splits(near: f32, far: f32, lambda: f32) -> [f32; CASCADE_COUNT] {
    let mut splits = [far; CASCADE_COUNT];
    for (i, split) in splits.iter_mut().enumerate().take(CASCADE_COUNT - 1) {
        let p = (i + 1) as f32 / CASCADE_COUNT as f32;
        let log = near * (far / near).powf(p);
        let uniform = near + (far - near) * p;
        *split = (lambda * log + (1.0 - lambda) * uniform).min(far);
    }
    splits
}

/// Directional light cascade atlas
#[derive(Debug)]
pub struct CsmAtlas {
    config: CsmConfig,
    clip_space: ClipSpace,
    texture: TextureHandle,
    framebuffers: Vec<FramebufferHandle>,
    cascades: [Cascade; CASCADE_COUNT],
}

impl CsmAtlas {
    /// Create the cascade texture array and one framebuffer per cascade
    pub fn new(config: CsmConfig, clip_space: ClipSpace, backend: &mut dyn RenderBackend) -> RenderResult<Self> {
        let desc = TextureDesc::shadow_depth_array("csm_atlas", config.resolution, CASCADE_COUNT as u32);
        let texture = backend.create_texture_array(&desc)?;

        let mut framebuffers = Vec::with_capacity(CASCADE_COUNT);
        for layer in 0..CASCADE_COUNT as u32 {
            framebuffers.push(backend.create_layer_framebuffer(texture, layer)?);
        }

        log::info!("CSM atlas created: {} cascades of {}x{}", CASCADE_COUNT, config.resolution, config.resolution);

        Ok(Self {
            config,
            clip_space,
            texture,
            framebuffers,
            cascades: std::array::from_fn(Cascade::empty),
        })
    }

    /// Refit every cascade to the camera and light direction
    ///
    /// `light_dir` is the direction the light travels. A zero vector falls
    /// back to straight down.
    pub fn update_cascades(&mut self, camera: &Camera, light_dir: Vec3) {
        let light_dir = light_dir.try_normalize(f32::EPSILON).unwrap_or_else(|| -Vec3::y());
        let far = camera.far.min(self.config.max_shadow_distance);
        let splits = cascade_splits(camera.near, far, self.config.lambda);
        let correction = self.clip_space.correction();

        let mut last_split = camera.near;
        for (cascade, &split) in self.cascades.iter_mut().zip(splits.iter()) {
            let corners = projection::frustum_slice_corners(camera, last_split, split);
            let (center, radius) = projection::bounding_sphere(&corners);
            let (view, proj) = projection::cascade_matrices(center, radius, light_dir, self.config.resolution);

            *cascade = Cascade {
                index: cascade.index,
                near_split: last_split,
                split,
                center,
                radius,
                view,
                view_proj: correction * proj * view,
            };
            log::trace!(
                "Cascade {}: [{:.2}, {:.2}] radius {:.4}",
                cascade.index,
                last_split,
                split,
                radius
            );
            last_split = split;
        }
    }

    /// View-projection of a cascade
    ///
    /// # Panics
    /// Panics if `index >= CASCADE_COUNT`.
    pub fn view_proj(&self, index: usize) -> Mat4 {
        self.cascades[index].view_proj
    }

    /// Far split distance of a cascade
    ///
    /// # Panics
    /// Panics if `index >= CASCADE_COUNT`.
    pub fn split(&self, index: usize) -> f32 {
        self.cascades[index].split
    }

    /// Cascade by index
    pub fn cascade(&self, index: usize) -> Option<&Cascade> {
        self.cascades.get(index)
    }

    /// All cascades, nearest first
    pub fn cascades(&self) -> &[Cascade; CASCADE_COUNT] {
        &self.cascades
    }

    /// Framebuffer rendering into cascade `index`
    pub fn framebuffer(&self, index: usize) -> Option<FramebufferHandle> {
        self.framebuffers.get(index).copied()
    }

    /// Depth texture array
    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    /// Edge length of every cascade layer in texels
    pub fn resolution(&self) -> u32 {
        self.config.resolution
    }

    /// Conventions the stored matrices were built for
    pub fn clip_space(&self) -> ClipSpace {
        self.clip_space
    }

    /// Shader-ready copy of every cascade
    pub fn uniform(&self) -> CascadeUniform {
        CascadeUniform {
            view_proj: std::array::from_fn(|i| self.cascades[i].view_proj.into()),
            splits: std::array::from_fn(|i| self.cascades[i].split),
        }
    }

    /// Release the texture and framebuffers
    pub fn destroy(&mut self, backend: &mut dyn RenderBackend) -> RenderResult<()> {
        for framebuffer in self.framebuffers.drain(..) {
            backend.destroy_framebuffer(framebuffer)?;
        }
        backend.destroy_texture(self.texture)?;
        log::info!("CSM atlas destroyed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::GraphicsBackend;
    use crate::foundation::math::Vec4;
    use crate::render::HeadlessBackend;
    use approx::assert_relative_eq;

    fn camera() -> Camera {
        let mut camera = Camera::perspective(Vec3::new(4.0, 6.0, 12.0), 60.0, 16.0 / 9.0, 0.1, 200.0);
        camera.look_at(Vec3::new(0.0, 0.0, 0.0), Vec3::y());
        camera
    }

    fn csm(backend: GraphicsBackend) -> CsmAtlas {
        let mut headless = HeadlessBackend::new();
        CsmAtlas::new(CsmConfig::default(), ClipSpace::from(backend), &mut headless).unwrap()
    }

    #[test]
    fn test_splits_monotonic_and_bounded() {
        for &(near, far, lambda) in &[(0.1, 150.0, 0.935), (0.5, 80.0, 0.0), (1.0, 1000.0, 1.0), (0.01, 10.0, 0.5)] {
            let splits = cascade_splits(near, far, lambda);
            assert!(near < splits[0], "{:?}", splits);
            for pair in splits.windows(2) {
                assert!(pair[0] < pair[1], "{:?}", splits);
            }
            assert_eq!(splits[CASCADE_COUNT - 1], far);
        }
    }

    #[test]
    fn test_far_clamped_to_shadow_distance() {
        let mut atlas = csm(GraphicsBackend::Vulkan);
        atlas.update_cascades(&camera(), Vec3::new(0.3, -1.0, 0.2));

        assert_eq!(atlas.split(3), 150.0);
        for i in 1..CASCADE_COUNT {
            assert!(atlas.split(i - 1) < atlas.split(i));
            assert_eq!(atlas.cascade(i).unwrap().near_split, atlas.split(i - 1));
        }
        assert_eq!(atlas.cascade(0).unwrap().near_split, 0.1);
    }

    #[test]
    fn test_radius_invariant_under_rotation() {
        let mut atlas = csm(GraphicsBackend::Direct3D11);
        let light_dir = Vec3::new(-0.4, -1.0, 0.3);

        let mut camera = camera();
        atlas.update_cascades(&camera, light_dir);
        let before: Vec<Cascade> = atlas.cascades().to_vec();

        for (yaw, pitch) in [(0.9, 0.0), (2.5, 0.3), (-1.2, -0.4)] {
            camera.rotate_about_position(yaw, pitch);
            atlas.update_cascades(&camera, light_dir);

            for (old, new) in before.iter().zip(atlas.cascades().iter()) {
                assert_relative_eq!(old.radius, new.radius, epsilon = 1e-4);
            }
            assert_ne!(before[0].view, atlas.cascades()[0].view);
        }
    }

    #[test]
    fn test_slice_corners_inside_cascade_volume() {
        for backend in [GraphicsBackend::Vulkan, GraphicsBackend::OpenGl, GraphicsBackend::Metal] {
            let mut atlas = csm(backend);
            let camera = camera();
            atlas.update_cascades(&camera, Vec3::new(0.2, -0.9, -0.3));

            let min_depth = if backend == GraphicsBackend::OpenGl { -1.0 } else { 0.0 };
            for cascade in atlas.cascades() {
                for corner in projection::frustum_slice_corners(&camera, cascade.near_split, cascade.split) {
                    assert!((corner - cascade.center).magnitude() <= cascade.radius + 1e-3);

                    let clip = cascade.view_proj * Vec4::new(corner.x, corner.y, corner.z, 1.0);
                    let ndc = clip.xyz() / clip.w;
                    // Snapping moves the window by at most one texel
                    assert!(ndc.x.abs() <= 1.001 && ndc.y.abs() <= 1.001, "{:?}", ndc);
                    assert!(ndc.z >= min_depth - 1e-4 && ndc.z <= 1.0 + 1e-4, "{:?}", ndc);
                }
            }
        }
    }

    #[test]
    fn test_light_straight_down_is_finite() {
        let mut atlas = csm(GraphicsBackend::Vulkan);
        atlas.update_cascades(&camera(), Vec3::new(0.0, -1.0, 0.0));
        for cascade in atlas.cascades() {
            assert!(cascade.view_proj.iter().all(|v| v.is_finite()));
        }

        atlas.update_cascades(&camera(), Vec3::zeros());
        assert!(atlas.view_proj(0).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_camera_translation_moves_in_whole_texels() {
        let mut atlas = csm(GraphicsBackend::Direct3D11);
        let light_dir = Vec3::new(0.5, -1.0, 0.25);
        let mut camera = camera();
        let half = atlas.resolution() as f32 * 0.5;

        for step in 0..5 {
            camera.position.x += 0.013 * step as f32;
            camera.target.x += 0.013 * step as f32;
            atlas.update_cascades(&camera, light_dir);

            for cascade in atlas.cascades() {
                let origin = cascade.view_proj * Vec4::new(0.0, 0.0, 0.0, 1.0);
                assert_relative_eq!((origin.x * half).round(), origin.x * half, epsilon = 2e-2);
                assert_relative_eq!((origin.y * half).round(), origin.y * half, epsilon = 2e-2);
            }
        }
    }

    #[test]
    fn test_uniform_mirrors_cascades() {
        let mut atlas = csm(GraphicsBackend::Vulkan);
        atlas.update_cascades(&camera(), Vec3::new(0.1, -1.0, 0.1));
        let uniform = atlas.uniform();

        for i in 0..CASCADE_COUNT {
            assert_eq!(uniform.splits[i], atlas.split(i));
            let expected: [[f32; 4]; 4] = atlas.view_proj(i).into();
            assert_eq!(uniform.view_proj[i], expected);
        }
    }

    #[test]
    fn test_destroy_releases_layers() {
        let mut backend = HeadlessBackend::new();
        let mut atlas = CsmAtlas::new(CsmConfig::default(), ClipSpace::default(), &mut backend).unwrap();
        assert_eq!(backend.live_framebuffers(), CASCADE_COUNT);
        assert_eq!(backend.texture_desc(atlas.texture()).map(|desc| desc.array_layers), Some(4));

        atlas.destroy(&mut backend).unwrap();
        assert_eq!(backend.live_textures(), 0);
    }
}
