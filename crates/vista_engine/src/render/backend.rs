//! Backend abstraction for the rendering system
//!
//! The visibility and shadow core never talks to a graphics API directly.
//! It creates depth texture arrays and per-layer framebuffers, records depth
//! passes and submits instanced draws through [`RenderBackend`]; a concrete
//! API binding (or the recording [`crate::render::HeadlessBackend`]) sits
//! behind it.

use bitflags::bitflags;

use crate::core::config::GraphicsBackend;
use crate::foundation::math::Mat4;
use crate::render::RenderResult;
use crate::scene::DepthRange;

/// Handle to a mesh resource stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeshHandle(pub u64);

/// Handle to a texture (or texture array)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Handle to a framebuffer targeting one texture layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferHandle(pub u64);

/// Handle to a compiled shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub u64);

/// Handle to a material resource set (descriptor set, uniform buffers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u64);

bitflags! {
    /// How a texture will be used
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Rendered into as a depth target
        const DEPTH_ATTACHMENT = 1 << 0;
        /// Read by shaders
        const SAMPLED = 1 << 1;
        /// Rendered into as a color target
        const COLOR_ATTACHMENT = 1 << 2;
    }
}

/// Description of a 2D texture array
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    /// Debug label
    pub label: String,
    /// Width in texels
    pub width: u32,
    /// Height in texels
    pub height: u32,
    /// Number of array layers
    pub array_layers: u32,
    /// Usage flags
    pub usage: TextureUsage,
}

impl TextureDesc {
    /// Square depth array that can also be sampled
    pub fn shadow_depth_array(label: impl Into<String>, size: u32, layers: u32) -> Self {
        Self {
            label: label.into(),
            width: size,
            height: size,
            array_layers: layers,
            usage: TextureUsage::DEPTH_ATTACHMENT | TextureUsage::SAMPLED,
        }
    }
}

/// Pixel rectangle of the current render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// Left edge in pixels
    pub x: u32,
    /// Top edge in pixels
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Viewport {
    /// Create a viewport
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Viewport covering a whole square target
    pub fn full(size: u32) -> Self {
        Self::new(0, 0, size, size)
    }
}

/// Clip-space conventions of a graphics API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipSpace {
    /// Depth range of normalized device coordinates
    pub depth: DepthRange,
    /// True if clip-space +Y points down the screen
    pub y_down: bool,
}

impl ClipSpace {
    /// Conventions of `backend`
    pub fn for_backend(backend: GraphicsBackend) -> Self {
        match backend {
            GraphicsBackend::Vulkan => Self { depth: DepthRange::ZeroToOne, y_down: true },
            GraphicsBackend::Direct3D11 | GraphicsBackend::Metal => {
                Self { depth: DepthRange::ZeroToOne, y_down: false }
            }
            GraphicsBackend::OpenGl => Self { depth: DepthRange::NegativeOneToOne, y_down: false },
        }
    }

    /// Matrix taking zero-to-one, Y-up clip coordinates to this convention
    ///
    /// Pre-multiply onto a projection: `correction() * proj * view`.
    pub fn correction(&self) -> Mat4 {
        let mut correction = Mat4::identity();
        if self.y_down {
            correction[(1, 1)] = -1.0;
        }
        if self.depth == DepthRange::NegativeOneToOne {
            // z' = 2z - w
            correction[(2, 2)] = 2.0;
            correction[(2, 3)] = -1.0;
        }
        correction
    }
}

impl Default for ClipSpace {
    fn default() -> Self {
        Self::for_backend(GraphicsBackend::default())
    }
}

impl From<GraphicsBackend> for ClipSpace {
    fn from(backend: GraphicsBackend) -> Self {
        Self::for_backend(backend)
    }
}

/// Draw-submission interface consumed by the shadow and cascade passes
///
/// Resource creation is fallible; state and draw commands fail when issued
/// outside a pass or with handles the backend does not know.
pub trait RenderBackend {
    /// Create a 2D texture array
    fn create_texture_array(&mut self, desc: &TextureDesc) -> RenderResult<TextureHandle>;

    /// Create a framebuffer rendering into one layer of a texture array
    fn create_layer_framebuffer(&mut self, texture: TextureHandle, layer: u32) -> RenderResult<FramebufferHandle>;

    /// Compile or look up a shader program by name
    fn create_shader(&mut self, name: &str) -> RenderResult<ShaderHandle>;

    /// Allocate the resource set for a material
    fn create_material_resources(&mut self, material_id: u64) -> RenderResult<MaterialHandle>;

    /// Release a texture
    fn destroy_texture(&mut self, texture: TextureHandle) -> RenderResult<()>;

    /// Release a framebuffer
    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle) -> RenderResult<()>;

    /// Release a shader
    fn destroy_shader(&mut self, shader: ShaderHandle) -> RenderResult<()>;

    /// Release a material resource set
    fn destroy_material_resources(&mut self, material: MaterialHandle) -> RenderResult<()>;

    /// Start a depth-only pass, clearing the target to `clear_depth`
    fn begin_depth_pass(&mut self, framebuffer: FramebufferHandle, clear_depth: f32) -> RenderResult<()>;

    /// Restrict rasterization to a rectangle of the current target
    fn set_viewport(&mut self, viewport: Viewport) -> RenderResult<()>;

    /// Bind the shader used by following draws
    fn bind_shader(&mut self, shader: ShaderHandle) -> RenderResult<()>;

    /// Set the view-projection used by following draws
    fn set_view_projection(&mut self, view_proj: &Mat4) -> RenderResult<()>;

    /// Draw one instance of `mesh` per transform
    fn draw_mesh_instanced(&mut self, mesh: MeshHandle, transforms: &[Mat4]) -> RenderResult<()>;

    /// Finish the current pass
    fn end_pass(&mut self) -> RenderResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4Ext, Vec3, Vec4};
    use crate::scene::{Frustum, AABB};
    use approx::assert_relative_eq;

    #[test]
    fn test_backend_conventions() {
        assert_eq!(ClipSpace::for_backend(GraphicsBackend::Vulkan), ClipSpace { depth: DepthRange::ZeroToOne, y_down: true });
        assert_eq!(ClipSpace::from(GraphicsBackend::Metal), ClipSpace { depth: DepthRange::ZeroToOne, y_down: false });
        assert_eq!(ClipSpace::from(GraphicsBackend::Direct3D11).correction(), Mat4::identity());
        assert_eq!(ClipSpace::from(GraphicsBackend::OpenGl).depth, DepthRange::NegativeOneToOne);
    }

    #[test]
    fn test_opengl_correction_maps_depth_range() {
        let proj = Mat4::perspective(1.0, 1.0, 1.0, 10.0);
        let gl = ClipSpace::from(GraphicsBackend::OpenGl).correction() * proj;

        let near = gl * Vec4::new(0.0, 0.0, -1.0, 1.0);
        let far = gl * Vec4::new(0.0, 0.0, -10.0, 1.0);
        assert_relative_eq!(near.z / near.w, -1.0, epsilon = 1e-5);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_corrected_frustum_culls_identically() {
        let view = Mat4::look_at(Vec3::new(0.0, 3.0, 8.0), Vec3::zeros(), Vec3::y());
        let vp = Mat4::perspective(1.1, 1.3, 0.5, 40.0) * view;
        let probes = [
            AABB::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0)),
            AABB::new(Vec3::new(30.0, 0.0, 0.0), Vec3::new(31.0, 1.0, 1.0)),
            AABB::new(Vec3::new(0.0, 3.0, 7.8), Vec3::new(0.1, 3.1, 7.9)),
            AABB::new(Vec3::new(-0.5, 0.0, -80.0), Vec3::new(0.5, 1.0, -70.0)),
        ];

        let reference = Frustum::from_matrix(&vp);
        for backend in [GraphicsBackend::Vulkan, GraphicsBackend::Direct3D11, GraphicsBackend::Metal, GraphicsBackend::OpenGl] {
            let clip = ClipSpace::from(backend);
            let frustum = Frustum::from_matrix_with_depth(&(clip.correction() * vp), clip.depth);
            for probe in &probes {
                assert_eq!(frustum.intersects_aabb(probe), reference.intersects_aabb(probe), "{:?}", backend);
            }
        }
    }

    #[test]
    fn test_shadow_depth_array_usage() {
        let desc = TextureDesc::shadow_depth_array("atlas", 1024, 8);
        assert!(desc.usage.contains(TextureUsage::DEPTH_ATTACHMENT | TextureUsage::SAMPLED));
        assert!(!desc.usage.contains(TextureUsage::COLOR_ATTACHMENT));
        assert_eq!(desc.array_layers, 8);
    }
}
