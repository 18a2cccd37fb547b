//! Depth-only shadow passes
//!
//! Both passes share the same per-view body: cull the scene BVH with the
//! view's frustum, batch what survived by mesh and submit one instanced draw
//! per batch.

pub mod csm_pass;
pub mod shadow_pass;

use crate::foundation::math::Mat4;
use crate::render::backend::{FramebufferHandle, RenderBackend};
use crate::render::batching::build_batches;
use crate::render::RenderResult;
use crate::scene::{BvhStats, DepthRange, Frustum, SceneBvh, SceneObject};

pub use csm_pass::CsmPass;
pub use shadow_pass::ShadowPass;

/// Shader used by every depth-only pass
pub const SHADOW_DEPTH_SHADER: &str = "shadow_depth";

/// Depth written by the pass clear
pub const CLEAR_DEPTH: f32 = 1.0;

/// Counters collected while recording a pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Render passes begun
    pub passes: u32,
    /// Views rendered (tiles or cascades)
    pub views: u32,
    /// Instanced draws submitted
    pub draw_calls: u32,
    /// Instances across all draws
    pub instances: u32,
    /// BVH work summed over every view
    pub culling: BvhStats,
}

impl PassStats {
    /// Add another pass's counters to this one
    pub fn accumulate(&mut self, other: &PassStats) {
        self.passes += other.passes;
        self.views += other.views;
        self.draw_calls += other.draw_calls;
        self.instances += other.instances;
        self.culling.accumulate(&other.culling);
    }
}

/// Record one view: cull, batch, draw
///
/// The pass must already be active with viewport and shader set.
pub(crate) fn draw_view(
    backend: &mut dyn RenderBackend,
    bvh: &SceneBvh,
    objects: &[SceneObject],
    view_proj: &Mat4,
    depth: DepthRange,
    visible: &mut Vec<usize>,
    stats: &mut PassStats,
) -> RenderResult<()> {
    backend.set_view_projection(view_proj)?;

    let frustum = Frustum::from_matrix_with_depth(view_proj, depth);
    let culling = bvh.query_into(&frustum, visible);
    stats.culling.accumulate(&culling);
    stats.views += 1;

    for batch in build_batches(visible, objects) {
        backend.draw_mesh_instanced(batch.mesh, &batch.transforms)?;
        stats.draw_calls += 1;
        stats.instances += batch.transforms.len() as u32;
    }
    Ok(())
}

/// Run `record` inside a depth pass on `framebuffer`, always ending the pass
///
/// The first error wins; a failure while recording still closes the pass.
pub(crate) fn with_depth_pass<F>(
    backend: &mut dyn RenderBackend,
    framebuffer: FramebufferHandle,
    record: F,
) -> RenderResult<()>
where
    F: FnOnce(&mut dyn RenderBackend) -> RenderResult<()>,
{
    backend.begin_depth_pass(framebuffer, CLEAR_DEPTH)?;
    let recorded = record(&mut *backend);
    let ended = backend.end_pass();
    recorded.and(ended)
}
