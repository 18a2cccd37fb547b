//! Directional light cascade pass

use crate::render::backend::Viewport;
use crate::render::context::GraphicsContext;
use crate::render::passes::{draw_view, with_depth_pass, PassStats, SHADOW_DEPTH_SHADER};
use crate::render::{RenderBackend, RenderResult};
use crate::scene::{SceneBvh, SceneObject};
use crate::shadows::CsmAtlas;

/// Renders each cascade into its own layer of the CSM texture
#[derive(Debug, Default)]
pub struct CsmPass {
    visible: Vec<usize>,
}

impl CsmPass {
    /// Create the pass
    pub fn new() -> Self {
        Self::default()
    }

    /// Record all cascades; call after [`CsmAtlas::update_cascades`]
    pub fn execute<B: RenderBackend>(
        &mut self,
        ctx: &mut GraphicsContext<B>,
        csm: &CsmAtlas,
        bvh: &SceneBvh,
        objects: &[SceneObject],
    ) -> RenderResult<PassStats> {
        let mut stats = PassStats::default();
        let shader = ctx.cache.get_or_create_shader(&mut ctx.backend, SHADOW_DEPTH_SHADER)?;
        let depth = csm.clip_space().depth;
        let viewport = Viewport::full(csm.resolution());

        for cascade in csm.cascades() {
            let Some(framebuffer) = csm.framebuffer(cascade.index) else {
                continue;
            };

            with_depth_pass(&mut ctx.backend, framebuffer, |backend| {
                backend.bind_shader(shader)?;
                backend.set_viewport(viewport)?;
                draw_view(backend, bvh, objects, &cascade.view_proj, depth, &mut self.visible, &mut stats)
            })?;
            stats.passes += 1;
        }

        log::trace!("CSM pass: {} cascades, {} draws", stats.views, stats.draw_calls);
        Ok(stats)
    }
}
