//! Point and spot light shadow pass
//!
//! One depth pass per atlas page that holds at least one allocation. Each
//! allocation is a tile viewport inside that page with its own light
//! view-projection; the scene is culled per tile.

use crate::render::context::GraphicsContext;
use crate::render::passes::{draw_view, with_depth_pass, PassStats, SHADOW_DEPTH_SHADER};
use crate::render::{RenderBackend, RenderResult};
use crate::scene::{SceneBvh, SceneObject};
use crate::shadows::{ShadowAllocation, ShadowAtlas};

/// Renders every atlas allocation into its tile
#[derive(Debug, Default)]
pub struct ShadowPass {
    visible: Vec<usize>,
}

impl ShadowPass {
    /// Create the pass
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the atlas pages for this frame
    pub fn execute<B: RenderBackend>(
        &mut self,
        ctx: &mut GraphicsContext<B>,
        atlas: &ShadowAtlas,
        bvh: &SceneBvh,
        objects: &[SceneObject],
    ) -> RenderResult<PassStats> {
        let mut stats = PassStats::default();
        if atlas.allocated_light_count() == 0 {
            return Ok(stats);
        }

        let shader = ctx.cache.get_or_create_shader(&mut ctx.backend, SHADOW_DEPTH_SHADER)?;
        let depth = atlas.clip_space().depth;

        for page in 0..atlas.page_count() {
            let views: Vec<&ShadowAllocation> = atlas
                .iter_allocations()
                .filter(|allocation| allocation.page_index as usize == page)
                .collect();
            if views.is_empty() {
                continue;
            }
            let Some(framebuffer) = atlas.framebuffer(page) else {
                continue;
            };

            with_depth_pass(&mut ctx.backend, framebuffer, |backend| {
                backend.bind_shader(shader)?;
                for allocation in &views {
                    backend.set_viewport(allocation.pixel_rect())?;
                    draw_view(backend, bvh, objects, &allocation.view_proj, depth, &mut self.visible, &mut stats)?;
                }
                Ok(())
            })?;
            stats.passes += 1;
        }

        log::trace!(
            "Shadow pass: {} pages, {} tiles, {} draws",
            stats.passes,
            stats.views,
            stats.draw_calls
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{GraphicsBackend, ShadowAtlasConfig};
    use crate::foundation::math::{Transform, Vec3};
    use crate::render::{BackendCommand, Camera, ClipSpace, HeadlessBackend, MeshHandle, Viewport};
    use crate::scene::{LightFactory, MeshInstance, Scene, SceneNode, AABB};

    fn cube() -> MeshInstance {
        MeshInstance::new(MeshHandle(1), AABB::new(Vec3::repeat(-0.5), Vec3::repeat(0.5)))
    }

    #[test]
    fn test_spot_tile_draws_only_lit_objects() {
        let mut ctx = GraphicsContext::new(HeadlessBackend::new(), GraphicsBackend::Vulkan);
        let mut atlas = ShadowAtlas::new(ShadowAtlasConfig::default(), ctx.clip_space(), &mut ctx.backend).unwrap();

        let mut scene = Scene::new();
        scene.add_node(SceneNode::new("lit").with_mesh(cube()));
        scene.add_node(SceneNode::new("far").with_transform(Transform::from_position(Vec3::new(40.0, 0.0, 0.0))).with_mesh(cube()));
        let spot = scene.add_node(
            SceneNode::new("spot")
                .with_transform(Transform::from_position(Vec3::new(0.0, 5.0, 0.0)))
                .with_light(LightFactory::spot(Vec3::new(0.0, -1.0, 0.0), Vec3::repeat(1.0), 5.0, 15.0, 0.3, 0.5)),
        );

        let camera = Camera::perspective(Vec3::new(0.0, 2.0, 10.0), 60.0, 1.0, 0.1, 100.0);
        atlas.update_allocations(&[spot], &camera, &scene, true);

        let objects = scene.collect_objects();
        let mut bvh = SceneBvh::new();
        let indices: Vec<usize> = (0..objects.len()).collect();
        bvh.build(&indices, |i| objects[i].bounds);

        let mut pass = ShadowPass::new();
        let stats = pass.execute(&mut ctx, &atlas, &bvh, &objects).unwrap();
        assert_eq!((stats.passes, stats.views, stats.draw_calls, stats.instances), (1, 1, 1, 1));

        let allocation = &atlas.allocations(spot).unwrap()[0];
        let tile = allocation.pixel_rect();
        let commands = ctx.backend.commands();
        assert!(matches!(commands[0], BackendCommand::BeginDepthPass { clear_depth, .. } if clear_depth == 1.0));
        assert!(matches!(commands[1], BackendCommand::BindShader(_)));
        assert_eq!(commands[2], BackendCommand::SetViewport(tile));
        assert_eq!(commands[3], BackendCommand::SetViewProjection(allocation.view_proj));
        assert_eq!(commands[4], BackendCommand::DrawInstanced { mesh: MeshHandle(1), instances: 1 });
        assert_eq!(commands[5], BackendCommand::EndPass);
        assert_ne!(tile, Viewport::full(atlas.texture_size()));
    }

    #[test]
    fn test_no_allocations_records_nothing() {
        let mut backend = HeadlessBackend::new();
        let atlas = ShadowAtlas::new(ShadowAtlasConfig::default(), ClipSpace::default(), &mut backend).unwrap();
        let mut ctx = GraphicsContext::new(backend, GraphicsBackend::Vulkan);

        let stats = ShadowPass::new().execute(&mut ctx, &atlas, &SceneBvh::new(), &[]).unwrap();
        assert_eq!(stats, PassStats::default());
        assert!(ctx.backend.commands().is_empty());
        assert!(ctx.cache.is_empty());
    }
}
