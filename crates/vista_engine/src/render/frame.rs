//! # Frame Orchestration
//!
//! [`FrameRenderer`] owns the per-frame visibility state and drives one frame
//! in a fixed order:
//!
//! 1. Rebuild the scene BVH when the scene revision changed
//! 2. Cull the scene against the corrected camera frustum
//! 3. Allocate atlas tiles for point and spot shadow casters
//! 4. Fit the cascades to the sun and record the CSM pass
//! 5. Record the atlas shadow pass
//!
//! Physics results must already be applied to the scene before
//! [`FrameRenderer::render_frame`] is called; the BVH never sees a
//! half-updated scene.

use crate::core::config::ApplicationConfig;
use crate::render::camera::Camera;
use crate::render::context::GraphicsContext;
use crate::render::passes::{CsmPass, PassStats, ShadowPass};
use crate::render::{RenderBackend, RenderResult};
use crate::scene::{BvhStats, Frustum, Scene, SceneBvh, SceneObject};
use crate::shadows::{CsmAtlas, ShadowAtlas};

/// What one frame did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame counter, starting at 0
    pub frame_index: u64,
    /// Objects in the BVH
    pub object_count: usize,
    /// Objects passing the camera frustum
    pub visible_objects: usize,
    /// Whether the BVH was rebuilt this frame
    pub bvh_rebuilt: bool,
    /// Camera query counters
    pub culling: BvhStats,
    /// Lights holding atlas tiles
    pub shadowed_lights: usize,
    /// Atlas pass counters
    pub shadow: PassStats,
    /// Cascade pass counters (zero when there is no sun)
    pub cascades: PassStats,
}

/// Per-frame visibility and shadow driver
#[derive(Debug)]
pub struct FrameRenderer {
    bvh: SceneBvh,
    objects: Vec<SceneObject>,
    built_revision: Option<u64>,
    visible: Vec<usize>,
    atlas: ShadowAtlas,
    csm: CsmAtlas,
    shadow_pass: ShadowPass,
    csm_pass: CsmPass,
    shadows_enabled: bool,
    frame_index: u64,
}

impl FrameRenderer {
    /// Create the shadow textures on the context's backend
    pub fn new<B: RenderBackend>(ctx: &mut GraphicsContext<B>, config: &ApplicationConfig) -> RenderResult<Self> {
        let clip_space = ctx.clip_space();
        let atlas = ShadowAtlas::new(config.shadow_atlas.clone(), clip_space, &mut ctx.backend)?;
        let csm = CsmAtlas::new(config.csm.clone(), clip_space, &mut ctx.backend)?;

        Ok(Self {
            bvh: SceneBvh::with_parallel_threshold(config.culling.parallel_aabb_threshold),
            objects: Vec::new(),
            built_revision: None,
            visible: Vec::new(),
            atlas,
            csm,
            shadow_pass: ShadowPass::new(),
            csm_pass: CsmPass::new(),
            shadows_enabled: true,
            frame_index: 0,
        })
    }

    /// Run visibility and record the shadow passes for one frame
    pub fn render_frame<B: RenderBackend>(
        &mut self,
        ctx: &mut GraphicsContext<B>,
        scene: &Scene,
        camera: &Camera,
    ) -> RenderResult<FrameStats> {
        let mut stats = FrameStats {
            frame_index: self.frame_index,
            ..Default::default()
        };
        self.frame_index += 1;

        if self.built_revision != Some(scene.revision()) {
            self.objects = scene.collect_objects();
            let indices: Vec<usize> = (0..self.objects.len()).collect();
            let objects = &self.objects;
            self.bvh.build(&indices, |index| objects[index].bounds);
            self.built_revision = Some(scene.revision());
            stats.bvh_rebuilt = true;
        }
        stats.object_count = self.objects.len();

        let clip_space = ctx.clip_space();
        let view_proj = clip_space.correction() * camera.view_projection_matrix();
        let frustum = Frustum::from_matrix_with_depth(&view_proj, clip_space.depth);
        stats.culling = self.bvh.query_into(&frustum, &mut self.visible);
        self.visible.sort_unstable();
        stats.visible_objects = self.visible.len();

        let lights = scene.shadow_light_nodes();
        self.atlas.update_allocations(&lights, camera, scene, self.shadows_enabled);
        stats.shadowed_lights = self.atlas.allocated_light_count();

        if self.shadows_enabled {
            if let Some((_, sun_direction)) = scene.sun() {
                self.csm.update_cascades(camera, sun_direction);
                stats.cascades = self.csm_pass.execute(ctx, &self.csm, &self.bvh, &self.objects)?;
            }
        }

        stats.shadow = self.shadow_pass.execute(ctx, &self.atlas, &self.bvh, &self.objects)?;

        log::debug!(
            "Frame {}: {}/{} visible, {} shadowed lights, {} shadow draws",
            stats.frame_index,
            stats.visible_objects,
            stats.object_count,
            stats.shadowed_lights,
            stats.shadow.draw_calls + stats.cascades.draw_calls
        );
        Ok(stats)
    }

    /// Turn every shadow pass on or off
    pub fn set_shadows_enabled(&mut self, enabled: bool) {
        if self.shadows_enabled != enabled {
            log::info!("Shadows {}", if enabled { "enabled" } else { "disabled" });
        }
        self.shadows_enabled = enabled;
    }

    /// Whether shadows are rendered
    pub fn shadows_enabled(&self) -> bool {
        self.shadows_enabled
    }

    /// Object indices visible from the camera last frame, ascending
    pub fn visible_objects(&self) -> &[usize] {
        &self.visible
    }

    /// Object list the BVH was built over
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    /// Current scene BVH
    pub fn bvh(&self) -> &SceneBvh {
        &self.bvh
    }

    /// Point/spot shadow atlas
    pub fn atlas(&self) -> &ShadowAtlas {
        &self.atlas
    }

    /// Directional cascades
    pub fn csm(&self) -> &CsmAtlas {
        &self.csm
    }

    /// Release the shadow textures
    pub fn destroy<B: RenderBackend>(&mut self, ctx: &mut GraphicsContext<B>) -> RenderResult<()> {
        self.atlas.destroy(&mut ctx.backend)?;
        self.csm.destroy(&mut ctx.backend)?;
        Ok(())
    }
}
