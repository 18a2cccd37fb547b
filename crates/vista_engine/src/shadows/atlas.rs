//! # Shadow Atlas
//!
//! Shared depth texture array for point and spot light shadows. Every array
//! layer (page) is cut into a `grid x grid` matrix of square tiles, with the
//! grid fixed per page: early pages have few large tiles, later pages many
//! small ones.
//!
//! ## Allocation
//!
//! Rebuilt from nothing every frame:
//!
//! 1. Lights are scored `intensity / max(distance², 0.01)` against the camera
//!    and sorted, highest first.
//! 2. Each light claims one tile per rendered view (six for a point light,
//!    one for a spot) from the first page, in order, with enough free tiles.
//!    Point lights never start at page 0.
//! 3. A light that fits nowhere gets no shadow this frame.
//!
//! Because placement depends only on the current frame's scores, a light can
//! move between pages when the ordering changes.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use crate::core::config::ShadowAtlasConfig;
use crate::foundation::math::{Mat4, Mat4Ext, Vec4};
use crate::render::backend::{ClipSpace, FramebufferHandle, RenderBackend, TextureDesc, TextureHandle, Viewport};
use crate::render::{Camera, RenderResult};
use crate::scene::{LightType, NodeId, SceneQuery};
use crate::shadows::projection;
use crate::shadows::uniforms::ShadowAllocationRecord;

/// Lower bound on squared distance when scoring lights
const MIN_SCORE_DISTANCE_SQ: f32 = 0.01;

/// Tile grid of one atlas layer with per-frame usage
#[derive(Debug, Clone)]
pub struct AtlasPage {
    grid: u32,
    used: Vec<bool>,
}

impl AtlasPage {
    fn new(grid: u32) -> Self {
        Self {
            grid,
            used: vec![false; (grid * grid) as usize],
        }
    }

    /// Tiles per side
    pub fn grid(&self) -> u32 {
        self.grid
    }

    /// Total number of tiles
    pub fn tile_count(&self) -> usize {
        self.used.len()
    }

    /// Tiles not yet claimed this frame
    pub fn free_tiles(&self) -> usize {
        self.used.iter().filter(|used| !**used).count()
    }

    /// Claim the first `count` free tiles in scan order
    ///
    /// Nothing is marked unless all `count` tiles are available.
    fn claim(&mut self, count: usize) -> Option<Vec<u32>> {
        let free: Vec<u32> = self
            .used
            .iter()
            .enumerate()
            .filter(|(_, used)| !**used)
            .map(|(tile, _)| tile as u32)
            .take(count)
            .collect();

        if free.len() < count {
            return None;
        }
        for &tile in &free {
            self.used[tile as usize] = true;
        }
        Some(free)
    }

    fn reset(&mut self) {
        self.used.fill(false);
    }
}

/// One rendered shadow view inside the atlas
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowAllocation {
    /// Light the view belongs to
    pub light: NodeId,
    /// Atlas array layer
    pub page_index: u32,
    /// Tile column
    pub atlas_x: u32,
    /// Tile row
    pub atlas_y: u32,
    /// Tile edge length in texels
    pub tile_size: u32,
    /// Cube face for point lights, 0 otherwise
    pub face_index: u32,
    /// Light view-projection including the backend correction
    pub view_proj: Mat4,
}

impl ShadowAllocation {
    /// Texel rectangle of the tile within its page
    pub fn pixel_rect(&self) -> Viewport {
        Viewport::new(
            self.atlas_x * self.tile_size,
            self.atlas_y * self.tile_size,
            self.tile_size,
            self.tile_size,
        )
    }

    /// Tile rectangle in UV space: `(offset_x, offset_y, scale_x, scale_y)`
    pub fn uv_rect(&self, texture_size: u32) -> Vec4 {
        let size = texture_size as f32;
        let rect = self.pixel_rect();
        Vec4::new(
            rect.x as f32 / size,
            rect.y as f32 / size,
            rect.width as f32 / size,
            rect.height as f32 / size,
        )
    }
}

/// Point/spot light shadow atlas
#[derive(Debug)]
pub struct ShadowAtlas {
    config: ShadowAtlasConfig,
    clip_space: ClipSpace,
    texture: TextureHandle,
    framebuffers: Vec<FramebufferHandle>,
    pages: Vec<AtlasPage>,
    allocations: Vec<ShadowAllocation>,
    by_light: HashMap<NodeId, Range<usize>>,
}

impl ShadowAtlas {
    /// Create the depth texture array and one framebuffer per page
    pub fn new(config: ShadowAtlasConfig, clip_space: ClipSpace, backend: &mut dyn RenderBackend) -> RenderResult<Self> {
        let layers = config.page_grids.len() as u32;
        let desc = TextureDesc::shadow_depth_array("shadow_atlas", config.texture_size, layers);
        let texture = backend.create_texture_array(&desc)?;

        let mut framebuffers = Vec::with_capacity(config.page_grids.len());
        for layer in 0..layers {
            framebuffers.push(backend.create_layer_framebuffer(texture, layer)?);
        }

        let pages = config.page_grids.iter().map(|&grid| AtlasPage::new(grid)).collect();

        log::info!(
            "Shadow atlas created: {} pages of {}x{}, grids {:?}",
            layers,
            config.texture_size,
            config.texture_size,
            config.page_grids
        );

        Ok(Self {
            config,
            clip_space,
            texture,
            framebuffers,
            pages,
            allocations: Vec::new(),
            by_light: HashMap::new(),
        })
    }

    fn clear_allocations(&mut self) {
        self.allocations.clear();
        self.by_light.clear();
        for page in &mut self.pages {
            page.reset();
        }
    }

    /// Recompute every allocation for this frame
    ///
    /// Lights that have no light component, do not cast shadows or whose
    /// transform cannot be resolved are skipped silently, as are lights for
    /// which no page has room.
    pub fn update_allocations<S: SceneQuery + ?Sized>(
        &mut self,
        lights: &[NodeId],
        camera: &Camera,
        scene: &S,
        shadows_enabled: bool,
    ) {
        self.clear_allocations();
        if !shadows_enabled {
            log::trace!("Shadows disabled, atlas cleared");
            return;
        }

        // A light listed twice still gets one set of tiles
        let mut seen = HashSet::with_capacity(lights.len());
        let mut scored: Vec<(NodeId, f32)> = lights
            .iter()
            .filter(|&&light| seen.insert(light))
            .map(|&light| (light, Self::score(light, camera, scene)))
            .collect();
        // Stable: equal scores keep caller order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let correction = self.clip_space.correction();
        let mut dropped = 0usize;

        for (light_id, score) in scored {
            let Some(light) = scene.light(light_id) else { continue };
            if !light.is_shadow_caster() {
                continue;
            }
            let Some(world) = scene.try_world_transform(light_id) else { continue };

            let needed = light.required_tiles();
            let first_page = if light.light_type == LightType::Point { 1 } else { 0 };

            let Some((page_index, tiles)) = self
                .pages
                .iter_mut()
                .enumerate()
                .skip(first_page)
                .find_map(|(index, page)| page.claim(needed).map(|tiles| (index, tiles)))
            else {
                dropped += 1;
                log::debug!("No atlas room for light {:?} ({} tiles, score {:.3})", light_id, needed, score);
                continue;
            };

            let grid = self.pages[page_index].grid;
            let tile_size = self.config.texture_size / grid;
            let position = world.translation_part();
            let near = self.config.near_plane;
            let far = projection::light_far_plane(light.range, near);

            let start = self.allocations.len();
            for (face, &tile) in tiles.iter().enumerate() {
                let view_proj = match light.light_type {
                    LightType::Point => {
                        projection::point_face_view_proj(position, face, near, far, self.config.point_fov_epsilon)
                    }
                    LightType::Spot | LightType::Directional => {
                        projection::spot_view_proj(position, light.world_direction(&world), light.outer_cone, near, far)
                    }
                };

                self.allocations.push(ShadowAllocation {
                    light: light_id,
                    page_index: page_index as u32,
                    atlas_x: tile % grid,
                    atlas_y: tile / grid,
                    tile_size,
                    face_index: face as u32,
                    view_proj: correction * view_proj,
                });
            }
            self.by_light.insert(light_id, start..self.allocations.len());

            log::trace!(
                "Light {:?} (score {:.3}) -> page {} ({} tiles of {}px)",
                light_id,
                score,
                page_index,
                tiles.len(),
                tile_size
            );
        }

        if dropped > 0 {
            log::debug!("{} shadow-casting lights did not fit in the atlas", dropped);
        }
    }

    fn score<S: SceneQuery + ?Sized>(light: NodeId, camera: &Camera, scene: &S) -> f32 {
        let Some(component) = scene.light(light) else { return 0.0 };
        let Some(world) = scene.try_world_transform(light) else { return 0.0 };
        let distance_sq = (world.translation_part() - camera.position).magnitude_squared();
        component.intensity / distance_sq.max(MIN_SCORE_DISTANCE_SQ)
    }

    /// Allocations of one light, `None` if it has no shadow this frame
    pub fn allocations(&self, light: NodeId) -> Option<&[ShadowAllocation]> {
        self.by_light.get(&light).map(|range| &self.allocations[range.clone()])
    }

    /// Every allocation in placement order
    pub fn iter_allocations(&self) -> impl Iterator<Item = &ShadowAllocation> {
        self.allocations.iter()
    }

    /// Number of lights holding a shadow this frame
    pub fn allocated_light_count(&self) -> usize {
        self.by_light.len()
    }

    /// Shader-ready records for one light
    pub fn gpu_records(&self, light: NodeId) -> Vec<ShadowAllocationRecord> {
        self.allocations(light)
            .unwrap_or_default()
            .iter()
            .map(|allocation| {
                ShadowAllocationRecord::new(
                    &allocation.view_proj,
                    allocation.uv_rect(self.config.texture_size),
                    allocation.page_index,
                    allocation.face_index,
                )
            })
            .collect()
    }

    /// Framebuffer rendering into `page`
    pub fn framebuffer(&self, page: usize) -> Option<FramebufferHandle> {
        self.framebuffers.get(page).copied()
    }

    /// Depth texture array
    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    /// Page edge length in texels
    pub fn texture_size(&self) -> u32 {
        self.config.texture_size
    }

    /// Depth range the stored view-projections use
    pub fn clip_space(&self) -> ClipSpace {
        self.clip_space
    }

    /// Number of pages
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Tile grid of a page
    pub fn page_grid(&self, page: usize) -> Option<u32> {
        self.pages.get(page).map(AtlasPage::grid)
    }

    /// Free tiles left on a page this frame
    pub fn free_tiles(&self, page: usize) -> Option<usize> {
        self.pages.get(page).map(AtlasPage::free_tiles)
    }

    /// Release the texture and framebuffers
    pub fn destroy(&mut self, backend: &mut dyn RenderBackend) -> RenderResult<()> {
        self.clear_allocations();
        for framebuffer in self.framebuffers.drain(..) {
            backend.destroy_framebuffer(framebuffer)?;
        }
        backend.destroy_texture(self.texture)?;
        log::info!("Shadow atlas destroyed");
        Ok(())
    }
}
