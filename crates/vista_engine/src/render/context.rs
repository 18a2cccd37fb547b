//! Graphics context: backend plus the state that belongs to it

use crate::core::config::GraphicsBackend;
use crate::render::backend::{ClipSpace, RenderBackend};
use crate::render::resource_cache::ResourceCache;
use crate::render::RenderResult;

/// Owns a backend, its resource cache and its clip-space conventions
#[derive(Debug)]
pub struct GraphicsContext<B: RenderBackend> {
    /// Draw-submission backend
    pub backend: B,
    /// Resources created through this context
    pub cache: ResourceCache,
    clip_space: ClipSpace,
}

impl<B: RenderBackend> GraphicsContext<B> {
    /// Wrap `backend` using the conventions of `api`
    pub fn new(backend: B, api: GraphicsBackend) -> Self {
        log::info!("Graphics context created for {:?}", api);
        Self {
            backend,
            cache: ResourceCache::new(),
            clip_space: ClipSpace::from(api),
        }
    }

    /// Clip-space conventions of the backend
    pub fn clip_space(&self) -> ClipSpace {
        self.clip_space
    }

    /// Destroy cached resources and hand the backend back
    pub fn shutdown(mut self) -> RenderResult<B> {
        self.cache.clear(&mut self.backend)?;
        log::info!("Graphics context shut down");
        Ok(self.backend)
    }
}
