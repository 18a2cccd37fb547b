//! Shader and material resource cache
//!
//! Owned by a [`crate::render::GraphicsContext`] and handed to whoever needs
//! a shader or material resource set. There is no process-wide registry, so
//! two contexts never share handles and teardown order is explicit.

use std::collections::HashMap;

use crate::render::backend::{MaterialHandle, RenderBackend, ShaderHandle};
use crate::render::RenderResult;

/// Registry of backend resources keyed by shader name and material id
#[derive(Debug, Default)]
pub struct ResourceCache {
    /// Cache storage: shader name -> handle
    shaders: HashMap<String, ShaderHandle>,
    /// Cache storage: material id -> resource set
    materials: HashMap<u64, MaterialHandle>,
}

impl ResourceCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached shader or create it through `backend`
    pub fn get_or_create_shader(&mut self, backend: &mut dyn RenderBackend, name: &str) -> RenderResult<ShaderHandle> {
        if let Some(&shader) = self.shaders.get(name) {
            return Ok(shader);
        }
        let shader = backend.create_shader(name)?;
        log::info!("Created shader '{}' ({:?})", name, shader);
        self.shaders.insert(name.to_string(), shader);
        Ok(shader)
    }

    /// Return the cached material resource set or create it through `backend`
    pub fn get_or_create_material(&mut self, backend: &mut dyn RenderBackend, material_id: u64) -> RenderResult<MaterialHandle> {
        if let Some(&material) = self.materials.get(&material_id) {
            return Ok(material);
        }
        let material = backend.create_material_resources(material_id)?;
        log::debug!("Created resources for material {} ({:?})", material_id, material);
        self.materials.insert(material_id, material);
        Ok(material)
    }

    /// Cached shader by name
    pub fn shader(&self, name: &str) -> Option<ShaderHandle> {
        self.shaders.get(name).copied()
    }

    /// Cached material resource set by id
    pub fn material(&self, material_id: u64) -> Option<MaterialHandle> {
        self.materials.get(&material_id).copied()
    }

    /// Number of cached shaders and material sets
    pub fn len(&self) -> usize {
        self.shaders.len() + self.materials.len()
    }

    /// True if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Destroy every cached resource
    ///
    /// Keeps going after a failed destroy and returns the first error, so a
    /// single bad handle does not leak the rest.
    pub fn clear(&mut self, backend: &mut dyn RenderBackend) -> RenderResult<()> {
        let mut first_error = None;

        for (name, shader) in self.shaders.drain() {
            if let Err(e) = backend.destroy_shader(shader) {
                log::warn!("Failed to destroy shader '{}': {}", name, e);
                first_error.get_or_insert(e);
            }
        }
        for (id, material) in self.materials.drain() {
            if let Err(e) = backend.destroy_material_resources(material) {
                log::warn!("Failed to destroy material {} resources: {}", id, e);
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessBackend;

    #[test]
    fn test_shader_created_once() {
        let mut backend = HeadlessBackend::new();
        let mut cache = ResourceCache::new();

        let first = cache.get_or_create_shader(&mut backend, "shadow_depth").unwrap();
        let second = cache.get_or_create_shader(&mut backend, "shadow_depth").unwrap();
        assert_eq!(first, second);
        assert_eq!(backend.live_shaders(), 1);
        assert_eq!(cache.shader("shadow_depth"), Some(first));
    }

    #[test]
    fn test_independent_caches_do_not_share() {
        let mut backend = HeadlessBackend::new();
        let mut a = ResourceCache::new();
        let mut b = ResourceCache::new();

        let from_a = a.get_or_create_material(&mut backend, 7).unwrap();
        let from_b = b.get_or_create_material(&mut backend, 7).unwrap();
        assert_ne!(from_a, from_b);
        assert_eq!(backend.live_materials(), 2);
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut backend = HeadlessBackend::new();
        let mut cache = ResourceCache::new();
        cache.get_or_create_shader(&mut backend, "a").unwrap();
        cache.get_or_create_shader(&mut backend, "b").unwrap();
        cache.get_or_create_material(&mut backend, 1).unwrap();

        cache.clear(&mut backend).unwrap();
        assert!(cache.is_empty());
        assert_eq!(backend.live_shaders(), 0);
        assert_eq!(backend.live_materials(), 0);
    }
}
