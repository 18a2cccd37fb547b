//! Recording backend without a GPU
//!
//! Validates the same contract a real backend enforces (live handles, layer
//! ranges, pass nesting) and records every accepted command so tests and the
//! demo can inspect what a frame would have submitted.

use std::collections::HashMap;

use crate::foundation::math::Mat4;
use crate::render::backend::{
    FramebufferHandle, MaterialHandle, MeshHandle, RenderBackend, ShaderHandle, TextureDesc,
    TextureHandle, Viewport,
};
use crate::render::{RenderError, RenderResult};

/// Command accepted by the [`HeadlessBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    /// Depth pass started on a framebuffer
    BeginDepthPass {
        /// Target framebuffer
        framebuffer: FramebufferHandle,
        /// Clear value
        clear_depth: f32,
    },
    /// Viewport changed
    SetViewport(Viewport),
    /// Shader bound
    BindShader(ShaderHandle),
    /// View-projection changed
    SetViewProjection(Mat4),
    /// Instanced draw
    DrawInstanced {
        /// Mesh drawn
        mesh: MeshHandle,
        /// Number of instances
        instances: usize,
    },
    /// Pass finished
    EndPass,
}

#[derive(Debug, Clone, Copy)]
struct FramebufferTarget {
    texture: TextureHandle,
    layer: u32,
    width: u32,
    height: u32,
}

/// Backend that records commands instead of executing them
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_handle: u64,
    textures: HashMap<TextureHandle, TextureDesc>,
    framebuffers: HashMap<FramebufferHandle, FramebufferTarget>,
    shaders: HashMap<ShaderHandle, String>,
    materials: HashMap<MaterialHandle, u64>,
    active_pass: Option<FramebufferHandle>,
    commands: Vec<BackendCommand>,
}

impl HeadlessBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn require_pass(&self) -> RenderResult<FramebufferTarget> {
        let framebuffer = self.active_pass.ok_or(RenderError::PassNotActive)?;
        self.framebuffers
            .get(&framebuffer)
            .copied()
            .ok_or_else(|| RenderError::UnknownHandle(format!("{:?}", framebuffer)))
    }

    /// Every command recorded since the last [`HeadlessBackend::take_commands`]
    pub fn commands(&self) -> &[BackendCommand] {
        &self.commands
    }

    /// Drain the recorded commands
    pub fn take_commands(&mut self) -> Vec<BackendCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Number of recorded instanced draws
    pub fn draw_call_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, BackendCommand::DrawInstanced { .. }))
            .count()
    }

    /// Description of a live texture
    pub fn texture_desc(&self, texture: TextureHandle) -> Option<&TextureDesc> {
        self.textures.get(&texture)
    }

    /// Texture and layer a live framebuffer renders into
    pub fn framebuffer_target(&self, framebuffer: FramebufferHandle) -> Option<(TextureHandle, u32)> {
        self.framebuffers.get(&framebuffer).map(|target| (target.texture, target.layer))
    }

    /// Number of live textures
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Number of live framebuffers
    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers.len()
    }

    /// Number of live shaders
    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    /// Number of live material resource sets
    pub fn live_materials(&self) -> usize {
        self.materials.len()
    }

    /// True while a pass is recording
    pub fn is_pass_active(&self) -> bool {
        self.active_pass.is_some()
    }
}

impl RenderBackend for HeadlessBackend {
    fn create_texture_array(&mut self, desc: &TextureDesc) -> RenderResult<TextureHandle> {
        if desc.width == 0 || desc.height == 0 || desc.array_layers == 0 {
            return Err(RenderError::InvalidTexture(format!(
                "'{}' has zero extent ({}x{}, {} layers)",
                desc.label, desc.width, desc.height, desc.array_layers
            )));
        }
        let handle = TextureHandle(self.allocate_id());
        self.textures.insert(handle, desc.clone());
        log::debug!("Created texture '{}' {:?} ({}x{}x{})", desc.label, handle, desc.width, desc.height, desc.array_layers);
        Ok(handle)
    }

    fn create_layer_framebuffer(&mut self, texture: TextureHandle, layer: u32) -> RenderResult<FramebufferHandle> {
        let desc = self
            .textures
            .get(&texture)
            .ok_or_else(|| RenderError::InvalidTexture(format!("{:?} does not exist", texture)))?;
        if layer >= desc.array_layers {
            return Err(RenderError::InvalidLayer { layer, layers: desc.array_layers });
        }
        let target = FramebufferTarget { texture, layer, width: desc.width, height: desc.height };
        let handle = FramebufferHandle(self.allocate_id());
        self.framebuffers.insert(handle, target);
        Ok(handle)
    }

    fn create_shader(&mut self, name: &str) -> RenderResult<ShaderHandle> {
        let handle = ShaderHandle(self.allocate_id());
        self.shaders.insert(handle, name.to_string());
        Ok(handle)
    }

    fn create_material_resources(&mut self, material_id: u64) -> RenderResult<MaterialHandle> {
        let handle = MaterialHandle(self.allocate_id());
        self.materials.insert(handle, material_id);
        Ok(handle)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) -> RenderResult<()> {
        if self.framebuffers.values().any(|target| target.texture == texture) {
            return Err(RenderError::BackendFailure(format!("{:?} still has framebuffers attached", texture)));
        }
        self.textures
            .remove(&texture)
            .map(|_| ())
            .ok_or_else(|| RenderError::UnknownHandle(format!("{:?}", texture)))
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle) -> RenderResult<()> {
        if self.active_pass == Some(framebuffer) {
            return Err(RenderError::BackendFailure(format!("{:?} is being rendered to", framebuffer)));
        }
        self.framebuffers
            .remove(&framebuffer)
            .map(|_| ())
            .ok_or_else(|| RenderError::UnknownHandle(format!("{:?}", framebuffer)))
    }

    fn destroy_shader(&mut self, shader: ShaderHandle) -> RenderResult<()> {
        self.shaders
            .remove(&shader)
            .map(|_| ())
            .ok_or_else(|| RenderError::UnknownHandle(format!("{:?}", shader)))
    }

    fn destroy_material_resources(&mut self, material: MaterialHandle) -> RenderResult<()> {
        self.materials
            .remove(&material)
            .map(|_| ())
            .ok_or_else(|| RenderError::UnknownHandle(format!("{:?}", material)))
    }

    fn begin_depth_pass(&mut self, framebuffer: FramebufferHandle, clear_depth: f32) -> RenderResult<()> {
        if self.active_pass.is_some() {
            return Err(RenderError::PassAlreadyActive);
        }
        if !self.framebuffers.contains_key(&framebuffer) {
            return Err(RenderError::UnknownHandle(format!("{:?}", framebuffer)));
        }
        self.active_pass = Some(framebuffer);
        self.commands.push(BackendCommand::BeginDepthPass { framebuffer, clear_depth });
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> RenderResult<()> {
        let target = self.require_pass()?;
        if viewport.x + viewport.width > target.width || viewport.y + viewport.height > target.height {
            return Err(RenderError::BackendFailure(format!(
                "{:?} exceeds {}x{} target",
                viewport, target.width, target.height
            )));
        }
        self.commands.push(BackendCommand::SetViewport(viewport));
        Ok(())
    }

    fn bind_shader(&mut self, shader: ShaderHandle) -> RenderResult<()> {
        self.require_pass()?;
        if !self.shaders.contains_key(&shader) {
            return Err(RenderError::UnknownHandle(format!("{:?}", shader)));
        }
        self.commands.push(BackendCommand::BindShader(shader));
        Ok(())
    }

    fn set_view_projection(&mut self, view_proj: &Mat4) -> RenderResult<()> {
        self.require_pass()?;
        self.commands.push(BackendCommand::SetViewProjection(*view_proj));
        Ok(())
    }

    fn draw_mesh_instanced(&mut self, mesh: MeshHandle, transforms: &[Mat4]) -> RenderResult<()> {
        self.require_pass()?;
        if transforms.is_empty() {
            return Ok(());
        }
        self.commands.push(BackendCommand::DrawInstanced { mesh, instances: transforms.len() });
        Ok(())
    }

    fn end_pass(&mut self) -> RenderResult<()> {
        self.require_pass()?;
        self.active_pass = None;
        self.commands.push(BackendCommand::EndPass);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_out_of_range() {
        let mut backend = HeadlessBackend::new();
        let texture = backend.create_texture_array(&TextureDesc::shadow_depth_array("csm", 512, 4)).unwrap();

        assert!(backend.create_layer_framebuffer(texture, 3).is_ok());
        assert!(matches!(
            backend.create_layer_framebuffer(texture, 4),
            Err(RenderError::InvalidLayer { layer: 4, layers: 4 })
        ));
    }

    #[test]
    fn test_zero_sized_texture_rejected() {
        let mut backend = HeadlessBackend::new();
        let result = backend.create_texture_array(&TextureDesc::shadow_depth_array("empty", 0, 1));
        assert!(matches!(result, Err(RenderError::InvalidTexture(_))));
    }

    #[test]
    fn test_pass_state_is_enforced() {
        let mut backend = HeadlessBackend::new();
        let texture = backend.create_texture_array(&TextureDesc::shadow_depth_array("t", 256, 1)).unwrap();
        let framebuffer = backend.create_layer_framebuffer(texture, 0).unwrap();

        assert!(matches!(backend.set_viewport(Viewport::full(256)), Err(RenderError::PassNotActive)));
        assert!(matches!(backend.end_pass(), Err(RenderError::PassNotActive)));

        backend.begin_depth_pass(framebuffer, 1.0).unwrap();
        assert!(matches!(backend.begin_depth_pass(framebuffer, 1.0), Err(RenderError::PassAlreadyActive)));
        assert!(backend.set_viewport(Viewport::new(128, 128, 256, 256)).is_err());
        backend.set_viewport(Viewport::new(128, 128, 128, 128)).unwrap();
        backend.draw_mesh_instanced(MeshHandle(3), &[Mat4::identity(), Mat4::identity()]).unwrap();
        backend.end_pass().unwrap();

        assert_eq!(backend.draw_call_count(), 1);
        assert_eq!(
            backend.commands().last(),
            Some(&BackendCommand::EndPass)
        );
    }

    #[test]
    fn test_teardown_order() {
        let mut backend = HeadlessBackend::new();
        let texture = backend.create_texture_array(&TextureDesc::shadow_depth_array("t", 64, 2)).unwrap();
        let framebuffer = backend.create_layer_framebuffer(texture, 1).unwrap();

        assert!(backend.destroy_texture(texture).is_err());
        backend.destroy_framebuffer(framebuffer).unwrap();
        backend.destroy_texture(texture).unwrap();
        assert!(matches!(backend.destroy_texture(texture), Err(RenderError::UnknownHandle(_))));
        assert_eq!(backend.live_textures(), 0);
        assert_eq!(backend.live_framebuffers(), 0);
    }
}
