//! Rendering layer
//!
//! Everything between the visibility core and a concrete graphics API: the
//! narrow [`backend::RenderBackend`] draw-submission interface, the camera,
//! explicit resource caching, draw batching, the shadow and cascade passes
//! and the per-frame orchestration that ties them together.

pub mod backend;
pub mod batching;
pub mod camera;
pub mod context;
pub mod frame;
pub mod headless;
pub mod passes;
pub mod resource_cache;

#[cfg(test)]
mod frame_tests;

pub use backend::{
    ClipSpace, FramebufferHandle, MaterialHandle, MeshHandle, RenderBackend, ShaderHandle,
    TextureDesc, TextureHandle, TextureUsage, Viewport,
};
pub use batching::{build_batches, DrawBatch};
pub use camera::Camera;
pub use context::GraphicsContext;
pub use frame::{FrameRenderer, FrameStats};
pub use headless::{BackendCommand, HeadlessBackend};
pub use passes::{CsmPass, PassStats, ShadowPass};
pub use resource_cache::ResourceCache;

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur during rendering
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The graphics backend reported a failure
    ///
    /// Wraps backend-specific errors in a generic form for consistent
    /// handling across graphics APIs.
    #[error("Backend error: {0}")]
    BackendFailure(String),

    /// A texture description or texture handle was unusable
    #[error("Invalid texture: {0}")]
    InvalidTexture(String),

    /// A framebuffer was requested for a layer the texture does not have
    #[error("Layer {layer} out of range for texture with {layers} layers")]
    InvalidLayer {
        /// Requested layer
        layer: u32,
        /// Layers in the texture
        layers: u32,
    },

    /// A draw or state command was issued outside a render pass
    #[error("No render pass is active")]
    PassNotActive,

    /// A render pass was started while another one was still recording
    #[error("A render pass is already active")]
    PassAlreadyActive,

    /// A handle that the backend does not know (destroyed or never created)
    #[error("Unknown handle: {0}")]
    UnknownHandle(String),
}
