//! # Vista Engine
//!
//! Visibility and shadow core for a real-time 3D renderer.
//!
//! ## Features
//!
//! - **Frustum Culling**: Plane extraction from any view-projection, AABB tests
//! - **Scene BVH**: Median-split hierarchy rebuilt when the scene changes
//! - **Shadow Atlas**: Point and spot lights packed into a tiled depth texture array
//! - **Cascaded Shadows**: Four texel-stable cascades for the directional light
//! - **Backend Neutral**: Clip-space conventions for Vulkan, Direct3D 11, Metal and OpenGL
//! - **Physics Thread**: Fixed-rate simulation feeding poses back into the scene
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vista_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApplicationConfig::default();
//!     let mut ctx = GraphicsContext::new(HeadlessBackend::new(), config.backend);
//!     let mut renderer = FrameRenderer::new(&mut ctx, &config)?;
//!
//!     let mut scene = Scene::new();
//!     let cube = MeshInstance::new(MeshHandle(1), AABB::new(Vec3::repeat(-0.5), Vec3::repeat(0.5)));
//!     scene.add_node(SceneNode::new("cube").with_mesh(cube));
//!
//!     let stats = renderer.render_frame(&mut ctx, &scene, &Camera::default())?;
//!     println!("{} objects visible", stats.visible_objects);
//!
//!     renderer.destroy(&mut ctx)?;
//!     ctx.shutdown()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod physics;
pub mod render;
pub mod scene;
pub mod shadows;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError},
        core::config::{ApplicationConfig, GraphicsBackend},
        foundation::math::{Mat4, Quat, Transform, Vec3},
        physics::{apply_snapshot, BodyHandle, PhysicsCommand, PhysicsSnapshot, PhysicsThread, RigidBody},
        render::{
            Camera, FrameRenderer, FrameStats, GraphicsContext, HeadlessBackend, MeshHandle, RenderBackend,
            RenderError,
        },
        scene::{Frustum, LightFactory, MeshInstance, NodeId, Scene, SceneBvh, SceneNode, AABB},
        shadows::{CsmAtlas, ShadowAtlas},
    };
}
