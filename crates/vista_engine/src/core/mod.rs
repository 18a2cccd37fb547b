//! # Core Engine Module
//!
//! Shared configuration for every subsystem of the engine.

pub mod config;

// Re-export foundation modules for convenience
pub use crate::foundation;

// Re-export commonly used config types
pub use config::{
    ApplicationConfig,
    EngineConfig,
    CullingConfig,
    ShadowAtlasConfig,
    CsmConfig,
    PhysicsConfig,
    GraphicsBackend,
    Config,
    ConfigError,
};
