//! # Unified Configuration System
//!
//! This module consolidates all configuration structures for the visibility
//! and shadowing core into a single, coherent system.
//!
//! ## Configuration Categories
//!
//! - **Engine Config**: Logging and debug behavior
//! - **Culling Config**: BVH build tuning
//! - **Shadow Atlas Config**: Point/spot shadow page layout
//! - **CSM Config**: Directional light cascade parameters
//! - **Physics Config**: Background simulation rate and gravity
//!
//! All structures are serializable to TOML and RON through [`Config`].

use serde::{Serialize, Deserialize};

use crate::foundation::math::Vec3;

// Re-export from the config module for compatibility
pub use crate::config::{Config, ConfigError};

/// Target graphics API; decides clip-space depth range and Y direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphicsBackend {
    /// Vulkan: depth `[0, 1]`, clip-space Y points down
    Vulkan,
    /// Direct3D 11: depth `[0, 1]`, Y up
    Direct3D11,
    /// Metal: depth `[0, 1]`, Y up
    Metal,
    /// OpenGL: depth `[-1, 1]`, Y up
    OpenGl,
}

impl Default for GraphicsBackend {
    fn default() -> Self {
        Self::Vulkan
    }
}

/// # Engine Configuration
///
/// Core engine behavior configuration including logging and debug features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Log level for the engine (`error`, `warn`, `info`, `debug`, `trace`)
    pub log_level: String,
    /// Whether to enable debug features
    pub debug_mode: bool,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            debug_mode: cfg!(debug_assertions),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// BVH build tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CullingConfig {
    /// Object count at which AABB precomputation moves to the worker pool
    pub parallel_aabb_threshold: usize,
}

impl Default for CullingConfig {
    fn default() -> Self {
        Self {
            parallel_aabb_threshold: 256,
        }
    }
}

/// # Shadow Atlas Configuration
///
/// Layout of the point/spot shadow texture array. Each entry of `page_grids`
/// is one array layer subdivided into `grid x grid` tiles; earlier pages have
/// fewer, larger tiles and are claimed by the highest-priority lights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShadowAtlasConfig {
    /// Width and height of every page in texels
    pub texture_size: u32,
    /// Tile grid dimension per page
    pub page_grids: Vec<u32>,
    /// Near plane for light projections
    pub near_plane: f32,
    /// Extra field of view added to the 90 degree cube-face frustum (radians)
    pub point_fov_epsilon: f32,
}

impl ShadowAtlasConfig {
    /// Set page grids
    pub fn with_page_grids(mut self, grids: impl Into<Vec<u32>>) -> Self {
        self.page_grids = grids.into();
        self
    }

    /// Set the page texture size
    pub fn with_texture_size(mut self, size: u32) -> Self {
        self.texture_size = size;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.texture_size == 0 {
            return Err(ConfigError::Invalid("Shadow atlas texture size must be positive".to_string()));
        }
        if self.page_grids.is_empty() {
            return Err(ConfigError::Invalid("Shadow atlas needs at least one page".to_string()));
        }
        for (page, &grid) in self.page_grids.iter().enumerate() {
            if grid == 0 || self.texture_size % grid != 0 {
                return Err(ConfigError::Invalid(format!(
                    "Page {} grid {} must be positive and divide texture size {}",
                    page, grid, self.texture_size
                )));
            }
        }
        if self.near_plane <= 0.0 {
            return Err(ConfigError::Invalid("Shadow near plane must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for ShadowAtlasConfig {
    fn default() -> Self {
        Self {
            texture_size: 2048,
            page_grids: vec![2, 2, 4, 8, 8, 16, 16, 32],
            near_plane: 0.05,
            point_fov_epsilon: 0.02,
        }
    }
}

/// # Cascaded Shadow Map Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsmConfig {
    /// Width and height of every cascade layer in texels
    pub resolution: u32,
    /// Blend between uniform (0) and logarithmic (1) split distribution
    pub lambda: f32,
    /// Camera far distance is clamped to this before splitting
    pub max_shadow_distance: f32,
}

impl CsmConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolution == 0 {
            return Err(ConfigError::Invalid("Cascade resolution must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.lambda) {
            return Err(ConfigError::Invalid(format!("Cascade lambda {} outside [0, 1]", self.lambda)));
        }
        if self.max_shadow_distance <= 0.0 {
            return Err(ConfigError::Invalid("Max shadow distance must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for CsmConfig {
    fn default() -> Self {
        Self {
            resolution: 4096,
            lambda: 0.935,
            max_shadow_distance: 150.0,
        }
    }
}

/// Background physics simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Fixed simulation rate
    pub tick_rate_hz: u32,
    /// Gravity acceleration
    pub gravity: Vec3,
    /// Height of the static ground plane
    pub ground_height: f32,
}

impl PhysicsConfig {
    /// Duration of one simulation step in seconds
    pub fn timestep(&self) -> f32 {
        1.0 / self.tick_rate_hz.max(1) as f32
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            ground_height: 0.0,
        }
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration that encompasses all engine subsystems.
/// This is the main configuration structure applications should use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Target graphics API
    pub backend: GraphicsBackend,
    /// Engine core configuration
    pub engine: EngineConfig,
    /// BVH culling configuration
    pub culling: CullingConfig,
    /// Point/spot shadow atlas configuration
    pub shadow_atlas: ShadowAtlasConfig,
    /// Directional cascade configuration
    pub csm: CsmConfig,
    /// Physics thread configuration
    pub physics: PhysicsConfig,
}

impl ApplicationConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shadow_atlas.validate()?;
        self.csm.validate()?;
        if self.physics.tick_rate_hz == 0 {
            return Err(ConfigError::Invalid("Physics tick rate must be positive".to_string()));
        }
        Ok(())
    }
}

impl Config for ApplicationConfig {}
