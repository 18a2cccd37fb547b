//! Shadow map allocation and projection
//!
//! - [`atlas`]: point and spot lights packed into a tiled texture array
//! - [`csm`]: four cascades for the directional light
//! - [`projection`]: the light-space math both share
//! - [`uniforms`]: GPU records handed to the shading pass

pub mod atlas;
pub mod csm;
pub mod projection;
pub mod uniforms;

pub use atlas::{AtlasPage, ShadowAllocation, ShadowAtlas};
pub use csm::{cascade_splits, Cascade, CsmAtlas, CASCADE_COUNT};
pub use uniforms::{CascadeUniform, ShadowAllocationRecord};
