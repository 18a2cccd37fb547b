//! GPU-facing shadow records
//!
//! Plain-old-data layouts uploaded for the main shading pass. Matrices are
//! stored column-major, matching nalgebra's memory order.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{Mat4, Vec4};

/// One atlas tile as seen by the lighting shader (96 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ShadowAllocationRecord {
    /// Light view-projection for this tile
    pub view_proj: [[f32; 4]; 4],
    /// Tile rectangle in atlas UV space: offset xy, scale zw
    pub uv_rect: [f32; 4],
    /// Atlas array layer
    pub page: u32,
    /// Cube face (0 for spot lights)
    pub face: u32,
    /// Pads the record to a 16 byte multiple
    pub _padding: [u32; 2],
}

impl ShadowAllocationRecord {
    /// Build a record from a view-projection and UV rectangle
    pub fn new(view_proj: &Mat4, uv_rect: Vec4, page: u32, face: u32) -> Self {
        Self {
            view_proj: (*view_proj).into(),
            uv_rect: uv_rect.into(),
            page,
            face,
            _padding: [0; 2],
        }
    }
}

/// Every cascade of the directional light (272 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CascadeUniform {
    /// View-projection per cascade
    pub view_proj: [[[f32; 4]; 4]; 4],
    /// Far split distance per cascade
    pub splits: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_layout() {
        assert_eq!(std::mem::size_of::<ShadowAllocationRecord>(), 96);
        assert_eq!(std::mem::size_of::<CascadeUniform>(), 272);
    }

    #[test]
    fn test_record_is_column_major() {
        let matrix = Mat4::new_translation(&crate::foundation::math::Vec3::new(1.0, 2.0, 3.0));
        let record = ShadowAllocationRecord::new(&matrix, Vec4::new(0.0, 0.5, 0.25, 0.25), 3, 4);

        assert_eq!(record.view_proj[3], [1.0, 2.0, 3.0, 1.0]);
        let bytes = bytemuck::bytes_of(&record);
        assert_eq!(bytes.len(), 96);
        assert_eq!(bytemuck::cast_slice::<u8, u32>(&bytes[80..88]), &[3, 4]);
    }
}
