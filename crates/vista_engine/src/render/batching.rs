//! # Draw Batching
//!
//! Groups the objects returned by a BVH query into one instanced draw per
//! mesh. BVH traversal order is not input order, so the visible indices are
//! sorted first; batches and their instances then come out in a stable
//! order regardless of how the tree was built.

use std::collections::BTreeMap;

use crate::foundation::math::Mat4;
use crate::render::backend::MeshHandle;
use crate::scene::SceneObject;

/// All shadow-casting instances of one mesh
#[derive(Debug, Clone, PartialEq)]
pub struct DrawBatch {
    /// Mesh drawn by this batch
    pub mesh: MeshHandle,
    /// World transform per instance, in ascending object index order
    pub transforms: Vec<Mat4>,
}

/// Sort `visible` in place and group its shadow-casting meshes by handle
///
/// Indices outside `objects` and non-mesh objects (light volumes, meshes
/// that do not cast shadows) are skipped. Batches are ordered by mesh handle.
pub fn build_batches(visible: &mut [usize], objects: &[SceneObject]) -> Vec<DrawBatch> {
    visible.sort_unstable();

    let mut grouped: BTreeMap<MeshHandle, Vec<Mat4>> = BTreeMap::new();
    for &index in visible.iter() {
        let Some(object) = objects.get(index) else {
            continue;
        };
        if let Some(mesh) = object.shadow_mesh() {
            grouped.entry(mesh).or_default().push(object.world);
        }
    }

    grouped
        .into_iter()
        .map(|(mesh, transforms)| DrawBatch { mesh, transforms })
        .collect()
}
