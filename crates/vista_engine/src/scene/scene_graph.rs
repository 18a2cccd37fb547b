//! Scene graph: node arena, hierarchy and world transforms
//!
//! Nodes live in a `SlotMap` and refer to each other only through
//! [`NodeId`] keys. The parent relation is a separate table rather than a
//! field on the child, so removing or re-parenting a subtree never leaves a
//! dangling back-reference.
//!
//! The graph is the external collaborator of the visibility core: it hands
//! out a flat object list with world bounds for the BVH and answers world
//! transform and light lookups for the shadow atlas through [`SceneQuery`].

use slotmap::{new_key_type, SecondaryMap, SlotMap};

use crate::foundation::math::{Mat4, Mat4Ext, Transform, Vec3};
use crate::render::backend::MeshHandle;
use crate::scene::light::{LightComponent, LightType};
use crate::scene::AABB;

new_key_type! {
    /// Stable handle to a scene node
    pub struct NodeId;
}

/// Renderable mesh attached to a node
#[derive(Debug, Clone, PartialEq)]
pub struct MeshInstance {
    /// Backend mesh to draw
    pub mesh: MeshHandle,
    /// Bounds in the node's local space
    pub local_bounds: AABB,
    /// Whether the instance is drawn into shadow maps
    pub cast_shadows: bool,
}

impl MeshInstance {
    /// Shadow-casting instance of `mesh`
    pub fn new(mesh: MeshHandle, local_bounds: AABB) -> Self {
        Self { mesh, local_bounds, cast_shadows: true }
    }
}

/// Single node of the scene graph
#[derive(Debug, Clone, Default)]
pub struct SceneNode {
    /// Debug name
    pub name: String,
    /// Transform relative to the parent
    pub transform: Transform,
    /// Optional renderable
    pub mesh: Option<MeshInstance>,
    /// Optional light
    pub light: Option<LightComponent>,
}

impl SceneNode {
    /// Empty node with a name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Set the local transform
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Attach a mesh
    pub fn with_mesh(mut self, mesh: MeshInstance) -> Self {
        self.mesh = Some(mesh);
        self
    }

    /// Attach a light
    pub fn with_light(mut self, light: LightComponent) -> Self {
        self.light = Some(light);
        self
    }
}

/// What a flattened scene object stands for
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectKind {
    /// Mesh instance
    Mesh {
        /// Backend mesh
        mesh: MeshHandle,
        /// Drawn into shadow maps
        cast_shadows: bool,
    },
    /// Point or spot light volume
    Light(LightType),
}

/// Entry of the flat object list shared by the BVH and the render passes
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    /// Owning node
    pub node: NodeId,
    /// Mesh or light
    pub kind: ObjectKind,
    /// World-space bounds
    pub bounds: AABB,
    /// World transform of the owning node
    pub world: Mat4,
}

impl SceneObject {
    /// Mesh handle if this object is a shadow-casting mesh
    pub fn shadow_mesh(&self) -> Option<MeshHandle> {
        match self.kind {
            ObjectKind::Mesh { mesh, cast_shadows: true } => Some(mesh),
            _ => None,
        }
    }
}

/// Narrow read-only view of the scene used by the shadow allocator
pub trait SceneQuery {
    /// World transform of a node, `None` if it cannot be resolved
    fn try_world_transform(&self, node: NodeId) -> Option<Mat4>;

    /// Light component attached to a node
    fn light(&self, node: NodeId) -> Option<&LightComponent>;
}

/// Hierarchical scene stored in a flat node arena
#[derive(Debug, Default)]
pub struct Scene {
    nodes: SlotMap<NodeId, SceneNode>,
    parents: SecondaryMap<NodeId, NodeId>,
    children: SecondaryMap<NodeId, Vec<NodeId>>,
    roots: Vec<NodeId>,
    revision: u64,
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root node
    pub fn add_node(&mut self, node: SceneNode) -> NodeId {
        let id = self.nodes.insert(node);
        self.children.insert(id, Vec::new());
        self.roots.push(id);
        self.touch();
        id
    }

    /// Add a node under `parent`, `None` if the parent does not exist
    pub fn add_child(&mut self, parent: NodeId, node: SceneNode) -> Option<NodeId> {
        if !self.nodes.contains_key(parent) {
            return None;
        }
        let id = self.nodes.insert(node);
        self.children.insert(id, Vec::new());
        self.parents.insert(id, parent);
        if let Some(siblings) = self.children.get_mut(parent) {
            siblings.push(id);
        }
        self.touch();
        Some(id)
    }

    /// Move `node` under `parent`, or to the root set when `parent` is `None`
    ///
    /// Returns false if either node is missing or the move would create a
    /// cycle.
    pub fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) -> bool {
        if !self.nodes.contains_key(node) {
            return false;
        }
        if let Some(new_parent) = parent {
            if !self.nodes.contains_key(new_parent) {
                return false;
            }
            let mut cursor = Some(new_parent);
            while let Some(ancestor) = cursor {
                if ancestor == node {
                    log::warn!("Rejected re-parenting of {:?}: would create a cycle", node);
                    return false;
                }
                cursor = self.parents.get(ancestor).copied();
            }
        }

        self.detach(node);
        match parent {
            Some(new_parent) => {
                self.parents.insert(node, new_parent);
                if let Some(siblings) = self.children.get_mut(new_parent) {
                    siblings.push(node);
                }
            }
            None => self.roots.push(node),
        }
        self.touch();
        true
    }

    /// Remove a node and its whole subtree, returning the removed node
    pub fn remove_node(&mut self, node: NodeId) -> Option<SceneNode> {
        if !self.nodes.contains_key(node) {
            return None;
        }
        self.detach(node);

        let mut stack = vec![node];
        let mut removed = None;
        while let Some(current) = stack.pop() {
            if let Some(children) = self.children.remove(current) {
                stack.extend(children);
            }
            self.parents.remove(current);
            let value = self.nodes.remove(current);
            if current == node {
                removed = value;
            }
        }
        self.touch();
        removed
    }

    fn detach(&mut self, node: NodeId) {
        match self.parents.remove(node) {
            Some(parent) => {
                if let Some(siblings) = self.children.get_mut(parent) {
                    siblings.retain(|&child| child != node);
                }
            }
            None => self.roots.retain(|&root| root != node),
        }
    }

    /// Replace a node's local transform
    pub fn set_local_transform(&mut self, node: NodeId, transform: Transform) -> bool {
        let Some(entry) = self.nodes.get_mut(node) else {
            return false;
        };
        entry.transform = transform;
        self.touch();
        true
    }

    /// Attach or replace the light on a node
    pub fn set_light(&mut self, node: NodeId, light: Option<LightComponent>) -> bool {
        let Some(entry) = self.nodes.get_mut(node) else {
            return false;
        };
        entry.light = light;
        self.touch();
        true
    }

    /// Attach or replace the mesh on a node
    pub fn set_mesh(&mut self, node: NodeId, mesh: Option<MeshInstance>) -> bool {
        let Some(entry) = self.nodes.get_mut(node) else {
            return false;
        };
        entry.mesh = mesh;
        self.touch();
        true
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Node by id
    pub fn node(&self, node: NodeId) -> Option<&SceneNode> {
        self.nodes.get(node)
    }

    /// Parent of a node, `None` for roots and missing nodes
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parents.get(node).copied()
    }

    /// Direct children of a node
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.children.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes without a parent
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the scene has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Counter bumped on every mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Product of local transforms from the root down to `node`
    pub fn world_transform(&self, node: NodeId) -> Option<Mat4> {
        let mut world = self.nodes.get(node)?.transform.to_matrix();
        let mut cursor = self.parents.get(node).copied();
        while let Some(parent) = cursor {
            world = self.nodes.get(parent)?.transform.to_matrix() * world;
            cursor = self.parents.get(parent).copied();
        }
        Some(world)
    }

    /// Every node carrying a light component
    pub fn light_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.light.is_some())
            .map(|(id, _)| id)
            .collect()
    }

    /// Enabled shadow-casting point and spot lights
    pub fn shadow_light_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, node)| {
                node.light.as_ref().is_some_and(|light| {
                    light.is_shadow_caster() && light.light_type != LightType::Directional
                })
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// First enabled shadow-casting directional light and its world direction
    pub fn sun(&self) -> Option<(NodeId, Vec3)> {
        self.nodes.iter().find_map(|(id, node)| {
            let light = node.light.as_ref()?;
            if light.light_type != LightType::Directional || !light.is_shadow_caster() {
                return None;
            }
            let world = self.world_transform(id)?;
            Some((id, light.world_direction(&world)))
        })
    }

    /// Flatten the scene into the object list consumed by the BVH
    ///
    /// Mesh instances come first, then enabled point and spot lights whose
    /// bounds are their position expanded by range. Objects whose world
    /// transform cannot be resolved are left out.
    pub fn collect_objects(&self) -> Vec<SceneObject> {
        let mut objects = Vec::new();

        for (id, node) in &self.nodes {
            let Some(instance) = &node.mesh else { continue };
            let Some(world) = self.world_transform(id) else { continue };
            objects.push(SceneObject {
                node: id,
                kind: ObjectKind::Mesh {
                    mesh: instance.mesh,
                    cast_shadows: instance.cast_shadows,
                },
                bounds: instance.local_bounds.transformed(&world),
                world,
            });
        }

        for (id, node) in &self.nodes {
            let Some(light) = &node.light else { continue };
            if !light.enabled || light.light_type == LightType::Directional {
                continue;
            }
            let Some(world) = self.world_transform(id) else { continue };
            objects.push(SceneObject {
                node: id,
                kind: ObjectKind::Light(light.light_type),
                bounds: AABB::from_center_extents(world.translation_part(), Vec3::repeat(light.range)),
                world,
            });
        }

        objects
    }
}

impl SceneQuery for Scene {
    fn try_world_transform(&self, node: NodeId) -> Option<Mat4> {
        self.world_transform(node)
    }

    fn light(&self, node: NodeId) -> Option<&LightComponent> {
        self.nodes.get(node)?.light.as_ref()
    }
}
