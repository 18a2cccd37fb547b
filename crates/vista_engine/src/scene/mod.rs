//! Scene representation and visibility structures
//!
//! Bounds, frustum extraction, the culling BVH and the node graph that feeds
//! them.

pub mod bounds;
pub mod bvh;
pub mod frustum;
pub mod light;
pub mod scene_graph;

pub use bounds::AABB;
pub use bvh::{BvhNode, BvhQuery, BvhStats, SceneBvh};
pub use frustum::{DepthRange, Frustum, Plane};
pub use light::{LightComponent, LightFactory, LightType};
pub use scene_graph::{MeshInstance, NodeId, ObjectKind, Scene, SceneNode, SceneObject, SceneQuery};
