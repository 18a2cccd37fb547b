//! Background physics simulation
//!
//! The simulation runs at a fixed rate on its own thread and never shares
//! mutable state with the render side. The render loop sends
//! [`PhysicsCommand`]s and polls immutable [`PhysicsSnapshot`]s; poses from a
//! snapshot are written into the scene with [`apply_snapshot`], which bumps
//! the scene revision so the BVH is rebuilt on the next frame.

pub mod thread;
pub mod world;

use std::collections::HashMap;

use crate::foundation::math::{Quat, Vec3};
use crate::scene::{NodeId, Scene};

pub use thread::PhysicsThread;
pub use world::{PhysicsWorld, RigidBody};

/// Identifier of a simulated body
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyHandle(pub u64);

/// Request sent from the render side to the simulation
#[derive(Debug, Clone)]
pub enum PhysicsCommand {
    /// Insert a body (replaces an existing body with the same handle)
    AddBody {
        /// Handle chosen by the sender
        handle: BodyHandle,
        /// Initial state
        body: RigidBody,
    },
    /// Remove a body
    RemoveBody(BodyHandle),
    /// Teleport a body, keeping its velocity
    SetPose {
        /// Body to move
        handle: BodyHandle,
        /// New position
        position: Vec3,
        /// New orientation
        orientation: Quat,
    },
    /// Add `impulse * inverse_mass` to a body's velocity
    ApplyImpulse {
        /// Body to push
        handle: BodyHandle,
        /// Impulse in world space
        impulse: Vec3,
    },
    /// Replace the gravity vector
    SetGravity(Vec3),
    /// Stop the simulation loop
    Shutdown,
}

/// Pose of one body at the end of a step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    /// Body handle
    pub handle: BodyHandle,
    /// World position
    pub position: Vec3,
    /// World orientation
    pub orientation: Quat,
}

/// Immutable result of one simulation step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhysicsSnapshot {
    /// Steps simulated so far
    pub step: u64,
    /// Every body, ordered by handle
    pub bodies: Vec<BodyState>,
}

/// Errors from the physics thread
#[derive(Debug, thiserror::Error)]
pub enum PhysicsError {
    /// The simulation thread is gone
    #[error("Physics thread disconnected")]
    Disconnected,

    /// The simulation thread panicked
    #[error("Physics thread panicked")]
    ThreadPanicked,

    /// The configured tick rate cannot drive a fixed timestep
    #[error("Physics tick rate must be positive")]
    InvalidTickRate,

    /// The OS refused to start the thread
    #[error("Failed to spawn physics thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Write snapshot poses into the scene nodes bound to each body
///
/// Bodies without a binding and bindings to removed nodes are skipped.
/// Scale is preserved. Returns the number of nodes updated.
pub fn apply_snapshot(snapshot: &PhysicsSnapshot, bindings: &HashMap<BodyHandle, NodeId>, scene: &mut Scene) -> usize {
    let mut updated = 0;
    for state in &snapshot.bodies {
        let Some(&node) = bindings.get(&state.handle) else { continue };
        let Some(mut transform) = scene.node(node).map(|entry| entry.transform.clone()) else { continue };

        transform.position = state.position;
        transform.rotation = state.orientation;
        if scene.set_local_transform(node, transform) {
            updated += 1;
        }
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform;
    use crate::scene::SceneNode;

    #[test]
    fn test_apply_snapshot_moves_bound_nodes() {
        let mut scene = Scene::new();
        let node = scene.add_node(
            SceneNode::new("ball").with_transform(Transform::from_position(Vec3::zeros()).with_scale(Vec3::repeat(2.0))),
        );
        let bindings = HashMap::from([(BodyHandle(1), node)]);
        let snapshot = PhysicsSnapshot {
            step: 3,
            bodies: vec![
                BodyState { handle: BodyHandle(1), position: Vec3::new(1.0, 2.0, 3.0), orientation: Quat::identity() },
                BodyState { handle: BodyHandle(2), position: Vec3::zeros(), orientation: Quat::identity() },
            ],
        };

        let revision = scene.revision();
        assert_eq!(apply_snapshot(&snapshot, &bindings, &mut scene), 1);
        assert!(scene.revision() > revision);

        let transform = &scene.node(node).unwrap().transform;
        assert_eq!(transform.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(transform.scale, Vec3::repeat(2.0));
    }

    #[test]
    fn test_apply_snapshot_skips_removed_nodes() {
        let mut scene = Scene::new();
        let node = scene.add_node(SceneNode::new("gone"));
        scene.remove_node(node);
        let bindings = HashMap::from([(BodyHandle(1), node)]);
        let snapshot = PhysicsSnapshot {
            step: 1,
            bodies: vec![BodyState { handle: BodyHandle(1), position: Vec3::zeros(), orientation: Quat::identity() }],
        };

        assert_eq!(apply_snapshot(&snapshot, &bindings, &mut scene), 0);
    }
}
