//! Rigid body world stepped by the physics thread
//!
//! Deliberately small: gravity, a static ground plane and impulses. Bodies
//! are spheres for ground contact purposes.

use std::collections::BTreeMap;

use crate::core::config::PhysicsConfig;
use crate::foundation::math::{Quat, Vec3};
use crate::physics::{BodyHandle, BodyState, PhysicsCommand, PhysicsSnapshot};

/// Simulated body
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    /// World position of the center
    pub position: Vec3,
    /// World orientation
    pub orientation: Quat,
    /// Linear velocity
    pub linear_velocity: Vec3,
    /// Angular velocity (axis times radians per second)
    pub angular_velocity: Vec3,
    /// 1 / mass, 0 for static bodies
    pub inverse_mass: f32,
    /// Fraction of vertical speed kept when bouncing off the ground
    pub restitution: f32,
    /// Contact radius against the ground
    pub radius: f32,
}

impl RigidBody {
    /// Dynamic body with mass 1 at `position`
    pub fn dynamic(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::identity(),
            linear_velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            inverse_mass: 1.0,
            restitution: 0.5,
            radius: 0.5,
        }
    }

    /// Body that never moves
    pub fn fixed(position: Vec3) -> Self {
        Self { inverse_mass: 0.0, ..Self::dynamic(position) }
    }

    /// Set the contact radius
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    /// Set the restitution
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Set the initial velocity
    pub fn with_velocity(mut self, linear: Vec3, angular: Vec3) -> Self {
        self.linear_velocity = linear;
        self.angular_velocity = angular;
        self
    }

    fn is_static(&self) -> bool {
        self.inverse_mass <= 0.0
    }
}

/// Collection of bodies plus global parameters
#[derive(Debug, Clone)]
pub struct PhysicsWorld {
    bodies: BTreeMap<BodyHandle, RigidBody>,
    gravity: Vec3,
    ground_height: f32,
    step_count: u64,
}

impl PhysicsWorld {
    /// Empty world from configuration
    pub fn new(config: &PhysicsConfig) -> Self {
        Self {
            bodies: BTreeMap::new(),
            gravity: config.gravity,
            ground_height: config.ground_height,
            step_count: 0,
        }
    }

    /// Apply a command; returns false for [`PhysicsCommand::Shutdown`]
    pub fn apply(&mut self, command: PhysicsCommand) -> bool {
        match command {
            PhysicsCommand::AddBody { handle, body } => {
                self.bodies.insert(handle, body);
            }
            PhysicsCommand::RemoveBody(handle) => {
                self.bodies.remove(&handle);
            }
            PhysicsCommand::SetPose { handle, position, orientation } => {
                if let Some(body) = self.bodies.get_mut(&handle) {
                    body.position = position;
                    body.orientation = orientation;
                }
            }
            PhysicsCommand::ApplyImpulse { handle, impulse } => {
                if let Some(body) = self.bodies.get_mut(&handle) {
                    body.linear_velocity += impulse * body.inverse_mass;
                }
            }
            PhysicsCommand::SetGravity(gravity) => self.gravity = gravity,
            PhysicsCommand::Shutdown => return false,
        }
        true
    }

    /// Advance the simulation by `dt` seconds
    ///
    /// Semi-implicit Euler: velocity first, then position with the new
    /// velocity. Bodies below the ground are pushed back up and bounce.
    pub fn step(&mut self, dt: f32) {
        for body in self.bodies.values_mut() {
            if body.is_static() {
                continue;
            }

            body.linear_velocity += self.gravity * dt;
            body.position += body.linear_velocity * dt;

            let spin = Quat::from_scaled_axis(body.angular_velocity * dt);
            body.orientation = spin * body.orientation;

            let floor = self.ground_height + body.radius;
            if body.position.y < floor {
                body.position.y = floor;
                if body.linear_velocity.y < 0.0 {
                    body.linear_velocity.y = -body.linear_velocity.y * body.restitution;
                }
            }
        }
        self.step_count += 1;
    }

    /// Current poses
    pub fn snapshot(&self) -> PhysicsSnapshot {
        PhysicsSnapshot {
            step: self.step_count,
            bodies: self
                .bodies
                .iter()
                .map(|(&handle, body)| BodyState {
                    handle,
                    position: body.position,
                    orientation: body.orientation,
                })
                .collect(),
        }
    }

    /// Body by handle
    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(&handle)
    }

    /// Number of bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Steps taken so far
    pub fn step_count(&self) -> u64 {
        self.step_count
    }
}
