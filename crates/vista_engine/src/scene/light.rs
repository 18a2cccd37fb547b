//! Light component attached to scene nodes
//!
//! Pure data: world position and direction are not stored here, they come
//! from the owning node's world transform. `direction` is expressed in the
//! node's local space and rotated into world space on demand.

use crate::foundation::math::{Mat4, Vec3};

/// Pure data component for lights
#[derive(Debug, Clone, PartialEq)]
pub struct LightComponent {
    /// The type of light (directional, point, or spot)
    pub light_type: LightType,
    /// RGB color values for the light (0.0 to 1.0 range)
    pub color: Vec3,
    /// Light intensity multiplier, also the shadow priority numerator
    pub intensity: f32,
    /// Direction for directional/spot lights in the node's local space
    pub direction: Vec3,
    /// Maximum range for point/spot lights; also the shadow far plane
    pub range: f32,
    /// Inner cone angle for spot lights in radians
    pub inner_cone: f32,
    /// Outer cone angle for spot lights in radians (half angle)
    pub outer_cone: f32,
    /// Whether the light is currently enabled/active
    pub enabled: bool,
    /// Whether this light should cast shadows
    pub cast_shadows: bool,
}

/// Types of lights supported by the lighting system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    /// Directional light (like sunlight) with parallel rays
    Directional,
    /// Point light that radiates in all directions from a position
    Point,
    /// Spot light that creates a cone of light from a position
    Spot,
}

impl LightComponent {
    /// Atlas tiles this light occupies: one per cube face for point lights
    pub fn required_tiles(&self) -> usize {
        match self.light_type {
            LightType::Point => 6,
            LightType::Spot | LightType::Directional => 1,
        }
    }

    /// True if the light is on and wants a shadow map
    pub fn is_shadow_caster(&self) -> bool {
        self.enabled && self.cast_shadows
    }

    /// Light direction rotated into world space by the node transform
    pub fn world_direction(&self, world: &Mat4) -> Vec3 {
        let direction = world.transform_vector(&self.direction);
        if direction.magnitude_squared() > f32::EPSILON {
            direction.normalize()
        } else {
            self.direction
        }
    }

    /// Builder-style toggle for shadow casting
    pub fn with_shadows(mut self, cast_shadows: bool) -> Self {
        self.cast_shadows = cast_shadows;
        self
    }
}

/// Factory functions for creating light components
pub struct LightFactory;

impl LightFactory {
    /// Create directional light component
    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> LightComponent {
        LightComponent {
            light_type: LightType::Directional,
            color,
            intensity,
            direction: direction.normalize(),
            range: 0.0,
            inner_cone: 0.0,
            outer_cone: 0.0,
            enabled: true,
            cast_shadows: true,
        }
    }

    /// Create point light component
    pub fn point(color: Vec3, intensity: f32, range: f32) -> LightComponent {
        LightComponent {
            light_type: LightType::Point,
            color,
            intensity,
            direction: Vec3::new(0.0, -1.0, 0.0), // Irrelevant for point lights
            range,
            inner_cone: 0.0,
            outer_cone: 0.0,
            enabled: true,
            cast_shadows: true,
        }
    }

    /// Create spot light component
    pub fn spot(
        direction: Vec3,
        color: Vec3,
        intensity: f32,
        range: f32,
        inner_cone: f32,
        outer_cone: f32,
    ) -> LightComponent {
        LightComponent {
            light_type: LightType::Spot,
            color,
            intensity,
            direction: direction.normalize(),
            range,
            inner_cone,
            outer_cone,
            enabled: true,
            cast_shadows: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4Ext, Transform};

    const EPSILON: f32 = 0.001;

    fn assert_vec3_approx_eq(a: Vec3, b: Vec3) {
        assert!((a.x - b.x).abs() < EPSILON, "X mismatch: {} != {}", a.x, b.x);
        assert!((a.y - b.y).abs() < EPSILON, "Y mismatch: {} != {}", a.y, b.y);
        assert!((a.z - b.z).abs() < EPSILON, "Z mismatch: {} != {}", a.z, b.z);
    }

    #[test]
    fn test_directional_light_normalizes_direction() {
        let light = LightFactory::directional(Vec3::new(-0.7, -1.0, 0.3), Vec3::new(1.0, 0.95, 0.9), 1.5);

        assert_vec3_approx_eq(light.direction, Vec3::new(-0.7, -1.0, 0.3).normalize());
        assert_eq!(light.light_type, LightType::Directional);
        assert!(light.is_shadow_caster());
    }

    #[test]
    fn test_required_tiles() {
        assert_eq!(LightFactory::point(Vec3::repeat(1.0), 1.0, 10.0).required_tiles(), 6);
        let spot = LightFactory::spot(Vec3::new(0.0, -1.0, 0.0), Vec3::repeat(1.0), 1.0, 10.0, 0.2, 0.4);
        assert_eq!(spot.required_tiles(), 1);
    }

    #[test]
    fn test_disabled_light_is_not_a_caster() {
        let mut light = LightFactory::point(Vec3::repeat(1.0), 1.0, 10.0);
        light.enabled = false;
        assert!(!light.is_shadow_caster());

        let light = LightFactory::point(Vec3::repeat(1.0), 1.0, 10.0).with_shadows(false);
        assert!(!light.is_shadow_caster());
    }

    #[test]
    fn test_world_direction_follows_node_rotation() {
        let spot = LightFactory::spot(Vec3::new(0.0, 0.0, -1.0), Vec3::repeat(1.0), 1.0, 10.0, 0.2, 0.4);
        // Quarter turn about Y takes -Z to -X; translation must not leak in
        let world = Mat4::new_translation(&Vec3::new(5.0, 5.0, 5.0)) * Mat4::rotation_y(std::f32::consts::FRAC_PI_2);
        assert_vec3_approx_eq(spot.world_direction(&world), Vec3::new(-1.0, 0.0, 0.0));

        let identity = Transform::identity().to_matrix();
        assert_vec3_approx_eq(spot.world_direction(&identity), Vec3::new(0.0, 0.0, -1.0));
    }
}
