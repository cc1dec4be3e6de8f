use bevy_ecs::prelude::Resource;

use crate::components::vector::Vector;

pub const DEFAULT_GRAVITY: Vector = Vector::new(0.0, -9.82);

/// Global physics parameters read by the physics step.
#[derive(Resource, Debug, Clone, Copy)]
pub struct PhysicsSettings {
    pub gravity: Vector,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
        }
    }
}
