//! Shared view resource.
//!
//! The camera is a [`Transform`] in world space: `position` is the lower-left
//! corner of the visible area and `scale` its extents. The default view shows
//! `[-1, 1]` on both axes.

use bevy_ecs::prelude::Resource;

use crate::components::transform::Transform;
use crate::components::vector::Vector;

#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct Camera(pub Transform);

impl Default for Camera {
    fn default() -> Self {
        Self(Transform::new(
            Vector::new(-1.0, -1.0),
            Vector::new(2.0, 2.0),
            0.0,
        ))
    }
}
