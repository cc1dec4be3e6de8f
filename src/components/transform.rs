//! Axis-aligned box placement.
//!
//! A [`Transform`] is a box whose lower-left corner sits at `position` and whose
//! extents are `scale`. `rotation` (degrees) is carried for presentation only;
//! collision math ignores it.

use std::fmt;

use crate::components::vector::Vector;
use crate::error::EngineResult;
use crate::math;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transform {
    pub position: Vector,
    pub scale: Vector,
    pub rotation: f32,
}

impl Transform {
    pub const fn new(position: Vector, scale: Vector, rotation: f32) -> Self {
        Self {
            position,
            scale,
            rotation,
        }
    }

    pub fn diagonal(&self) -> f32 {
        self.scale.length()
    }

    pub fn center(&self) -> Vector {
        self.position + self.scale * 0.5
    }

    pub fn distance(a: &Self, b: &Self) -> f32 {
        (b.center() - a.center()).length()
    }

    /// Direction from `b`'s center toward `a`'s center, in degrees.
    pub fn angle(a: &Self, b: &Self) -> f32 {
        (a.center() - b.center()).angle()
    }

    /// Half-open interval overlap on both axes. Touching edges do not intersect.
    pub fn intersect(a: &Self, b: &Self) -> bool {
        a.position.x < b.position.x + b.scale.x
            && b.position.x < a.position.x + a.scale.x
            && a.position.y < b.position.y + b.scale.y
            && b.position.y < a.position.y + a.scale.y
    }

    pub fn rotate(&mut self, degrees: f32) {
        self.scale.rotate(degrees);
    }

    pub fn adjust(&mut self, diagonal: f32) {
        self.scale.adjust(diagonal);
    }

    pub fn interpolate(&mut self, other: &Self, time: f32) {
        self.position.interpolate(other.position, time);
        self.scale.interpolate(other.scale, time);
        self.rotation = math::interpolate(self.rotation, other.rotation, time);
    }

    /// Clamps the extents.
    pub fn clamp(&mut self, min: Vector, max: Vector) -> EngineResult<()> {
        self.scale.clamp(min, max)
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {:.6})", self.position, self.scale, self.rotation)
    }
}
