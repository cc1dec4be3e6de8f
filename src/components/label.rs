use bevy_ecs::prelude::Component;

use crate::components::vector::Vector;

/// Text drawn in world space. Presentation only; physics never reads labels.
///
/// `color` is packed `0xRRGGBB`.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct Label {
    pub position: Vector,
    pub scale: f32,
    pub text: String,
    pub color: u32,
}

impl Label {
    pub fn new(position: Vector, scale: f32, text: impl Into<String>, color: u32) -> Self {
        Self {
            position,
            scale,
            text: text.into(),
            color,
        }
    }

    pub fn is_drawable(&self) -> bool {
        self.scale != 0.0 && !self.text.is_empty()
    }

    /// Splits the packed color into `(r, g, b)`.
    pub fn rgb(&self) -> (u8, u8, u8) {
        (
            (self.color >> 16 & 0xFF) as u8,
            (self.color >> 8 & 0xFF) as u8,
            (self.color & 0xFF) as u8,
        )
    }
}
