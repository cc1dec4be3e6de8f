//! Simulated rectangular entity.
//!
//! A [`Tile`] is a [`Transform`] plus a texture reference and the physical
//! properties the physics pass reads:
//!
//! - `dynamic` – integrated every step (gravity + velocity)
//! - `tangible` – takes part in collision response; intangible tiles only phase
//! - `pushable` – may have its velocity overwritten when struck
//! - `bounciness`, `friction` – roughly in `[0, 1]`, applied on collision
//!
//! Tiles live as components in the simulation [`World`](bevy_ecs::world::World)
//! and are addressed by their generation-checked [`Entity`](bevy_ecs::entity::Entity).

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use bevy_ecs::prelude::Component;

use crate::components::transform::Transform;
use crate::components::vector::Vector;
use crate::error::{EngineError, EngineResult};

/// Reference to a texture file.
///
/// Only the dimensions are read when the image is created; pixels are uploaded
/// lazily by the render surface the first time the texture is drawn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Image {
    pub path: Arc<str>,
    pub width: u32,
    pub height: u32,
}

impl Image {
    /// Opens `path` and reads its dimensions.
    pub fn open(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            EngineError::resource(format!("failed to load image '{}': {e}", path.display()))
        })?;
        Ok(Self {
            path: Arc::from(path.to_string_lossy().as_ref()),
            width,
            height,
        })
    }

    /// A texture reference that is not backed by a file check. Used for
    /// surfaces that never decode pixels.
    pub fn unchecked(path: impl Into<Arc<str>>, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty() || self.width == 0 || self.height == 0
    }

    pub fn diagonal(&self) -> f32 {
        crate::math::length(self.width as f32, self.height as f32)
    }
}

/// How an overlapping pair is handled by the physics pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    /// Informational overlap, no response.
    Phase,
    /// Position rollback and velocity response.
    Collision,
}

#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct Tile {
    pub transform: Transform,
    pub texture: Image,
    pub dynamic: bool,
    pub tangible: bool,
    pub pushable: bool,
    pub bounciness: f32,
    pub friction: f32,
    pub velocity: Vector,
}

impl Tile {
    /// A static, intangible tile with no texture.
    pub fn new(transform: Transform) -> Self {
        Self {
            transform,
            ..Default::default()
        }
    }

    pub fn with_texture(mut self, texture: Image) -> Self {
        self.texture = texture;
        self
    }

    pub fn with_dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }

    pub fn with_tangible(mut self, tangible: bool) -> Self {
        self.tangible = tangible;
        self
    }

    pub fn with_pushable(mut self, pushable: bool) -> Self {
        self.pushable = pushable;
        self
    }

    pub fn with_bounciness(mut self, bounciness: f32) -> Self {
        self.bounciness = bounciness;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_velocity(mut self, velocity: Vector) -> Self {
        self.velocity = velocity;
        self
    }

    /// Classifies an overlapping pair.
    ///
    /// `coincident` is true when both tiles started the physics pass on
    /// identical transforms or hold identical transforms when tested. Such pairs, pairs with an intangible member and
    /// pairs where neither tile is dynamic only phase.
    pub fn classify(a: &Self, b: &Self, coincident: bool) -> ContactKind {
        if coincident || !a.tangible || !b.tangible || (!a.dynamic && !b.dynamic) {
            ContactKind::Phase
        } else {
            ContactKind::Collision
        }
    }

    /// Drawable when it has a texture and a non-degenerate box.
    pub fn is_drawable(&self) -> bool {
        !self.texture.is_empty() && self.transform.diagonal() != 0.0
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}, {}, {:.6}, {:.6}, {})",
            self.transform,
            self.texture.path,
            if self.dynamic { "dynamic" } else { "static" },
            if self.tangible { "tangible" } else { "intangible" },
            if self.pushable { "pushable" } else { "impushable" },
            self.bounciness,
            self.friction,
            self.velocity
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(dynamic: bool) -> Tile {
        Tile::new(Transform::default())
            .with_dynamic(dynamic)
            .with_tangible(true)
    }

    #[test]
    fn two_dynamic_tangible_tiles_collide() {
        assert_eq!(
            Tile::classify(&solid(true), &solid(true), false),
            ContactKind::Collision
        );
    }

    #[test]
    fn dynamic_against_static_collides() {
        assert_eq!(
            Tile::classify(&solid(true), &solid(false), false),
            ContactKind::Collision
        );
    }

    #[test]
    fn two_static_tiles_phase() {
        assert_eq!(
            Tile::classify(&solid(false), &solid(false), false),
            ContactKind::Phase
        );
    }

    #[test]
    fn intangible_member_phases() {
        let ghost = solid(true).with_tangible(false);
        assert_eq!(
            Tile::classify(&solid(true), &ghost, false),
            ContactKind::Phase
        );
        assert_eq!(
            Tile::classify(&ghost, &solid(true), false),
            ContactKind::Phase
        );
    }

    #[test]
    fn coincident_tiles_phase() {
        assert_eq!(
            Tile::classify(&solid(true), &solid(true), true),
            ContactKind::Phase
        );
    }

    #[test]
    fn missing_image_is_a_resource_error() {
        let err = Image::open("definitely/not/here.png").unwrap_err();
        assert!(matches!(err, EngineError::Resource(_)));
    }

    #[test]
    fn untextured_tile_is_not_drawable() {
        let tile = Tile::new(Transform::new(Vector::ZERO, Vector::new(1.0, 1.0), 0.0));
        assert!(!tile.is_drawable());
        let tile = tile.with_texture(Image::unchecked("ball.png", 8, 8));
        assert!(tile.is_drawable());
    }
}
