//! Value types and ECS components.
//!
//! Submodules overview:
//! - [`vector`] – 2D float pair used for positions, extents and velocities
//! - [`transform`] – axis-aligned box (position, scale, rotation)
//! - [`tile`] – simulated entity with physical properties and a texture
//! - [`label`] – presentation-only world-space text

pub mod label;
pub mod tile;
pub mod transform;
pub mod vector;
