//! Flat engine library.
//!
//! A script-driven 2D simulation runtime: Lua scripts create tiles and labels,
//! hook callbacks to typed events and the frame loop integrates motion,
//! resolves collisions and presents at a rate of its own.
//!
//! This module exposes the components, events, resources, systems and the
//! [`scheduler`] for use in integration tests and as a reusable library.

pub mod components;
pub mod error;
pub mod events;
pub mod math;
pub mod resources;
pub mod scheduler;
pub mod surface;
pub mod systems;
