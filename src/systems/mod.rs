//! Engine systems.
//!
//! Plain functions over the simulation [`World`](bevy_ecs::world::World),
//! called by the [`Scheduler`](crate::scheduler::Scheduler) in a fixed order
//! each iteration. None of them deliver events; they return payloads for the
//! scheduler to queue.
//!
//! Submodules overview
//! - [`input`] – apply raw surface input to [`crate::resources::input::InputState`]
//! - [`physics`] – integrate dynamic tiles and resolve overlaps axis by axis
//! - [`render`] – collect the draw list through the camera
//! - [`time`] – update simulation time and delta

pub mod input;
pub mod physics;
pub mod render;
pub mod time;
