//! Long-lived simulation state.
//!
//! This module groups the data the frame loop and the script bindings share:
//! the hook registry, the entity lists, timing, input, camera, configuration
//! and the network service. Resources that live in the simulation
//! [`World`](bevy_ecs::world::World) derive `Resource`; the rest are owned by
//! the [`SimContext`](lua_runtime::SimContext).
//!
//! Overview
//! - `camera` – world-space view transform
//! - `dispatcher` – hook registry and event queue with deferred removal
//! - `entities` – insertion-ordered tile and label handles
//! - `gameconfig` – engine settings loaded from `config.ini`
//! - `input` – held keys and buttons, cursor position
//! - `lua_runtime` – script bridge and the `engine` table
//! - `network` – request-serving thread and outbound client calls
//! - `physics` – gravity
//! - `rendergate` – render-rate countdown
//! - `worldtime` – simulation time, delta and frame count
pub mod camera;
pub mod dispatcher;
pub mod entities;
pub mod gameconfig;
pub mod input;
pub mod lua_runtime;
pub mod network;
pub mod physics;
pub mod rendergate;
pub mod worldtime;
