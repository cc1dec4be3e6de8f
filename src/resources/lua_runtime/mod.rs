//! Lua scripting runtime for Flat.
//!
//! This module provides the Lua integration layer, exposing the simulation
//! through the global `engine` table in Lua scripts.
//!
//! # Architecture
//!
//! - [`context`] - `SimContext`, the per-runtime simulation state kept in Lua app data
//! - [`values`] - vector, transform, image, stopwatch and timer userdata
//! - [`entities`] - tile and label handles
//! - [`runtime`] - `LuaRuntime`, the `engine` table and hook delivery
//!
//! # Example
//!
//! ```lua
//! engine.log("Hello from Lua!")
//!
//! local floor = engine.tile(
//!     engine.transform(engine.vector(-1, -1), engine.vector(2, 0.2), 0),
//!     engine.image("assets/floor.png"),
//!     false, true, false, 0, 0.2)
//! engine.tiles.add(floor)
//!
//! engine.dispatcher.hook(engine.dispatcher.collision, function(a, b, impulse)
//!     engine.log("hit " .. tostring(impulse))
//! end)
//! ```

mod context;
mod entities;
mod runtime;
mod values;

pub use context::SimContext;
pub use entities::{Handle, LabelHandle, TileHandle};
pub use runtime::LuaRuntime;
pub use values::{Stopwatch, Timer};
