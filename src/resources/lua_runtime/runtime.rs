//! Lua runtime core implementation.
//!
//! This module contains the `LuaRuntime` struct which manages the Lua
//! interpreter, registers the `engine` table and delivers dispatcher events
//! to script hooks.

use std::path::Path;
use std::time::Duration;

use bevy_ecs::prelude::*;
use log::{debug, error, info, warn};
use mlua::prelude::*;
use mlua::AppDataRef;

use super::context::{SimContext, context};
use super::entities::{self, Handle, LabelHandle, TileHandle};
use super::values::{Date, Stopwatch, Timer};
use crate::components::label::Label;
use crate::components::tile::{Image, Tile};
use crate::components::transform::Transform;
use crate::components::vector::Vector;
use crate::error::{EngineError, EngineResult};
use crate::events::{EventKind, EventPayload, InputAction, Protocol};
use crate::math;
use crate::resources::camera::Camera;
use crate::resources::dispatcher::Dispatcher;
use crate::resources::entities::EntityLists;
use crate::resources::gameconfig::EngineConfig;
use crate::resources::input::{BUTTON_NAMES, InputState, KEY_NAMES};
use crate::resources::network;
use crate::resources::physics::PhysicsSettings;
use crate::resources::rendergate::RenderGate;
use crate::resources::worldtime::WorldTime;
use crate::surface::WindowCmd;

/// The interpreter plus the simulation it drives.
///
/// Not `Send`: the Lua state and every hook stay on the thread that runs the
/// frame loop.
pub struct LuaRuntime {
    lua: Lua,
}

fn read_world<R>(lua: &Lua, f: impl FnOnce(&World) -> R) -> LuaResult<R> {
    let ctx = context(lua)?;
    let world = ctx.world()?;
    Ok(f(&world))
}

fn write_world<R>(lua: &Lua, f: impl FnOnce(&mut World) -> R) -> LuaResult<R> {
    let ctx = context(lua)?;
    let mut world = ctx.world_mut()?;
    Ok(f(&mut world))
}

impl LuaRuntime {
    /// Creates a runtime with a fresh simulation and registers the `engine`
    /// table.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or API registration
    /// fails.
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        let lua = Lua::new();
        lua.set_app_data(SimContext::new(config)?);

        let runtime = Self { lua };
        runtime.register_base_api()?;
        runtime.register_value_api()?;
        runtime.register_math_api()?;
        runtime.register_entity_api()?;
        runtime.register_dispatcher_api()?;
        runtime.register_input_api()?;
        runtime.register_network_api()?;
        runtime.register_state_api()?;
        runtime.register_clock_api()?;
        runtime.register_sound_api()?;
        Ok(runtime)
    }

    /// Logging, version and lifecycle functions.
    fn register_base_api(&self) -> LuaResult<()> {
        let engine = self.lua.create_table()?;

        // engine.log(message) - General purpose logging
        engine.set(
            "log",
            self.lua.create_function(|_, msg: String| {
                info!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;
        engine.set(
            "log_info",
            self.lua.create_function(|_, msg: String| {
                info!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;
        engine.set(
            "log_warn",
            self.lua.create_function(|_, msg: String| {
                warn!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;
        engine.set(
            "log_error",
            self.lua.create_function(|_, msg: String| {
                error!(target: "lua", "{}", msg);
                Ok(())
            })?,
        )?;

        engine.set("version", env!("CARGO_PKG_VERSION"))?;

        // engine.destroy() - Leave the frame loop after the current iteration
        engine.set(
            "destroy",
            self.lua.create_function(|lua, ()| {
                context(lua)?.request_stop();
                Ok(())
            })?,
        )?;
        engine.set(
            "running",
            self.lua
                .create_function(|lua, ()| Ok(!context(lua)?.stop_requested()))?,
        )?;

        self.lua.globals().set("engine", engine)?;
        Ok(())
    }

    /// Constructors for vectors, transforms, images, tiles, labels and timers.
    fn register_value_api(&self) -> LuaResult<()> {
        let engine: LuaTable = self.lua.globals().get("engine")?;

        engine.set(
            "vector",
            self.lua
                .create_function(|_, (x, y): (Option<f32>, Option<f32>)| {
                    Ok(Vector::new(x.unwrap_or(0.0), y.unwrap_or(0.0)))
                })?,
        )?;
        engine.set(
            "transform",
            self.lua.create_function(
                |_, (position, scale, rotation): (Option<Vector>, Option<Vector>, Option<f32>)| {
                    Ok(Transform::new(
                        position.unwrap_or_default(),
                        scale.unwrap_or_default(),
                        rotation.unwrap_or(0.0),
                    ))
                },
            )?,
        )?;
        // engine.image(path) - Reads dimensions now, pixels on first draw
        engine.set(
            "image",
            self.lua
                .create_function(|_, path: String| Ok(Image::open(&path)?))?,
        )?;
        engine.set(
            "tile",
            self.lua.create_function(
                |_,
                 (transform, texture, dynamic, tangible, pushable, bounciness, friction, velocity): (
                    Option<Transform>,
                    Option<Image>,
                    Option<bool>,
                    Option<bool>,
                    Option<bool>,
                    Option<f32>,
                    Option<f32>,
                    Option<Vector>,
                )| {
                    let tile = Tile::new(transform.unwrap_or_default())
                        .with_texture(texture.unwrap_or_default())
                        .with_dynamic(dynamic.unwrap_or(false))
                        .with_tangible(tangible.unwrap_or(false))
                        .with_pushable(pushable.unwrap_or(false))
                        .with_bounciness(bounciness.unwrap_or(0.0))
                        .with_friction(friction.unwrap_or(0.0))
                        .with_velocity(velocity.unwrap_or_default());
                    Ok(TileHandle::Detached(tile))
                },
            )?,
        )?;
        engine.set(
            "label",
            self.lua.create_function(
                |_, (position, scale, text, color): (Option<Vector>, Option<f32>, Option<String>, Option<u32>)| {
                    Ok(LabelHandle::Detached(Label::new(
                        position.unwrap_or_default(),
                        scale.unwrap_or(0.0),
                        text.unwrap_or_default(),
                        color.unwrap_or(0xFFFFFF),
                    )))
                },
            )?,
        )?;
        engine.set(
            "stopwatch",
            self.lua.create_function(|_, ()| Ok(Stopwatch::new()))?,
        )?;
        engine.set(
            "timer",
            self.lua
                .create_function(|_, delay: Option<f32>| Ok(Timer::new(delay.unwrap_or(0.0))))?,
        )?;
        Ok(())
    }

    /// `engine.math` and `engine.geometry`.
    fn register_math_api(&self) -> LuaResult<()> {
        let engine: LuaTable = self.lua.globals().get("engine")?;

        let m = self.lua.create_table()?;
        m.set("epsilon", f32::EPSILON)?;
        m.set("infinity", f32::INFINITY)?;
        m.set(
            "absolute",
            self.lua.create_function(|_, v: f32| Ok(math::absolute(v)))?,
        )?;
        m.set("round", self.lua.create_function(|_, v: f32| Ok(math::round(v)))?)?;
        m.set(
            "root",
            self.lua
                .create_function(|_, v: f32| Ok(math::square_root(v)?))?,
        )?;
        m.set(
            "power",
            self.lua
                .create_function(|_, (v, e): (f32, f32)| Ok(math::power(v, e)))?,
        )?;
        m.set(
            "average",
            self.lua
                .create_function(|_, (a, b): (f32, f32)| Ok(math::average(a, b)))?,
        )?;
        m.set(
            "clamp",
            self.lua.create_function(|_, (v, min, max): (f32, f32, f32)| {
                Ok(math::clamp(v, min, max)?)
            })?,
        )?;
        m.set(
            "normalize",
            self.lua
                .create_function(|_, (v, limit): (f32, f32)| Ok(math::normalize(v, limit)?))?,
        )?;
        m.set(
            "random",
            self.lua.create_function(|lua, (min, max): (f32, f32)| {
                Ok(context(lua)?.random(min, max)?)
            })?,
        )?;
        engine.set("math", m)?;

        let geometry = self.lua.create_table()?;
        geometry.set("pi", math::PI)?;
        geometry.set(
            "average",
            self.lua
                .create_function(|_, (x, y): (f32, f32)| Ok(math::geometric_average(x, y)?))?,
        )?;
        geometry.set(
            "length",
            self.lua
                .create_function(|_, (x, y): (f32, f32)| Ok(math::length(x, y)))?,
        )?;
        geometry.set(
            "angle",
            self.lua
                .create_function(|_, (x, y): (f32, f32)| Ok(math::angle(x, y)))?,
        )?;
        geometry.set(
            "sine",
            self.lua.create_function(|_, d: f32| Ok(math::sine(d)))?,
        )?;
        geometry.set(
            "cosine",
            self.lua.create_function(|_, d: f32| Ok(math::cosine(d)))?,
        )?;
        geometry.set(
            "interpolate",
            self.lua.create_function(|_, (a, b, t): (f32, f32, f32)| {
                Ok(math::interpolate(a, b, t))
            })?,
        )?;
        // Midpoint of two vectors
        geometry.set(
            "midpoint",
            self.lua
                .create_function(|_, (a, b): (Vector, Vector)| Ok(Vector::average(a, b)))?,
        )?;
        engine.set("geometry", geometry)?;
        Ok(())
    }

    /// `engine.tiles` and `engine.labels`.
    fn register_entity_api(&self) -> LuaResult<()> {
        let engine: LuaTable = self.lua.globals().get("engine")?;

        let tiles = self.lua.create_table()?;
        tiles.set(
            "add",
            self.lua
                .create_function(|lua, tile: LuaAnyUserData| entities::add_tile(lua, &tile))?,
        )?;
        tiles.set(
            "remove",
            self.lua
                .create_function(|lua, tile: LuaAnyUserData| entities::remove_tile(lua, &tile))?,
        )?;
        tiles.set(
            "get",
            self.lua.create_function(|lua, index: i64| {
                let entity = read_world(lua, |w| w.resource::<EntityLists>().tile_at(index))??;
                Ok(TileHandle::Live(entity))
            })?,
        )?;
        tiles.set(
            "count",
            self.lua.create_function(|lua, ()| {
                read_world(lua, |w| w.resource::<EntityLists>().tiles.len())
            })?,
        )?;
        tiles.set(
            "reset",
            self.lua.create_function(|lua, ()| {
                write_world(lua, crate::resources::entities::reset_tiles)
            })?,
        )?;
        engine.set("tiles", tiles)?;

        let labels = self.lua.create_table()?;
        labels.set(
            "add",
            self.lua
                .create_function(|lua, label: LuaAnyUserData| entities::add_label(lua, &label))?,
        )?;
        labels.set(
            "remove",
            self.lua.create_function(|lua, label: LuaAnyUserData| {
                entities::remove_label(lua, &label)
            })?,
        )?;
        labels.set(
            "get",
            self.lua.create_function(|lua, index: i64| {
                let entity = read_world(lua, |w| w.resource::<EntityLists>().label_at(index))??;
                Ok(LabelHandle::Live(entity))
            })?,
        )?;
        labels.set(
            "count",
            self.lua.create_function(|lua, ()| {
                read_world(lua, |w| w.resource::<EntityLists>().labels.len())
            })?,
        )?;
        labels.set(
            "reset",
            self.lua.create_function(|lua, ()| {
                write_world(lua, crate::resources::entities::reset_labels)
            })?,
        )?;
        engine.set("labels", labels)?;
        Ok(())
    }

    /// `engine.dispatcher`.
    fn register_dispatcher_api(&self) -> LuaResult<()> {
        let engine: LuaTable = self.lua.globals().get("engine")?;
        let dispatcher = self.lua.create_table()?;

        // engine.dispatcher.hook(kind, callback)
        dispatcher.set(
            "hook",
            self.lua
                .create_function(|lua, (kind, callback): (i64, LuaFunction)| {
                    let ctx = context(lua)?;
                    ctx.dispatcher_mut()?.hook_raw(kind, callback)?;
                    Ok(())
                })?,
        )?;
        dispatcher.set(
            "unhook",
            self.lua
                .create_function(|lua, (kind, callback): (i64, LuaFunction)| {
                    let kind = EventKind::from_raw(kind)?;
                    let ctx = context(lua)?;
                    let flagged = ctx.dispatcher_mut()?.unhook(kind, &callback);
                    debug!("unhooked {} {} callback(s)", flagged, kind);
                    Ok(())
                })?,
        )?;
        dispatcher.set(
            "reset",
            self.lua.create_function(|lua, ()| {
                context(lua)?.dispatcher_mut()?.reset();
                Ok(())
            })?,
        )?;
        for kind in EventKind::ALL {
            dispatcher.set(kind.name(), kind.raw())?;
        }

        engine.set("dispatcher", dispatcher)?;
        Ok(())
    }

    /// `engine.input`.
    fn register_input_api(&self) -> LuaResult<()> {
        let engine: LuaTable = self.lua.globals().get("engine")?;
        let input = self.lua.create_table()?;

        input.set("press", InputAction::Press.raw())?;
        input.set("release", InputAction::Release.raw())?;
        input.set(
            "key",
            self.lua.create_function(|lua, code: i64| {
                Ok(read_world(lua, |w| w.resource::<InputState>().key(code))??)
            })?,
        )?;
        input.set(
            "button",
            self.lua.create_function(|lua, code: i64| {
                Ok(read_world(lua, |w| w.resource::<InputState>().button(code))??)
            })?,
        )?;
        // engine.input.cursor() - Cursor position in world space
        input.set(
            "cursor",
            self.lua.create_function(|lua, ()| {
                read_world(lua, |w| w.resource::<InputState>().cursor)
            })?,
        )?;

        let keys = self.lua.create_table()?;
        for (name, code) in KEY_NAMES {
            keys.set(*name, *code)?;
        }
        for (offset, letter) in ('a'..='z').enumerate() {
            keys.set(letter.to_string(), 65 + offset as i32)?;
        }
        input.set("keys", keys)?;

        let buttons = self.lua.create_table()?;
        for (name, code) in BUTTON_NAMES {
            buttons.set(*name, *code)?;
        }
        input.set("buttons", buttons)?;

        engine.set("input", input)?;
        Ok(())
    }

    /// `engine.network`.
    fn register_network_api(&self) -> LuaResult<()> {
        let engine: LuaTable = self.lua.globals().get("engine")?;
        let net = self.lua.create_table()?;

        net.set(
            "start",
            self.lua
                .create_function(|lua, ()| Ok(context(lua)?.start_network()?))?,
        )?;
        net.set(
            "running",
            self.lua.create_function(|lua, ()| {
                let ctx = context(lua)?;
                let network = ctx.network_mut()?;
                Ok(network.as_ref().is_some_and(|n| n.running()))
            })?,
        )?;
        net.set(
            "port",
            self.lua
                .create_function(|lua, ()| Ok(context(lua)?.with_network(|n| n.port())?))?,
        )?;
        net.set(
            "destroy",
            self.lua
                .create_function(|lua, ()| Ok(context(lua)?.destroy_network()?))?,
        )?;
        // engine.network.serve(body) - Answer the pending request
        net.set(
            "serve",
            self.lua.create_function(|lua, body: String| {
                Ok(context(lua)?.with_network(|n| n.serve(&body))??)
            })?,
        )?;
        net.set(
            "request",
            self.lua.create_function(|lua, ()| {
                Ok(context(lua)?.with_network(|n| n.request().to_string())?)
            })?,
        )?;
        net.set(
            "response",
            self.lua.create_function(|lua, ()| {
                Ok(context(lua)?.with_network(|n| n.response().to_string())?)
            })?,
        )?;
        net.set(
            "client",
            self.lua.create_function(|lua, ()| {
                Ok(context(lua)?.with_network(|n| n.client().map(|c| c.ip().to_string()))?)
            })?,
        )?;
        // Outbound calls block the frame loop until the peer answers.
        net.set(
            "read",
            self.lua
                .create_function(|_, (address, port): (String, u16)| {
                    Ok(network::read(&address, port))
                })?,
        )?;
        net.set(
            "write",
            self.lua
                .create_function(|_, (address, port, body): (String, u16, String)| {
                    Ok(network::write(&address, port, &body))
                })?,
        )?;

        let protocol = self.lua.create_table()?;
        protocol.set("read", Protocol::Read.raw())?;
        protocol.set("write", Protocol::Write.raw())?;
        net.set("protocol", protocol)?;

        engine.set("network", net)?;
        Ok(())
    }

    /// Clock, render rate, gravity, camera and window state.
    fn register_state_api(&self) -> LuaResult<()> {
        let engine: LuaTable = self.lua.globals().get("engine")?;

        engine.set(
            "time",
            self.lua
                .create_function(|lua, ()| read_world(lua, |w| w.resource::<WorldTime>().elapsed))?,
        )?;
        engine.set(
            "delta_time",
            self.lua
                .create_function(|lua, ()| read_world(lua, |w| w.resource::<WorldTime>().delta))?,
        )?;
        engine.set(
            "render_time",
            self.lua.create_function(|lua, ()| {
                read_world(lua, |w| w.resource::<WorldTime>().render_delta)
            })?,
        )?;
        engine.set(
            "frames",
            self.lua
                .create_function(|lua, ()| read_world(lua, |w| w.resource::<WorldTime>().frames))?,
        )?;
        engine.set(
            "fps",
            self.lua
                .create_function(|lua, ()| read_world(lua, |w| w.resource::<RenderGate>().rate()))?,
        )?;
        engine.set(
            "set_fps",
            self.lua.create_function(|lua, rate: f32| {
                Ok(write_world(lua, |w| w.resource_mut::<RenderGate>().set_rate(rate))??)
            })?,
        )?;
        engine.set(
            "gravity",
            self.lua.create_function(|lua, ()| {
                read_world(lua, |w| w.resource::<PhysicsSettings>().gravity)
            })?,
        )?;
        engine.set(
            "set_gravity",
            self.lua.create_function(|lua, gravity: Vector| {
                write_world(lua, |w| w.resource_mut::<PhysicsSettings>().gravity = gravity)
            })?,
        )?;
        engine.set(
            "camera",
            self.lua
                .create_function(|lua, ()| read_world(lua, |w| w.resource::<Camera>().0))?,
        )?;
        // engine.view(transform) - Replace the camera
        engine.set(
            "view",
            self.lua.create_function(|lua, view: Transform| {
                write_world(lua, |w| w.resource_mut::<Camera>().0 = view)
            })?,
        )?;

        engine.set(
            "title",
            self.lua.create_function(|lua, title: String| {
                context(lua)?.push_window_command(WindowCmd::Title(title));
                Ok(())
            })?,
        )?;
        engine.set(
            "show_cursor",
            self.lua.create_function(|lua, ()| {
                context(lua)?.push_window_command(WindowCmd::ShowCursor);
                Ok(())
            })?,
        )?;
        engine.set(
            "hide_cursor",
            self.lua.create_function(|lua, ()| {
                context(lua)?.push_window_command(WindowCmd::HideCursor);
                Ok(())
            })?,
        )?;
        Ok(())
    }

    /// `engine.date` and `engine.clock`.
    fn register_clock_api(&self) -> LuaResult<()> {
        let engine: LuaTable = self.lua.globals().get("engine")?;

        engine.set(
            "date",
            self.lua.create_function(
                |_, (year, month, day, hour, minute, second): (u16, u8, u8, Option<u8>, Option<u8>, Option<u8>)| {
                    Ok(Date::new(
                        year,
                        month,
                        day,
                        hour.unwrap_or(0),
                        minute.unwrap_or(0),
                        second.unwrap_or(0),
                    )?)
                },
            )?,
        )?;

        let clock = self.lua.create_table()?;
        clock.set(
            "local_date",
            self.lua
                .create_function(|_, ()| Ok(Date::from_datetime(&chrono::Local::now())))?,
        )?;
        clock.set(
            "system_date",
            self.lua
                .create_function(|_, ()| Ok(Date::from_datetime(&chrono::Utc::now())))?,
        )?;
        // engine.clock.wait(seconds) - Blocks the frame loop
        clock.set(
            "wait",
            self.lua.create_function(|_, seconds: f32| {
                let duration = Duration::try_from_secs_f32(seconds).map_err(|_| {
                    EngineError::validation(format!("cannot wait {seconds} seconds"))
                })?;
                std::thread::sleep(duration);
                Ok(())
            })?,
        )?;
        engine.set("clock", clock)?;
        Ok(())
    }

    /// `engine.sound`. Playback happens on the surface; the file is only
    /// checked here.
    fn register_sound_api(&self) -> LuaResult<()> {
        let engine: LuaTable = self.lua.globals().get("engine")?;
        let sound = self.lua.create_table()?;

        fn start(lua: &Lua, path: String, looped: bool) -> LuaResult<()> {
            if !Path::new(&path).is_file() {
                return Err(EngineError::resource(format!("failed to play sound '{path}'")).into());
            }
            context(lua)?.push_window_command(WindowCmd::PlaySound { path, looped });
            Ok(())
        }

        sound.set(
            "play",
            self.lua
                .create_function(|lua, path: String| start(lua, path, false))?,
        )?;
        sound.set(
            "loop",
            self.lua
                .create_function(|lua, path: String| start(lua, path, true))?,
        )?;
        sound.set(
            "reset",
            self.lua.create_function(|lua, ()| {
                context(lua)?.push_window_command(WindowCmd::ResetSound);
                Ok(())
            })?,
        )?;
        engine.set("sound", sound)?;
        Ok(())
    }

    /// Runs a script file. The script's directory is prepended to
    /// `package.path` so it can `require` its siblings.
    pub fn run_script(&self, path: &Path) -> EngineResult<()> {
        let script = std::fs::read_to_string(path).map_err(|e| {
            EngineError::resource(format!("failed to read script {}: {}", path.display(), e))
        })?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            let package: LuaTable = self.lua.globals().get("package")?;
            let current: String = package.get("path")?;
            package.set("path", format!("{}/?.lua;{}", dir.display(), current))?;
        }
        self.lua
            .load(&script)
            .set_name(path.display().to_string())
            .exec()?;
        info!("Loaded script {}", path.display());
        Ok(())
    }

    /// Runs a chunk of Lua source.
    pub fn exec(&self, source: &str) -> EngineResult<()> {
        self.lua.load(source).exec()?;
        Ok(())
    }

    /// Delivers every queued event of `kind` to the script hooks of `kind`.
    ///
    /// Each kind calls its hooks with a fixed argument list:
    ///
    /// | kind | arguments |
    /// |---|---|
    /// | update, render | none |
    /// | phase | tile, tile |
    /// | collision | tile, tile, impulse |
    /// | keyboard, mouse | code, action |
    /// | network | protocol |
    ///
    /// The first hook that raises aborts the poll and its error is returned.
    pub fn poll(&self, kind: EventKind) -> EngineResult<usize> {
        let ctx = self.context()?;
        Dispatcher::poll_events(ctx.dispatcher(), kind, |callback, event| {
            let result = match *event.payload() {
                EventPayload::Update | EventPayload::Render => callback.call::<()>(()),
                EventPayload::Phase { a, b } => {
                    callback.call::<()>((Handle::<Tile>::Live(a), Handle::<Tile>::Live(b)))
                }
                EventPayload::Collision { a, b, impulse } => callback.call::<()>((
                    Handle::<Tile>::Live(a),
                    Handle::<Tile>::Live(b),
                    impulse,
                )),
                EventPayload::Keyboard { code, action } | EventPayload::Mouse { code, action } => {
                    callback.call::<()>((code, action.raw()))
                }
                EventPayload::Network { protocol } => callback.call::<()>(protocol.raw()),
            };
            result.map_err(EngineError::from)
        })
    }

    /// Queues an event for the next poll of its kind.
    pub fn send(&self, payload: EventPayload) -> EngineResult<()> {
        self.context()?.dispatcher_mut()?.send(payload);
        Ok(())
    }

    pub fn context(&self) -> EngineResult<AppDataRef<'_, SimContext>> {
        self.lua
            .app_data_ref::<SimContext>()
            .ok_or_else(|| EngineError::resource("SimContext not found"))
    }

    /// Returns a reference to the underlying Lua state.
    pub fn lua(&self) -> &Lua {
        &self.lua
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> LuaRuntime {
        LuaRuntime::new(&EngineConfig::new()).unwrap()
    }

    fn eval<T: FromLuaMulti>(runtime: &LuaRuntime, source: &str) -> T {
        runtime.lua().load(source).eval().unwrap()
    }

    // ==================== API surface ====================

    #[test]
    fn engine_table_is_registered() {
        let rt = runtime();
        let version: String = eval(&rt, "return engine.version");
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
        let kinds: (i64, i64) = eval(&rt, "return engine.dispatcher.update, engine.dispatcher.network");
        assert_eq!(kinds, (1, 7));
        let keys: (i32, i32, i32) = eval(
            &rt,
            "return engine.input.keys.a, engine.input.keys.escape, engine.input.buttons.scroll",
        );
        assert_eq!(keys, (65, 256, 8));
    }

    #[test]
    fn math_errors_are_raised_in_lua() {
        let rt = runtime();
        assert!(rt.exec("engine.math.root(-1)").is_err());
        assert!(rt.exec("engine.math.clamp(0.5, 1, 0)").is_err());
        assert!(rt.exec("engine.math.normalize(1, -1)").is_err());
        assert!(rt.exec("engine.math.random(1, 0)").is_err());
        let v: f32 = eval(&rt, "return engine.math.clamp(5, 2, 2)");
        assert_eq!(v, 2.0);
    }

    // ==================== Entities ====================

    #[test]
    fn added_tile_handle_aliases_the_entity() {
        let rt = runtime();
        rt.exec(
            "t = engine.tile(engine.transform(engine.vector(0, 0), engine.vector(1, 1), 0))
             engine.tiles.add(t)
             t.dynamic = true",
        )
        .unwrap();
        let (count, dynamic): (usize, bool) =
            eval(&rt, "return engine.tiles.count(), engine.tiles.get(1).dynamic");
        assert_eq!(count, 1);
        assert!(dynamic);
        let same: bool = eval(&rt, "return engine.tiles.get(1) == t");
        assert!(same);
    }

    #[test]
    fn removed_tile_keeps_a_detached_copy() {
        let rt = runtime();
        rt.exec(
            "t = engine.tile()
             local other = engine.tiles.add(t)
             engine.tiles.remove(t)
             t.friction = 0.5",
        )
        .unwrap();
        let (count, friction, live): (usize, f32, bool) =
            eval(&rt, "return engine.tiles.count(), t.friction, t:live()");
        assert_eq!(count, 0);
        assert_eq!(friction, 0.5);
        assert!(!live);
    }

    #[test]
    fn stale_handle_and_bad_index_are_errors() {
        let rt = runtime();
        rt.exec(
            "t = engine.tile()
             stale = engine.tiles.add(t)
             engine.tiles.reset()",
        )
        .unwrap();
        assert!(rt.exec("local _ = stale.dynamic").is_err());
        assert!(rt.exec("engine.tiles.get(1)").is_err());
        assert!(rt.exec("engine.labels.get(0)").is_err());
        assert!(rt.exec("engine.tiles.add(stale)").is_err());
    }

    #[test]
    fn labels_round_trip() {
        let rt = runtime();
        rt.exec(
            "l = engine.label(engine.vector(0, 0), 0.1, 'score', 0xFF0000)
             engine.labels.add(l)
             l.text = 'hiscore'",
        )
        .unwrap();
        let ctx = rt.context().unwrap();
        let world = ctx.world().unwrap();
        let entity = world.resource::<EntityLists>().labels[0];
        assert_eq!(world.get::<Label>(entity).unwrap().text, "hiscore");
    }

    // ==================== Dispatch ====================

    #[test]
    fn hooks_receive_typed_arguments() {
        let rt = runtime();
        rt.exec(
            "seen = {}
             engine.dispatcher.hook(engine.dispatcher.keyboard, function(code, action)
                 seen[#seen + 1] = code * 10 + action
             end)",
        )
        .unwrap();
        rt.send(EventPayload::Keyboard {
            code: 65,
            action: InputAction::Press,
        })
        .unwrap();
        assert_eq!(rt.poll(EventKind::Keyboard).unwrap(), 1);
        let first: i64 = eval(&rt, "return seen[1]");
        assert_eq!(first, 651);
    }

    #[test]
    fn collision_hook_gets_tiles_and_impulse() {
        let rt = runtime();
        rt.exec(
            "a = engine.tiles.add(engine.tile())
             b = engine.tiles.add(engine.tile())
             engine.dispatcher.hook(engine.dispatcher.collision, function(x, y, impulse)
                 hit = (x == a) and (y == b) and impulse.x
             end)",
        )
        .unwrap();
        let (a, b) = {
            let ctx = rt.context().unwrap();
            let world = ctx.world().unwrap();
            let lists = world.resource::<EntityLists>();
            (lists.tiles[0], lists.tiles[1])
        };
        rt.send(EventPayload::Collision {
            a,
            b,
            impulse: Vector::new(2.5, 0.0),
        })
        .unwrap();
        rt.poll(EventKind::Collision).unwrap();
        let hit: f32 = eval(&rt, "return hit");
        assert_eq!(hit, 2.5);
    }

    #[test]
    fn unhooked_callback_stops_firing() {
        let rt = runtime();
        rt.exec(
            "count = 0
             function tick() count = count + 1 end
             engine.dispatcher.hook(engine.dispatcher.update, tick)",
        )
        .unwrap();
        rt.send(EventPayload::Update).unwrap();
        rt.poll(EventKind::Update).unwrap();
        rt.exec("engine.dispatcher.unhook(engine.dispatcher.update, tick)")
            .unwrap();
        rt.send(EventPayload::Update).unwrap();
        assert_eq!(rt.poll(EventKind::Update).unwrap(), 0);
        let count: i64 = eval(&rt, "return count");
        assert_eq!(count, 1);
    }

    #[test]
    fn invalid_hook_kind_is_rejected() {
        let rt = runtime();
        assert!(rt.exec("engine.dispatcher.hook(0, function() end)").is_err());
        assert!(rt.exec("engine.dispatcher.hook(8, function() end)").is_err());
    }

    #[test]
    fn raising_hook_aborts_the_poll() {
        let rt = runtime();
        rt.exec(
            "ran = false
             engine.dispatcher.hook(engine.dispatcher.update, function() error('boom') end)
             engine.dispatcher.hook(engine.dispatcher.update, function() ran = true end)",
        )
        .unwrap();
        rt.send(EventPayload::Update).unwrap();
        let err = rt.poll(EventKind::Update).unwrap_err();
        assert!(matches!(err, EngineError::Script(msg) if msg.contains("boom")));
        let ran: bool = eval(&rt, "return ran");
        assert!(!ran);
    }

    // ==================== State ====================

    #[test]
    fn state_setters_validate_and_apply() {
        let rt = runtime();
        assert!(rt.exec("engine.set_fps(0)").is_err());
        rt.exec("engine.set_fps(30); engine.set_gravity(engine.vector(0, -1))")
            .unwrap();
        let (fps, gy): (f32, f32) = eval(&rt, "return engine.fps(), engine.gravity().y");
        assert_eq!((fps, gy), (30.0, -1.0));
        rt.exec("engine.title('demo'); engine.hide_cursor(); engine.destroy()")
            .unwrap();
        let ctx = rt.context().unwrap();
        assert!(ctx.stop_requested());
        assert_eq!(
            ctx.take_window_commands(),
            vec![WindowCmd::Title("demo".into()), WindowCmd::HideCursor]
        );
    }

    // ==================== Clock and sound ====================

    #[test]
    fn dates_are_built_and_compared_from_scripts() {
        let rt = runtime();
        let (before, total, text): (bool, u64, String) = eval(
            &rt,
            "local a = engine.date(2024, 5, 17, 8, 30)
             local b = engine.date(2024, 5, 17, 8, 30, 1)
             return a < b, b:total() - a:total(), tostring(a)",
        );
        assert!(before);
        assert_eq!(total, 1);
        assert_eq!(text, "(17-05-2024 08-30-00)");
        assert!(rt.exec("engine.date(2024, 13, 1)").is_err());
    }

    #[test]
    fn clock_dates_are_current() {
        let rt = runtime();
        let (year, valid): (u16, bool) = eval(
            &rt,
            "local now = engine.clock.system_date()
             local here = engine.clock.local_date()
             return now.year, here.month >= 1 and here.month <= 12",
        );
        assert!(year >= 2024);
        assert!(valid);
    }

    #[test]
    fn clock_wait_blocks_and_rejects_negative_delays() {
        let rt = runtime();
        let started = std::time::Instant::now();
        rt.exec("engine.clock.wait(0.02)").unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert!(rt.exec("engine.clock.wait(-1)").is_err());
    }

    #[test]
    fn sound_calls_become_window_commands() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("clip.wav");
        std::fs::write(&clip, b"RIFF").unwrap();

        let rt = runtime();
        rt.lua()
            .globals()
            .set("clip", clip.to_string_lossy().as_ref())
            .unwrap();
        rt.exec("engine.sound.play(clip); engine.sound.loop(clip); engine.sound.reset()")
            .unwrap();
        assert!(rt.exec("engine.sound.play('no/such/clip.wav')").is_err());

        let path = clip.to_string_lossy().into_owned();
        assert_eq!(
            rt.context().unwrap().take_window_commands(),
            vec![
                WindowCmd::PlaySound {
                    path: path.clone(),
                    looped: false,
                },
                WindowCmd::PlaySound { path, looped: true },
                WindowCmd::ResetSound,
            ]
        );
    }
}
