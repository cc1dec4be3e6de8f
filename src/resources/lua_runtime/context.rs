//! Simulation state shared by every script binding.
//!
//! One [`SimContext`] lives in the Lua state's app data. It owns the entity
//! world, the hook registry and the optional network service, so nothing in
//! the engine is global: two runtimes never see each other's tiles.
//!
//! Every field sits behind a `RefCell`. Bindings borrow for the duration of
//! one call and never across a callback, so a failed borrow means a binding
//! was re-entered from a place it should not be and is reported as a
//! validation error instead of a panic.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::time::Duration;

use bevy_ecs::prelude::*;
use log::{info, warn};
use mlua::prelude::*;
use mlua::AppDataRef;

use crate::error::{EngineError, EngineResult};
use crate::resources::camera::Camera;
use crate::resources::dispatcher::Dispatcher;
use crate::resources::entities::{self, EntityLists};
use crate::resources::gameconfig::EngineConfig;
use crate::resources::input::InputState;
use crate::resources::network::NetworkService;
use crate::resources::physics::PhysicsSettings;
use crate::resources::rendergate::RenderGate;
use crate::resources::worldtime::WorldTime;
use crate::surface::WindowCmd;

pub struct SimContext {
    world: RefCell<World>,
    dispatcher: RefCell<Dispatcher<LuaFunction>>,
    network: RefCell<Option<NetworkService>>,
    window_commands: RefCell<Vec<WindowCmd>>,
    stop_requested: Cell<bool>,
    rng: RefCell<fastrand::Rng>,
    bind_address: String,
    response_timeout: Duration,
}

impl SimContext {
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        let mut world = World::new();
        world.insert_resource(EntityLists::default());
        world.insert_resource(WorldTime::default());
        world.insert_resource(PhysicsSettings {
            gravity: config.gravity,
        });
        world.insert_resource(Camera::default());
        world.insert_resource(InputState::default());
        world.insert_resource(RenderGate::new(config.target_fps)?);

        Ok(Self {
            world: RefCell::new(world),
            dispatcher: RefCell::new(Dispatcher::new()),
            network: RefCell::new(None),
            window_commands: RefCell::new(Vec::new()),
            stop_requested: Cell::new(false),
            rng: RefCell::new(fastrand::Rng::new()),
            bind_address: config.bind_address.clone(),
            response_timeout: config.response_timeout,
        })
    }

    pub fn world(&self) -> EngineResult<Ref<'_, World>> {
        self.world
            .try_borrow()
            .map_err(|_| EngineError::validation("world is busy"))
    }

    pub fn world_mut(&self) -> EngineResult<RefMut<'_, World>> {
        self.world
            .try_borrow_mut()
            .map_err(|_| EngineError::validation("world is busy"))
    }

    /// The hook registry. Delivery goes through
    /// [`Dispatcher::poll_events`] on this cell.
    pub fn dispatcher(&self) -> &RefCell<Dispatcher<LuaFunction>> {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&self) -> EngineResult<RefMut<'_, Dispatcher<LuaFunction>>> {
        self.dispatcher
            .try_borrow_mut()
            .map_err(|_| EngineError::validation("dispatcher is busy"))
    }

    pub fn network_mut(&self) -> EngineResult<RefMut<'_, Option<NetworkService>>> {
        self.network
            .try_borrow_mut()
            .map_err(|_| EngineError::validation("network is busy"))
    }

    /// Runs `f` against the started network service.
    pub fn with_network<R>(&self, f: impl FnOnce(&mut NetworkService) -> R) -> EngineResult<R> {
        let mut network = self.network_mut()?;
        let service = network
            .as_mut()
            .ok_or_else(|| EngineError::validation("network is not started"))?;
        Ok(f(service))
    }

    /// Starts the request-serving thread. Starting twice returns the port of
    /// the running service.
    pub fn start_network(&self) -> EngineResult<u16> {
        let mut network = self.network_mut()?;
        if let Some(service) = network.as_ref() {
            warn!("Network already started on port {}", service.port());
            return Ok(service.port());
        }
        let service = NetworkService::start(&self.bind_address, self.response_timeout)?;
        let port = service.port();
        *network = Some(service);
        Ok(port)
    }

    pub fn destroy_network(&self) -> EngineResult<()> {
        if let Some(mut service) = self.network_mut()?.take() {
            service.destroy();
        }
        Ok(())
    }

    pub fn push_window_command(&self, cmd: WindowCmd) {
        self.window_commands.borrow_mut().push(cmd);
    }

    pub fn take_window_commands(&self) -> Vec<WindowCmd> {
        std::mem::take(&mut *self.window_commands.borrow_mut())
    }

    pub fn request_stop(&self) {
        self.stop_requested.set(true);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.get()
    }

    pub fn random(&self, min: f32, max: f32) -> EngineResult<f32> {
        crate::math::random(&mut self.rng.borrow_mut(), min, max)
    }

    /// Drops every hook, queued event, entity and the network service.
    pub fn teardown(&self) -> EngineResult<()> {
        self.dispatcher_mut()?.clear();
        {
            let mut world = self.world_mut()?;
            entities::reset_tiles(&mut world);
            entities::reset_labels(&mut world);
        }
        self.destroy_network()?;
        self.window_commands.borrow_mut().clear();
        info!("Simulation context torn down");
        Ok(())
    }
}

/// Fetches the context from a binding.
pub(super) fn context(lua: &Lua) -> LuaResult<AppDataRef<'_, SimContext>> {
    lua.app_data_ref::<SimContext>()
        .ok_or_else(|| LuaError::runtime("SimContext not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::tile::Tile;
    use crate::events::{EventKind, EventPayload};

    #[test]
    fn world_carries_configured_resources() {
        let mut config = EngineConfig::new();
        config.target_fps = 24.0;
        config.gravity = crate::components::vector::Vector::new(0.0, -1.0);
        let ctx = SimContext::new(&config).unwrap();
        let world = ctx.world().unwrap();
        assert_eq!(world.resource::<RenderGate>().rate(), 24.0);
        assert_eq!(world.resource::<PhysicsSettings>().gravity.y, -1.0);
    }

    #[test]
    fn nested_world_borrow_is_a_validation_error() {
        let ctx = SimContext::new(&EngineConfig::new()).unwrap();
        let _held = ctx.world_mut().unwrap();
        assert!(matches!(ctx.world(), Err(EngineError::Validation(_))));
    }

    #[test]
    fn network_calls_before_start_are_rejected() {
        let ctx = SimContext::new(&EngineConfig::new()).unwrap();
        assert!(matches!(
            ctx.with_network(|n| n.port()),
            Err(EngineError::Validation(_))
        ));
        assert!(ctx.destroy_network().is_ok());
    }

    #[test]
    fn teardown_empties_everything() {
        let lua = Lua::new();
        let ctx = SimContext::new(&EngineConfig::new()).unwrap();
        {
            let mut world = ctx.world_mut().unwrap();
            entities::add_tile(&mut world, Tile::default());
        }
        let callback = lua.create_function(|_, ()| Ok(())).unwrap();
        ctx.dispatcher_mut().unwrap().hook(EventKind::Update, callback);
        ctx.dispatcher_mut().unwrap().send(EventPayload::Update);

        ctx.teardown().unwrap();

        let dispatcher = ctx.dispatcher_mut().unwrap();
        assert_eq!(dispatcher.registered(), 0);
        assert_eq!(dispatcher.queued(EventKind::Update), 0);
        drop(dispatcher);
        assert!(ctx.world().unwrap().resource::<EntityLists>().tiles.is_empty());
    }
}
