//! Tile and label handles for scripts.
//!
//! `engine.tile(...)` and `engine.label(...)` return a [`Handle`] holding a
//! detached value. Adding it to the simulation moves the value into the
//! world and turns that same handle into a live one, so every Lua reference
//! to it now reads and writes the entity. Removing it turns it back into a
//! detached copy.
//!
//! Handles returned by `get` or passed to Phase/Collision callbacks are live
//! from the start. A live handle whose entity has been removed through
//! another handle is stale: any access is a validation error.

use bevy_ecs::component::Mutable;
use bevy_ecs::prelude::*;
use mlua::prelude::*;

use super::context::context;
use crate::components::label::Label;
use crate::components::tile::{Image, Tile};
use crate::components::transform::Transform;
use crate::components::vector::Vector;
use crate::error::EngineError;
use crate::resources::entities;

#[derive(Debug, Clone)]
pub enum Handle<T> {
    Detached(T),
    Live(Entity),
}

pub type TileHandle = Handle<Tile>;
pub type LabelHandle = Handle<Label>;

fn stale() -> EngineError {
    EngineError::validation("entity handle is no longer valid")
}

impl<T: Component<Mutability = Mutable> + Clone> Handle<T> {
    pub fn entity(&self) -> Option<Entity> {
        match self {
            Self::Detached(_) => None,
            Self::Live(entity) => Some(*entity),
        }
    }

    fn read<R>(&self, lua: &Lua, f: impl FnOnce(&T) -> R) -> LuaResult<R> {
        match self {
            Self::Detached(value) => Ok(f(value)),
            Self::Live(entity) => {
                let ctx = context(lua)?;
                let world = ctx.world()?;
                let value = world.get::<T>(*entity).ok_or_else(stale)?;
                Ok(f(value))
            }
        }
    }

    fn write(&mut self, lua: &Lua, f: impl FnOnce(&mut T)) -> LuaResult<()> {
        match self {
            Self::Detached(value) => f(value),
            Self::Live(entity) => {
                let ctx = context(lua)?;
                let mut world = ctx.world_mut()?;
                let mut value = world.get_mut::<T>(*entity).ok_or_else(stale)?;
                f(&mut value);
            }
        }
        Ok(())
    }

    /// Current value, copied out of the world for live handles.
    pub fn value(&self, lua: &Lua) -> LuaResult<T> {
        self.read(lua, T::clone)
    }

    fn same(&self, other: &Self) -> bool {
        matches!((self.entity(), other.entity()), (Some(a), Some(b)) if a == b)
    }
}

macro_rules! handle_field {
    ($fields:ident, $name:literal, $($field:ident).+, $ty:ty) => {
        $fields.add_field_method_get($name, |lua, this| this.read(lua, |c| c.$($field).+.clone()));
        $fields.add_field_method_set($name, |lua, this, value: $ty| {
            this.write(lua, |c| c.$($field).+ = value)
        });
    };
}

impl LuaUserData for TileHandle {
    fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
        handle_field!(fields, "transform", transform, Transform);
        handle_field!(fields, "texture", texture, Image);
        handle_field!(fields, "dynamic", dynamic, bool);
        handle_field!(fields, "tangible", tangible, bool);
        handle_field!(fields, "pushable", pushable, bool);
        handle_field!(fields, "bounciness", bounciness, f32);
        handle_field!(fields, "friction", friction, f32);
        handle_field!(fields, "velocity", velocity, Vector);
        // Shortcut for transform.position, which is otherwise a copy.
        handle_field!(fields, "position", transform.position, Vector);
    }

    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("live", |lua, this, ()| match this {
            Handle::Detached(_) => Ok(false),
            Handle::Live(_) => Ok(this.read(lua, |_| ()).is_ok()),
        });
        methods.add_meta_function(
            LuaMetaMethod::Eq,
            |_, (a, b): (LuaUserDataRef<TileHandle>, LuaUserDataRef<TileHandle>)| Ok(a.same(&b)),
        );
        methods.add_meta_method(LuaMetaMethod::ToString, |lua, this, ()| {
            this.read(lua, |tile| tile.to_string())
        });
    }
}

impl LuaUserData for LabelHandle {
    fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
        handle_field!(fields, "position", position, Vector);
        handle_field!(fields, "scale", scale, f32);
        handle_field!(fields, "text", text, String);
        handle_field!(fields, "color", color, u32);
    }

    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_method("live", |lua, this, ()| match this {
            Handle::Detached(_) => Ok(false),
            Handle::Live(_) => Ok(this.read(lua, |_| ()).is_ok()),
        });
        methods.add_meta_function(
            LuaMetaMethod::Eq,
            |_, (a, b): (LuaUserDataRef<LabelHandle>, LuaUserDataRef<LabelHandle>)| {
                Ok(a.same(&b))
            },
        );
        methods.add_meta_method(LuaMetaMethod::ToString, |lua, this, ()| {
            this.read(lua, |label| format!("label \"{}\" at {}", label.text, label.position))
        });
    }
}

/// Moves a detached tile into the world. Returns the live handle.
pub fn add_tile(lua: &Lua, handle: &LuaAnyUserData) -> LuaResult<TileHandle> {
    let mut handle = handle.borrow_mut::<TileHandle>()?;
    let tile = match &*handle {
        Handle::Detached(tile) => tile.clone(),
        Handle::Live(_) => return Err(EngineError::validation("tile is already added").into()),
    };
    let ctx = context(lua)?;
    let entity = entities::add_tile(&mut *ctx.world_mut()?, tile);
    *handle = Handle::Live(entity);
    Ok(Handle::Live(entity))
}

/// Removes a live tile and leaves a detached copy in the handle.
pub fn remove_tile(lua: &Lua, handle: &LuaAnyUserData) -> LuaResult<()> {
    let mut handle = handle.borrow_mut::<TileHandle>()?;
    let Handle::Live(entity) = *handle else {
        return Err(EngineError::validation("tile is not added").into());
    };
    let tile = handle.value(lua)?;
    let ctx = context(lua)?;
    entities::remove_tile(&mut *ctx.world_mut()?, entity)?;
    *handle = Handle::Detached(tile);
    Ok(())
}

pub fn add_label(lua: &Lua, handle: &LuaAnyUserData) -> LuaResult<LabelHandle> {
    let mut handle = handle.borrow_mut::<LabelHandle>()?;
    let label = match &*handle {
        Handle::Detached(label) => label.clone(),
        Handle::Live(_) => return Err(EngineError::validation("label is already added").into()),
    };
    let ctx = context(lua)?;
    let entity = entities::add_label(&mut *ctx.world_mut()?, label);
    *handle = Handle::Live(entity);
    Ok(Handle::Live(entity))
}

pub fn remove_label(lua: &Lua, handle: &LuaAnyUserData) -> LuaResult<()> {
    let mut handle = handle.borrow_mut::<LabelHandle>()?;
    let Handle::Live(entity) = *handle else {
        return Err(EngineError::validation("label is not added").into());
    };
    let label = handle.value(lua)?;
    let ctx = context(lua)?;
    entities::remove_label(&mut *ctx.world_mut()?, entity)?;
    *handle = Handle::Detached(label);
    Ok(())
}
