//! Insertion-ordered entity lists.
//!
//! Tiles and labels are stored as components in the simulation
//! [`World`]. The world itself has no stable iteration order, so
//! [`EntityLists`] keeps the handles in the order scripts added them. Physics
//! walks tiles in that order and the render pass draws in that order.
//!
//! Handles are generation-checked [`Entity`] values: once a tile is removed,
//! any handle a script still holds resolves to nothing instead of to a reused
//! slot.

use bevy_ecs::prelude::*;

use crate::components::label::Label;
use crate::components::tile::Tile;
use crate::error::{EngineError, EngineResult};

#[derive(Resource, Debug, Default, Clone)]
pub struct EntityLists {
    pub tiles: Vec<Entity>,
    pub labels: Vec<Entity>,
}

impl EntityLists {
    /// Resolves a 1-based script index.
    pub fn tile_at(&self, index: i64) -> EngineResult<Entity> {
        nth(&self.tiles, index).ok_or_else(|| EngineError::validation("invalid tile index"))
    }

    /// Resolves a 1-based script index.
    pub fn label_at(&self, index: i64) -> EngineResult<Entity> {
        nth(&self.labels, index).ok_or_else(|| EngineError::validation("invalid label index"))
    }
}

fn nth(list: &[Entity], index: i64) -> Option<Entity> {
    if index < 1 {
        return None;
    }
    list.get((index - 1) as usize).copied()
}

pub fn add_tile(world: &mut World, tile: Tile) -> Entity {
    let entity = world.spawn(tile).id();
    world.resource_mut::<EntityLists>().tiles.push(entity);
    entity
}

pub fn remove_tile(world: &mut World, entity: Entity) -> EngineResult<()> {
    if world.get::<Tile>(entity).is_none() {
        return Err(EngineError::validation("tile is not in the world"));
    }
    world.resource_mut::<EntityLists>().tiles.retain(|e| *e != entity);
    world.despawn(entity);
    Ok(())
}

pub fn reset_tiles(world: &mut World) {
    let tiles = std::mem::take(&mut world.resource_mut::<EntityLists>().tiles);
    for entity in tiles {
        world.despawn(entity);
    }
}

pub fn add_label(world: &mut World, label: Label) -> Entity {
    let entity = world.spawn(label).id();
    world.resource_mut::<EntityLists>().labels.push(entity);
    entity
}

pub fn remove_label(world: &mut World, entity: Entity) -> EngineResult<()> {
    if world.get::<Label>(entity).is_none() {
        return Err(EngineError::validation("label is not in the world"));
    }
    world.resource_mut::<EntityLists>().labels.retain(|e| *e != entity);
    world.despawn(entity);
    Ok(())
}

pub fn reset_labels(world: &mut World) {
    let labels = std::mem::take(&mut world.resource_mut::<EntityLists>().labels);
    for entity in labels {
        world.despawn(entity);
    }
}
