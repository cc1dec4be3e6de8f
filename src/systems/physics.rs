//! Physics step.
//!
//! Integrates every dynamic tile and resolves overlaps axis by axis, in the
//! order tiles were added:
//!
//! 1. `velocity += gravity * dt`
//! 2. `movement = velocity * dt`
//! 3. move along X, test against every other tile, resolve
//! 4. move along Y, test against every other tile, resolve
//!
//! Horizontal is always resolved before vertical, which gives the
//! characteristic corner behavior (a tile sliding into a corner stops on the
//! wall before it lands on the floor).
//!
//! Overlapping pairs are classified by [`Tile::classify`]. Tiles that began
//! the step on identical transforms, or that share one when tested, only
//! phase. A Phase has no physical effect. A Collision on an axis computes the
//! impulse `(A.v + B.v) / 2` on that axis, undoes A's movement on that axis,
//! hands the impulse to B when B is pushable, reflects A's velocity on that axis scaled
//! by its bounciness and damps the other axis by its friction. A pair that
//! overlaps on both axis passes produces one event per pass.
//!
//! The step does not deliver anything. It returns the Phase and Collision
//! payloads in the order they were detected so the caller can queue them
//! once the whole tile set is consistent.

use bevy_ecs::prelude::*;

use crate::components::tile::{ContactKind, Tile};
use crate::components::transform::Transform;
use crate::components::vector::Vector;
use crate::events::EventPayload;
use crate::resources::entities::EntityLists;
use crate::resources::physics::PhysicsSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

impl Axis {
    fn of(self, v: Vector) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
        }
    }

    fn of_mut(self, v: &mut Vector) -> &mut f32 {
        match self {
            Axis::X => &mut v.x,
            Axis::Y => &mut v.y,
        }
    }

    fn other(self) -> Self {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }

    fn only(self, value: f32) -> Vector {
        match self {
            Axis::X => Vector::new(value, 0.0),
            Axis::Y => Vector::new(0.0, value),
        }
    }
}

/// Advances every dynamic tile by `dt` seconds and returns the raised events.
pub fn physics_step(world: &mut World, dt: f32) -> Vec<EventPayload> {
    let gravity = world.resource::<PhysicsSettings>().gravity;
    let order = world.resource::<EntityLists>().tiles.clone();

    let mut bodies: Vec<(Entity, Tile)> = order
        .iter()
        .filter_map(|&e| world.get::<Tile>(e).map(|t| (e, t.clone())))
        .collect();
    let start: Vec<Transform> = bodies.iter().map(|(_, t)| t.transform).collect();

    let mut events = Vec::new();
    for i in 0..bodies.len() {
        if !bodies[i].1.dynamic {
            continue;
        }
        bodies[i].1.velocity += gravity * dt;
        let movement = bodies[i].1.velocity * dt;

        for axis in [Axis::X, Axis::Y] {
            *axis.of_mut(&mut bodies[i].1.transform.position) += axis.of(movement);
            resolve_axis(&mut bodies, &start, i, axis, movement, &mut events);
        }
    }

    for (entity, body) in bodies {
        if let Some(mut tile) = world.get_mut::<Tile>(entity) {
            *tile = body;
        }
    }
    events
}

fn resolve_axis(
    bodies: &mut [(Entity, Tile)],
    start: &[Transform],
    i: usize,
    axis: Axis,
    movement: Vector,
    events: &mut Vec<EventPayload>,
) {
    for j in 0..bodies.len() {
        if i == j {
            continue;
        }
        let (a_entity, b_entity) = (bodies[i].0, bodies[j].0);
        if !Transform::intersect(&bodies[i].1.transform, &bodies[j].1.transform) {
            continue;
        }
        let coincident =
            start[i] == start[j] || bodies[i].1.transform == bodies[j].1.transform;
        match Tile::classify(&bodies[i].1, &bodies[j].1, coincident) {
            ContactKind::Phase => events.push(EventPayload::Phase {
                a: a_entity,
                b: b_entity,
            }),
            ContactKind::Collision => {
                let impulse =
                    (axis.of(bodies[i].1.velocity) + axis.of(bodies[j].1.velocity)) * 0.5;
                events.push(EventPayload::Collision {
                    a: a_entity,
                    b: b_entity,
                    impulse: axis.only(impulse),
                });

                if bodies[j].1.pushable {
                    *axis.of_mut(&mut bodies[j].1.velocity) = impulse;
                }

                let a = &mut bodies[i].1;
                *axis.of_mut(&mut a.transform.position) -= axis.of(movement);
                let v = axis.of_mut(&mut a.velocity);
                *v = -*v * a.bounciness;
                let other = axis.other();
                let damping = other.of(a.velocity) * a.friction;
                *other.of_mut(&mut a.velocity) -= damping;
            }
        }
    }
}
