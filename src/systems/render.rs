//! Frame collection.
//!
//! Walks the tile and label lists in insertion order and maps them through
//! the [`Camera`] into a screen-space [`Frame`] the surface can draw without
//! touching the world. Tiles outside the camera view are culled.
//!
//! World space has `+Y` up; screen space has the origin top-left and `+Y`
//! down.

use bevy_ecs::prelude::*;

use crate::components::label::Label;
use crate::components::tile::Tile;
use crate::components::transform::Transform;
use crate::components::vector::Vector;
use crate::resources::camera::Camera;
use crate::resources::entities::EntityLists;
use crate::surface::{Frame, ScreenRect, SpriteDraw, TextDraw};

/// Maps a world point to framebuffer pixels.
pub fn world_to_screen(camera: &Transform, point: Vector, size: (u32, u32)) -> Vector {
    let (w, h) = (size.0 as f32, size.1 as f32);
    Vector::new(
        (point.x - camera.position.x) / camera.scale.x * w,
        h - (point.y - camera.position.y) / camera.scale.y * h,
    )
}

/// Maps a framebuffer pixel (its center) to a world point.
pub fn screen_to_world(camera: &Transform, x: f32, y: f32, size: (u32, u32)) -> Vector {
    let (w, h) = (size.0 as f32, size.1 as f32);
    let ndc = Vector::new((2.0 * x + 1.0) / w - 1.0, (2.0 * (h - y) + 1.0) / h - 1.0);
    ndc * camera.scale * 0.5 + camera.position + camera.scale * 0.5
}

pub fn collect_frame(world: &World, size: (u32, u32)) -> Frame {
    let camera = world.resource::<Camera>().0;
    let lists = world.resource::<EntityLists>();
    let mut frame = Frame {
        width: size.0,
        height: size.1,
        ..Default::default()
    };
    if camera.scale.x == 0.0 || camera.scale.y == 0.0 || size.0 == 0 || size.1 == 0 {
        return frame;
    }
    let cull = camera.scale.x > 0.0 && camera.scale.y > 0.0;
    let (px_x, px_y) = (
        size.0 as f32 / camera.scale.x,
        size.1 as f32 / camera.scale.y,
    );

    for tile in lists.tiles.iter().filter_map(|&e| world.get::<Tile>(e)) {
        if !tile.is_drawable() || (cull && !Transform::intersect(&tile.transform, &camera)) {
            continue;
        }
        let t = &tile.transform;
        let corner = world_to_screen(
            &camera,
            Vector::new(t.position.x, t.position.y + t.scale.y),
            size,
        );
        frame.sprites.push(SpriteDraw {
            texture: tile.texture.clone(),
            dest: ScreenRect {
                x: corner.x,
                y: corner.y,
                w: t.scale.x * px_x,
                h: t.scale.y * px_y,
            },
            rotation: t.rotation,
        });
    }

    for label in lists.labels.iter().filter_map(|&e| world.get::<Label>(e)) {
        if !label.is_drawable() {
            continue;
        }
        let anchor = world_to_screen(&camera, label.position, size);
        frame.texts.push(TextDraw {
            text: label.text.clone(),
            x: anchor.x,
            y: anchor.y,
            size: label.scale * px_y,
            rgb: label.rgb(),
        });
    }
    frame
}
