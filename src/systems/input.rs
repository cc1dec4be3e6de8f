//! Input translation.
//!
//! [`apply_input`] turns the raw input drained from the surface into
//! [`InputState`] updates and Keyboard/Mouse event payloads, one payload per
//! raw record and in the same order. Cursor movement and wheel movement are
//! reported as the hover and scroll pseudo-buttons.
use bevy_ecs::prelude::*;

use crate::events::{EventPayload, InputAction};
use crate::resources::camera::Camera;
use crate::resources::input::{BUTTON_HOVER, BUTTON_SCROLL, InputState};
use crate::surface::RawInput;
use crate::systems::render::screen_to_world;

pub fn apply_input(world: &mut World, inputs: &[RawInput], size: (u32, u32)) -> Vec<EventPayload> {
    let camera = world.resource::<Camera>().0;
    let mut input = world.resource_mut::<InputState>();
    let mut events = Vec::with_capacity(inputs.len());

    for raw in inputs {
        match *raw {
            RawInput::Key { code, pressed } => {
                if code < 0 {
                    continue;
                }
                input.set_key(code, pressed);
                events.push(EventPayload::Keyboard {
                    code,
                    action: InputAction::from_pressed(pressed),
                });
            }
            RawInput::Button { code, pressed } => {
                input.set_button(code, pressed);
                events.push(EventPayload::Mouse {
                    code,
                    action: InputAction::from_pressed(pressed),
                });
            }
            RawInput::CursorMoved { x, y } => {
                if size.0 > 0 && size.1 > 0 {
                    input.cursor = screen_to_world(&camera, x, y, size);
                }
                events.push(EventPayload::Mouse {
                    code: BUTTON_HOVER,
                    action: InputAction::Release,
                });
            }
            RawInput::Scroll { delta } => {
                if delta == 0.0 {
                    continue;
                }
                events.push(EventPayload::Mouse {
                    code: BUTTON_SCROLL,
                    action: InputAction::from_pressed(delta > 0.0),
                });
            }
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::vector::Vector;

    fn world() -> World {
        let mut world = World::new();
        world.insert_resource(Camera::default());
        world.insert_resource(InputState::default());
        world
    }

    #[test]
    fn keys_update_state_and_raise_events() {
        let mut world = world();
        let events = apply_input(
            &mut world,
            &[
                RawInput::Key {
                    code: 87,
                    pressed: true,
                },
                RawInput::Key {
                    code: -1,
                    pressed: true,
                },
            ],
            (100, 100),
        );
        assert_eq!(
            events,
            vec![EventPayload::Keyboard {
                code: 87,
                action: InputAction::Press
            }]
        );
        assert!(world.resource::<InputState>().key(87).unwrap());
    }

    #[test]
    fn cursor_and_scroll_use_pseudo_buttons() {
        let mut world = world();
        let events = apply_input(
            &mut world,
            &[
                RawInput::CursorMoved { x: 49.5, y: 50.5 },
                RawInput::Scroll { delta: -2.0 },
                RawInput::Scroll { delta: 0.0 },
            ],
            (100, 100),
        );
        assert_eq!(
            events,
            vec![
                EventPayload::Mouse {
                    code: BUTTON_HOVER,
                    action: InputAction::Release
                },
                EventPayload::Mouse {
                    code: BUTTON_SCROLL,
                    action: InputAction::Release
                },
            ]
        );
        let cursor = world.resource::<InputState>().cursor;
        assert!((cursor - Vector::ZERO).length() < 1e-4);
    }
}
