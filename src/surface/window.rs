//! Native window surface backed by raylib.
//!
//! Input is sampled once per poll: raylib keeps per-frame pressed/released
//! flags, so every tracked key and button is checked for a transition and
//! reported in code order. Textures are loaded the first time a frame
//! references them and cached by path for the lifetime of the window.
//! Sounds are handed to a [`SoundBridge`].

use std::sync::Arc;

use log::info;
use raylib::core::input::key_from_i32;
use raylib::prelude::*;
use rustc_hash::FxHashMap;

use crate::error::{EngineError, EngineResult};
use crate::resources::input::KEY_NAMES;
use crate::surface::sound::{SoundBridge, SoundCmd};
use crate::surface::{Frame, RawInput, RenderSurface, WindowCmd};

const MOUSE_BUTTONS: [(i32, MouseButton); 7] = [
    (0, MouseButton::MOUSE_BUTTON_LEFT),
    (1, MouseButton::MOUSE_BUTTON_RIGHT),
    (2, MouseButton::MOUSE_BUTTON_MIDDLE),
    (3, MouseButton::MOUSE_BUTTON_SIDE),
    (4, MouseButton::MOUSE_BUTTON_EXTRA),
    (5, MouseButton::MOUSE_BUTTON_FORWARD),
    (6, MouseButton::MOUSE_BUTTON_BACK),
];

pub struct WindowSurface {
    rl: RaylibHandle,
    thread: RaylibThread,
    keys: Vec<(i32, KeyboardKey)>,
    textures: FxHashMap<Arc<str>, Texture2D>,
    pending: Option<Frame>,
    sound: SoundBridge,
}

impl WindowSurface {
    pub fn open(width: u32, height: u32, title: &str) -> Self {
        let (mut rl, thread) = raylib::init()
            .size(width as i32, height as i32)
            .resizable()
            .title(title)
            .build();
        // Scripts decide when to quit.
        rl.set_exit_key(None);

        let keys = KEY_NAMES
            .iter()
            .map(|(_, code)| *code)
            .chain(65..=90)
            .filter_map(|code| key_from_i32(code).map(|key| (code, key)))
            .collect();

        info!("Window opened ({}x{})", width, height);
        Self {
            rl,
            thread,
            keys,
            textures: FxHashMap::default(),
            pending: None,
            sound: SoundBridge::spawn(),
        }
    }

    fn upload(&mut self, frame: &Frame) -> EngineResult<()> {
        for sprite in &frame.sprites {
            if self.textures.contains_key(&sprite.texture.path) {
                continue;
            }
            let texture = self
                .rl
                .load_texture(&self.thread, &sprite.texture.path)
                .map_err(|e| {
                    EngineError::resource(format!(
                        "failed to upload texture '{}': {e}",
                        sprite.texture.path
                    ))
                })?;
            self.textures.insert(sprite.texture.path.clone(), texture);
        }
        Ok(())
    }
}

impl RenderSurface for WindowSurface {
    fn poll_input(&mut self) -> Vec<RawInput> {
        let mut inputs = Vec::new();
        for &(code, key) in &self.keys {
            if self.rl.is_key_pressed(key) {
                inputs.push(RawInput::Key {
                    code,
                    pressed: true,
                });
            }
            if self.rl.is_key_released(key) {
                inputs.push(RawInput::Key {
                    code,
                    pressed: false,
                });
            }
        }
        for (code, button) in MOUSE_BUTTONS {
            if self.rl.is_mouse_button_pressed(button) {
                inputs.push(RawInput::Button {
                    code,
                    pressed: true,
                });
            }
            if self.rl.is_mouse_button_released(button) {
                inputs.push(RawInput::Button {
                    code,
                    pressed: false,
                });
            }
        }
        let delta = self.rl.get_mouse_delta();
        if delta.x != 0.0 || delta.y != 0.0 {
            let pos = self.rl.get_mouse_position();
            inputs.push(RawInput::CursorMoved { x: pos.x, y: pos.y });
        }
        let wheel = self.rl.get_mouse_wheel_move();
        if wheel != 0.0 {
            inputs.push(RawInput::Scroll { delta: wheel });
        }
        inputs
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        (
            self.rl.get_screen_width().max(0) as u32,
            self.rl.get_screen_height().max(0) as u32,
        )
    }

    fn draw(&mut self, frame: &Frame) -> EngineResult<()> {
        self.upload(frame)?;
        self.pending = Some(frame.clone());
        Ok(())
    }

    fn present(&mut self) {
        let frame = self.pending.take().unwrap_or_default();
        let mut d = self.rl.begin_drawing(&self.thread);
        d.clear_background(Color::BLACK);

        for sprite in &frame.sprites {
            let Some(tex) = self.textures.get(&sprite.texture.path) else {
                continue;
            };
            let src = Rectangle {
                x: 0.0,
                y: 0.0,
                width: sprite.texture.width as f32,
                height: sprite.texture.height as f32,
            };
            // Rotate around the center of the destination box.
            let (half_w, half_h) = (sprite.dest.w * 0.5, sprite.dest.h * 0.5);
            let dest = Rectangle {
                x: sprite.dest.x + half_w,
                y: sprite.dest.y + half_h,
                width: sprite.dest.w,
                height: sprite.dest.h,
            };
            d.draw_texture_pro(
                tex,
                src,
                dest,
                Vector2 {
                    x: half_w,
                    y: half_h,
                },
                -sprite.rotation,
                Color::WHITE,
            );
        }

        for text in &frame.texts {
            let (r, g, b) = text.rgb;
            d.draw_text(
                &text.text,
                text.x as i32,
                (text.y - text.size) as i32,
                text.size.max(1.0) as i32,
                Color::new(r, g, b, 255),
            );
        }
    }

    fn should_close(&self) -> bool {
        self.rl.window_should_close()
    }

    fn apply(&mut self, cmd: WindowCmd) {
        match cmd {
            WindowCmd::Title(title) => self.rl.set_window_title(&self.thread, &title),
            WindowCmd::ShowCursor => self.rl.show_cursor(),
            WindowCmd::HideCursor => self.rl.hide_cursor(),
            WindowCmd::PlaySound { path, looped } => {
                self.sound.send(SoundCmd::Play { path, looped })
            }
            WindowCmd::ResetSound => self.sound.send(SoundCmd::Reset),
        }
    }
}
