//! Held-key and held-button state.
//!
//! Codes follow the GLFW numbering that raylib also uses, so a key code read
//! from `engine.input.keys` can be compared directly with the code carried by
//! a Keyboard event. Mouse buttons `0..=7` are physical buttons; two
//! pseudo-buttons are appended:
//!
//! - [`BUTTON_HOVER`] – raised (as a release) whenever the cursor moves
//! - [`BUTTON_SCROLL`] – raised on wheel movement, press for up, release for down
use bevy_ecs::prelude::*;

use crate::components::vector::Vector;
use crate::error::{EngineError, EngineResult};

/// Highest key code; also the exclusive bound of [`InputState::key`].
pub const KEY_LAST: i32 = 348;
/// Highest physical button; also the exclusive bound of [`InputState::button`].
pub const BUTTON_LAST: i32 = 7;
pub const BUTTON_HOVER: i32 = BUTTON_LAST;
pub const BUTTON_SCROLL: i32 = BUTTON_LAST + 1;

const KEY_SLOTS: usize = KEY_LAST as usize + 1;
const BUTTON_SLOTS: usize = BUTTON_LAST as usize + 2;

/// Named key codes exposed to scripts. Letters `a..z` (65..90) are added
/// separately.
pub const KEY_NAMES: &[(&str, i32)] = &[
    ("space", 32),
    ("apostrophe", 39),
    ("comma", 44),
    ("minus", 45),
    ("period", 46),
    ("slash", 47),
    ("digit0", 48),
    ("digit1", 49),
    ("digit2", 50),
    ("digit3", 51),
    ("digit4", 52),
    ("digit5", 53),
    ("digit6", 54),
    ("digit7", 55),
    ("digit8", 56),
    ("digit9", 57),
    ("semicolon", 59),
    ("equal", 61),
    ("left_bracket", 91),
    ("back_slash", 92),
    ("right_bracket", 93),
    ("grave_accent", 96),
    ("world1", 161),
    ("world2", 162),
    ("escape", 256),
    ("enter", 257),
    ("tab", 258),
    ("back_space", 259),
    ("insert", 260),
    ("delete", 261),
    ("arrow_right", 262),
    ("arrow_left", 263),
    ("arrow_down", 264),
    ("arrow_up", 265),
    ("page_up", 266),
    ("page_down", 267),
    ("home", 268),
    ("end", 269),
    ("caps_lock", 280),
    ("scroll_lock", 281),
    ("num_lock", 282),
    ("print_screen", 283),
    ("pause", 284),
    ("f1", 290),
    ("f2", 291),
    ("f3", 292),
    ("f4", 293),
    ("f5", 294),
    ("f6", 295),
    ("f7", 296),
    ("f8", 297),
    ("f9", 298),
    ("f10", 299),
    ("f11", 300),
    ("f12", 301),
    ("keypad0", 320),
    ("keypad1", 321),
    ("keypad2", 322),
    ("keypad3", 323),
    ("keypad4", 324),
    ("keypad5", 325),
    ("keypad6", 326),
    ("keypad7", 327),
    ("keypad8", 328),
    ("keypad9", 329),
    ("keypad_decimal", 330),
    ("keypad_divide", 331),
    ("keypad_multiply", 332),
    ("keypad_subtract", 333),
    ("keypad_add", 334),
    ("keypad_enter", 335),
    ("keypad_equal", 336),
    ("left_shift", 340),
    ("left_control", 341),
    ("left_alt", 342),
    ("left_super", 343),
    ("right_shift", 344),
    ("right_control", 345),
    ("right_alt", 346),
    ("right_super", 347),
    ("menu", 348),
];

pub const BUTTON_NAMES: &[(&str, i32)] = &[
    ("left", 0),
    ("right", 1),
    ("middle", 2),
    ("x1", 3),
    ("x2", 4),
    ("x3", 5),
    ("x4", 6),
    ("x5", 7),
    ("hover", BUTTON_HOVER),
    ("scroll", BUTTON_SCROLL),
];

/// Resource capturing which keys and buttons are held and where the cursor
/// is in world space.
#[derive(Resource, Debug, Clone)]
pub struct InputState {
    keys: [bool; KEY_SLOTS],
    buttons: [bool; BUTTON_SLOTS],
    pub cursor: Vector,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            keys: [false; KEY_SLOTS],
            buttons: [false; BUTTON_SLOTS],
            cursor: Vector::ZERO,
        }
    }
}

impl InputState {
    pub fn key(&self, code: i64) -> EngineResult<bool> {
        if !(0..KEY_LAST as i64).contains(&code) {
            return Err(EngineError::validation(format!("invalid key: {code}")));
        }
        Ok(self.keys[code as usize])
    }

    pub fn button(&self, code: i64) -> EngineResult<bool> {
        if !(0..BUTTON_LAST as i64).contains(&code) {
            return Err(EngineError::validation(format!("invalid button: {code}")));
        }
        Ok(self.buttons[code as usize])
    }

    /// Records a key transition. Unknown codes are ignored.
    pub fn set_key(&mut self, code: i32, held: bool) {
        if let Some(slot) = usize::try_from(code).ok().and_then(|i| self.keys.get_mut(i)) {
            *slot = held;
        }
    }

    /// Records a button transition. Unknown codes are ignored.
    pub fn set_button(&mut self, code: i32, held: bool) {
        if let Some(slot) = usize::try_from(code)
            .ok()
            .and_then(|i| self.buttons.get_mut(i))
        {
            *slot = held;
        }
    }
}
