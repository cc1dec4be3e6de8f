//! Render surface seam.
//!
//! The frame loop talks to the platform only through [`RenderSurface`]:
//! input polling, framebuffer size, drawing a prepared [`Frame`] and
//! presenting it. Two implementations ship with the engine:
//!
//! - [`headless::HeadlessSurface`] – no window; scripted input and counters,
//!   used by tests and `--headless` runs
//! - `window::WindowSurface` – a native window (feature `window`)

use crate::components::tile::Image;
use crate::error::EngineResult;

pub mod headless;
#[cfg(feature = "window")]
pub mod sound;
#[cfg(feature = "window")]
pub mod window;

/// Raw platform input in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawInput {
    Key { code: i32, pressed: bool },
    Button { code: i32, pressed: bool },
    /// Cursor position in framebuffer pixels, origin top-left.
    CursorMoved { x: f32, y: f32 },
    /// Vertical wheel movement; positive is away from the user.
    Scroll { delta: f32 },
}

/// Window and audio changes requested by scripts, applied by the frame loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowCmd {
    Title(String),
    ShowCursor,
    HideCursor,
    /// Starts a sound file. Only one sound plays at a time; a new one
    /// replaces it.
    PlaySound { path: String, looped: bool },
    /// Stops the current sound.
    ResetSound,
}

/// Screen-space rectangle in pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpriteDraw {
    pub texture: Image,
    pub dest: ScreenRect,
    /// Degrees, counter-clockwise in world space.
    pub rotation: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextDraw {
    pub text: String,
    /// Baseline-left corner in pixels.
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub rgb: (u8, u8, u8),
}

/// Everything one render tick draws, in draw order: tiles first, then labels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub sprites: Vec<SpriteDraw>,
    pub texts: Vec<TextDraw>,
}

pub trait RenderSurface {
    /// Drains input gathered since the previous call.
    fn poll_input(&mut self) -> Vec<RawInput>;

    fn framebuffer_size(&self) -> (u32, u32);

    /// Draws a frame. Textures are uploaded on first use.
    fn draw(&mut self, frame: &Frame) -> EngineResult<()>;

    fn present(&mut self);

    /// The platform asked to close (window close button, etc.).
    fn should_close(&self) -> bool;

    fn apply(&mut self, cmd: WindowCmd);
}
