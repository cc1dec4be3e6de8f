use std::collections::VecDeque;

use crate::error::EngineResult;
use crate::surface::{Frame, RawInput, RenderSurface, WindowCmd};

/// Window-less surface.
///
/// Input is scripted per poll: every call to [`poll_input`](RenderSurface::poll_input)
/// pops one batch from the queue. Draws are counted and the last frame is
/// kept for inspection.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    width: u32,
    height: u32,
    input: VecDeque<Vec<RawInput>>,
    close_requested: bool,
    pub draws: u64,
    pub presents: u64,
    pub last_frame: Option<Frame>,
    pub title: String,
    pub cursor_visible: bool,
    /// Sound currently playing and whether it loops.
    pub sound: Option<(String, bool)>,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cursor_visible: true,
            ..Default::default()
        }
    }

    /// Queues one batch of input for a future poll.
    pub fn push_input(&mut self, batch: Vec<RawInput>) {
        self.input.push_back(batch);
    }

    /// Simulates the window close button.
    pub fn request_close(&mut self) {
        self.close_requested = true;
    }
}

impl RenderSurface for HeadlessSurface {
    fn poll_input(&mut self) -> Vec<RawInput> {
        self.input.pop_front().unwrap_or_default()
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn draw(&mut self, frame: &Frame) -> EngineResult<()> {
        self.draws += 1;
        self.last_frame = Some(frame.clone());
        Ok(())
    }

    fn present(&mut self) {
        self.presents += 1;
    }

    fn should_close(&self) -> bool {
        self.close_requested
    }

    fn apply(&mut self, cmd: WindowCmd) {
        match cmd {
            WindowCmd::Title(title) => self.title = title,
            WindowCmd::ShowCursor => self.cursor_visible = true,
            WindowCmd::HideCursor => self.cursor_visible = false,
            WindowCmd::PlaySound { path, looped } => self.sound = Some((path, looped)),
            WindowCmd::ResetSound => self.sound = None,
        }
    }
}
