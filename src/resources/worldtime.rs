use bevy_ecs::prelude::Resource;

/// Simulation clock.
///
/// `delta` is the clamped step of the current iteration. `render_delta` is the
/// simulated time between the last two render ticks and `frames` counts render
/// ticks.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct WorldTime {
    pub elapsed: f32,
    pub delta: f32,
    pub render_delta: f32,
    pub frames: u64,
}
