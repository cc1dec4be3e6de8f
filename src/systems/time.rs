//! Time update system.
//!
//! Updates the shared [`WorldTime`](crate::resources::worldtime::WorldTime)
//! resource once per iteration.
use bevy_ecs::prelude::*;

use crate::resources::worldtime::WorldTime;

/// Longest step the simulation integrates in one go.
pub const MAX_DELTA: f32 = 1.0;

/// Clamps a wall-clock delta into `[0, MAX_DELTA]`.
pub fn clamp_delta(dt: f32) -> f32 {
    if dt.is_nan() {
        return 0.0;
    }
    dt.clamp(0.0, MAX_DELTA)
}

/// Writes `elapsed` and `delta` on the `WorldTime` resource.
///
/// `dt` is expected to be already clamped.
pub fn update_world_time(world: &mut World, dt: f32) {
    let mut wt = world.resource_mut::<WorldTime>();
    wt.elapsed += dt;
    wt.delta = dt;
}

/// Records a render tick.
pub fn record_render(world: &mut World, render_delta: f32) {
    let mut wt = world.resource_mut::<WorldTime>();
    wt.render_delta = render_delta;
    wt.frames += 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_clamped() {
        assert_eq!(clamp_delta(-0.5), 0.0);
        assert_eq!(clamp_delta(3.0), 1.0);
        assert_eq!(clamp_delta(0.25), 0.25);
        assert_eq!(clamp_delta(f32::NAN), 0.0);
    }

    #[test]
    fn world_time_accumulates() {
        let mut world = World::new();
        world.insert_resource(WorldTime::default());
        update_world_time(&mut world, 0.25);
        update_world_time(&mut world, 0.5);
        record_render(&mut world, 0.75);
        let wt = world.resource::<WorldTime>();
        assert_eq!(wt.elapsed, 0.75);
        assert_eq!(wt.delta, 0.5);
        assert_eq!(wt.render_delta, 0.75);
        assert_eq!(wt.frames, 1);
    }
}
