//! Render-rate countdown.
//!
//! The frame loop runs as fast as it can; [`RenderGate`] decides on which
//! iterations a render tick happens. The countdown is decremented by the
//! simulation step and, when it runs out, is refilled with `1 / rate` using
//! the rate current at that moment. Overshoot is carried into the next
//! interval so the long-run render count tracks `rate * time`. When a single
//! step overshoots by more than a whole interval the countdown restarts
//! instead of trying to catch up.

use bevy_ecs::prelude::Resource;

use crate::error::{EngineError, EngineResult};

pub const DEFAULT_RENDER_RATE: f32 = 60.0;

#[derive(Resource, Debug, Clone)]
pub struct RenderGate {
    rate: f32,
    countdown: f32,
    since_last: f32,
}

impl Default for RenderGate {
    fn default() -> Self {
        Self {
            rate: DEFAULT_RENDER_RATE,
            countdown: 1.0 / DEFAULT_RENDER_RATE,
            since_last: 0.0,
        }
    }
}

impl RenderGate {
    pub fn new(rate: f32) -> EngineResult<Self> {
        let mut gate = Self::default();
        gate.set_rate(rate)?;
        gate.countdown = gate.interval();
        Ok(gate)
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Changes the target rate. The running countdown is left alone so the
    /// new rate applies from the next interval on.
    pub fn set_rate(&mut self, rate: f32) -> EngineResult<()> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(EngineError::validation(format!("invalid render rate: {rate}")));
        }
        self.rate = rate;
        Ok(())
    }

    pub fn interval(&self) -> f32 {
        1.0 / self.rate
    }

    /// Advances the countdown by `dt`. Returns `true` when a render tick is due.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.since_last += dt;
        self.countdown -= dt;
        if self.countdown > 0.0 {
            return false;
        }
        let interval = self.interval();
        self.countdown += interval;
        if self.countdown <= 0.0 {
            self.countdown = interval;
        }
        true
    }

    /// Time accumulated since the previous render tick, clamped to `[0, 1]`.
    /// Resets the accumulator.
    pub fn take_render_delta(&mut self) -> f32 {
        let delta = self.since_last.clamp(0.0, 1.0);
        self.since_last = 0.0;
        delta
    }
}
