//! Frame loop.
//!
//! The [`Scheduler`] owns one [`LuaRuntime`] (and through it the simulation)
//! plus the [`RenderSurface`] it presents to. Its lifecycle is
//!
//! ```text
//! NotRunning -> Starting -> Running -> Stopping -> NotRunning
//! ```
//!
//! Each iteration while running does, in order:
//!
//! 1. sweep hooks flagged for removal
//! 2. collect a pending network request and deliver Network events
//! 3. poll the surface for input, deliver Keyboard then Mouse events
//! 4. advance the clock, raise and deliver Update
//! 5. run one physics step
//! 6. deliver Phase then Collision events
//! 7. if the render gate is due: deliver Render, draw, present
//! 8. forward window commands queued by scripts
//!
//! The step is the wall-clock time since the previous iteration began,
//! clamped to `[0, 1]` seconds.
//!
//! Every error raised during an iteration goes to a single
//! [`FatalReporter`], which decides between carrying on with the next
//! iteration and terminating.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use log::{error, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::events::{EventKind, EventPayload};
use crate::resources::gameconfig::{EngineConfig, OnError};
use crate::resources::lua_runtime::LuaRuntime;
use crate::resources::rendergate::RenderGate;
use crate::surface::RenderSurface;
use crate::systems::input::apply_input;
use crate::systems::physics::physics_step;
use crate::systems::render::collect_frame;
use crate::systems::time::{clamp_delta, record_render, update_world_time};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    NotRunning,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulerState::NotRunning => "not running",
            SchedulerState::Starting => "starting",
            SchedulerState::Running => "running",
            SchedulerState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Outcome chosen by a [`FatalReporter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalAction {
    /// Drop the failed iteration and continue with the next one.
    Retry,
    Terminate,
}

impl From<OnError> for FatalAction {
    fn from(on_error: OnError) -> Self {
        match on_error {
            OnError::Retry => FatalAction::Retry,
            OnError::Terminate => FatalAction::Terminate,
        }
    }
}

/// The single sink for validation, resource and script errors.
pub trait FatalReporter {
    fn report(&mut self, error: &EngineError) -> FatalAction;
}

/// Logs every error and answers with a fixed action.
#[derive(Debug, Clone, Copy)]
pub struct LogReporter {
    action: FatalAction,
}

impl LogReporter {
    pub fn new(action: FatalAction) -> Self {
        Self { action }
    }
}

impl FatalReporter for LogReporter {
    fn report(&mut self, error: &EngineError) -> FatalAction {
        match self.action {
            FatalAction::Retry => error!("{} (continuing)", error),
            FatalAction::Terminate => error!("{} (terminating)", error),
        }
        self.action
    }
}

pub struct Scheduler<S: RenderSurface> {
    config: EngineConfig,
    surface: S,
    reporter: Box<dyn FatalReporter>,
    runtime: Option<LuaRuntime>,
    state: SchedulerState,
    last_tick: Option<Instant>,
    iterations: u64,
}

impl<S: RenderSurface> Scheduler<S> {
    pub fn new(config: EngineConfig, surface: S) -> Self {
        let reporter = LogReporter::new(config.on_error.into());
        Self {
            config,
            surface,
            reporter: Box::new(reporter),
            runtime: None,
            state: SchedulerState::NotRunning,
            last_tick: None,
            iterations: 0,
        }
    }

    pub fn with_reporter(mut self, reporter: impl FatalReporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Iterations completed since the last start.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn runtime(&self) -> Option<&LuaRuntime> {
        self.runtime.as_ref()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Creates a fresh simulation and runs `script` in it.
    ///
    /// A failure is reported and leaves the scheduler `NotRunning`; there is
    /// nothing to retry at this point.
    pub fn start(&mut self, script: &Path) -> EngineResult<()> {
        if self.state != SchedulerState::NotRunning {
            return Err(EngineError::validation(format!(
                "cannot start while {}",
                self.state
            )));
        }
        self.state = SchedulerState::Starting;
        info!("Starting {}", script.display());

        let started = LuaRuntime::new(&self.config).and_then(|runtime| {
            runtime.run_script(script)?;
            Ok(runtime)
        });
        match started {
            Ok(runtime) => {
                self.runtime = Some(runtime);
                self.last_tick = None;
                self.iterations = 0;
                self.state = SchedulerState::Running;
                info!("Running");
                Ok(())
            }
            Err(e) => {
                self.reporter.report(&e);
                self.state = SchedulerState::NotRunning;
                Err(e)
            }
        }
    }

    /// One iteration using the wall-clock time since the previous one.
    pub fn step(&mut self) -> EngineResult<()> {
        let now = Instant::now();
        let dt = self
            .last_tick
            .map(|last| now.duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last_tick = Some(now);
        self.advance(dt)
    }

    /// One iteration with an explicit step of `dt` seconds.
    pub fn advance(&mut self, dt: f32) -> EngineResult<()> {
        if self.state != SchedulerState::Running {
            return Err(EngineError::validation(format!(
                "cannot advance while {}",
                self.state
            )));
        }
        let dt = clamp_delta(dt);
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| EngineError::validation("no script runtime"))?;
        let ctx = runtime.context()?;

        ctx.dispatcher_mut()?.sweep();

        // Network
        let request = ctx.network_mut()?.as_mut().and_then(|n| n.collect());
        if let Some(protocol) = request {
            ctx.dispatcher_mut()?.send(EventPayload::Network { protocol });
        }
        runtime.poll(EventKind::Network)?;

        // Input
        let inputs = self.surface.poll_input();
        let size = self.surface.framebuffer_size();
        let input_events = apply_input(&mut *ctx.world_mut()?, &inputs, size);
        {
            let mut dispatcher = ctx.dispatcher_mut()?;
            for payload in input_events {
                dispatcher.send(payload);
            }
        }
        runtime.poll(EventKind::Keyboard)?;
        runtime.poll(EventKind::Mouse)?;

        // Update
        update_world_time(&mut *ctx.world_mut()?, dt);
        ctx.dispatcher_mut()?.send(EventPayload::Update);
        runtime.poll(EventKind::Update)?;

        // Physics
        let contacts = physics_step(&mut *ctx.world_mut()?, dt);
        {
            let mut dispatcher = ctx.dispatcher_mut()?;
            for payload in contacts {
                dispatcher.send(payload);
            }
        }
        runtime.poll(EventKind::Phase)?;
        runtime.poll(EventKind::Collision)?;

        // Render
        let render_delta = {
            let mut world = ctx.world_mut()?;
            let due = {
                let mut gate = world.resource_mut::<RenderGate>();
                gate.tick(dt).then(|| gate.take_render_delta())
            };
            if let Some(render_delta) = due {
                record_render(&mut world, render_delta);
            }
            due
        };
        if render_delta.is_some() {
            ctx.dispatcher_mut()?.send(EventPayload::Render);
            runtime.poll(EventKind::Render)?;
            let size = self.surface.framebuffer_size();
            let frame = collect_frame(&*ctx.world()?, size);
            self.surface.draw(&frame)?;
            self.surface.present();
        }

        for cmd in ctx.take_window_commands() {
            self.surface.apply(cmd);
        }

        if ctx.stop_requested() || self.surface.should_close() {
            info!("Stop requested");
            self.state = SchedulerState::Stopping;
        }
        self.iterations += 1;
        Ok(())
    }

    /// Iterates until a stop is requested, `max_iterations` is reached or
    /// the reporter terminates. Always ends `NotRunning`.
    pub fn run(&mut self, max_iterations: Option<u64>) -> EngineResult<()> {
        if self.state != SchedulerState::Running {
            return Err(EngineError::validation(format!("cannot run while {}", self.state)));
        }
        let mut outcome = Ok(());
        while self.state == SchedulerState::Running {
            if max_iterations.is_some_and(|max| self.iterations >= max) {
                info!("Iteration limit {} reached", self.iterations);
                break;
            }
            if let Err(e) = self.step() {
                match self.reporter.report(&e) {
                    FatalAction::Retry => {
                        // A failed iteration still counts against the limit.
                        self.iterations += 1;
                    }
                    FatalAction::Terminate => {
                        outcome = Err(e);
                        break;
                    }
                }
            }
        }
        self.shutdown();
        outcome
    }

    /// Clears hooks, events and entities, stops the network service and
    /// releases the script environment.
    pub fn shutdown(&mut self) {
        if self.state == SchedulerState::NotRunning {
            return;
        }
        self.state = SchedulerState::Stopping;
        if let Some(runtime) = self.runtime.take() {
            match runtime.context() {
                Ok(ctx) => {
                    if let Err(e) = ctx.teardown() {
                        warn!("Teardown failed: {}", e);
                    }
                }
                Err(e) => warn!("Teardown skipped: {}", e),
            }
        }
        self.state = SchedulerState::NotRunning;
        info!("Stopped after {} iterations", self.iterations);
    }
}

impl<S: RenderSurface> Drop for Scheduler<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Write;
    use std::rc::Rc;

    use crate::surface::headless::HeadlessSurface;

    #[derive(Clone, Default)]
    struct Recording(Rc<RefCell<Vec<String>>>);

    impl FatalReporter for Recording {
        fn report(&mut self, error: &EngineError) -> FatalAction {
            self.0.borrow_mut().push(error.to_string());
            FatalAction::Retry
        }
    }

    fn script(source: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".lua").tempfile().unwrap();
        file.write_all(source.as_bytes()).unwrap();
        file
    }

    fn scheduler() -> Scheduler<HeadlessSurface> {
        Scheduler::new(EngineConfig::new(), HeadlessSurface::new(64, 64))
    }

    #[test]
    fn lifecycle_goes_back_to_not_running() {
        let file = script("engine.log('hi')");
        let mut s = scheduler();
        assert_eq!(s.state(), SchedulerState::NotRunning);
        s.start(file.path()).unwrap();
        assert_eq!(s.state(), SchedulerState::Running);
        assert!(s.start(file.path()).is_err());
        s.run(Some(3)).unwrap();
        assert_eq!(s.state(), SchedulerState::NotRunning);
        assert!(s.runtime().is_none());
    }

    #[test]
    fn broken_script_does_not_start() {
        let file = script("this is not lua");
        let mut s = scheduler();
        assert!(matches!(s.start(file.path()), Err(EngineError::Script(_))));
        assert_eq!(s.state(), SchedulerState::NotRunning);
        assert!(s.start(Path::new("missing.lua")).is_err());
    }

    #[test]
    fn destroy_from_update_stops_the_loop() {
        let file = script(
            "engine.dispatcher.hook(engine.dispatcher.update, function()
                 if engine.time() >= 0.25 then engine.destroy() end
             end)",
        );
        let mut s = scheduler();
        s.start(file.path()).unwrap();
        for _ in 0..10 {
            if s.state() != SchedulerState::Running {
                break;
            }
            s.advance(0.1).unwrap();
        }
        assert_eq!(s.state(), SchedulerState::Stopping);
        assert_eq!(s.iterations(), 3);
        s.shutdown();
        assert_eq!(s.state(), SchedulerState::NotRunning);
    }

    #[test]
    fn retry_reporter_keeps_iterating() {
        let file = script(
            "engine.dispatcher.hook(engine.dispatcher.update, function() error('always') end)",
        );
        let log = Recording::default();
        let mut s = scheduler().with_reporter(log.clone());
        s.start(file.path()).unwrap();
        s.run(Some(4)).unwrap();
        assert_eq!(log.0.borrow().len(), 4);
        assert!(log.0.borrow()[0].contains("always"));
    }

    #[test]
    fn terminate_reporter_returns_the_error() {
        let file = script(
            "engine.dispatcher.hook(engine.dispatcher.update, function() error('fatal') end)",
        );
        let mut s = scheduler().with_reporter(LogReporter::new(FatalAction::Terminate));
        s.start(file.path()).unwrap();
        assert!(matches!(s.run(None), Err(EngineError::Script(_))));
        assert_eq!(s.state(), SchedulerState::NotRunning);
    }

    #[test]
    fn window_commands_reach_the_surface() {
        let file = script("engine.title('demo'); engine.hide_cursor()");
        let mut s = scheduler();
        s.start(file.path()).unwrap();
        s.advance(0.0).unwrap();
        assert_eq!(s.surface().title, "demo");
        assert!(!s.surface().cursor_visible);
    }

    #[test]
    fn closing_the_surface_stops_the_loop() {
        let file = script("");
        let mut s = scheduler();
        s.start(file.path()).unwrap();
        s.surface_mut().request_close();
        s.run(None).unwrap();
        assert_eq!(s.iterations(), 1);
    }
}
