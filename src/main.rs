//! Flat engine main entry point.
//!
//! A 2D simulation runtime written in Rust using:
//! - **bevy_ecs** as the tile and label arena
//! - **mlua + LuaJIT** for all behavior, written as hooks on engine events
//! - **raylib** for windowing and drawing (feature `window`)
//!
//! # Main Loop
//!
//! 1. Load `config.ini` (optional) and parse the command line
//! 2. Open the window, or a headless surface with `--headless`
//! 3. Run the script, which registers hooks and creates tiles
//! 4. Iterate until the script calls `engine.destroy()`, the window closes or
//!    `--frames` is reached
//!
//! # Running
//!
//! ```sh
//! cargo run --release --features window -- game/main.lua
//! cargo run --release -- --headless --frames 600 server.lua
//! ```

// Do not create console on Windows
#![cfg_attr(all(target_os = "windows", feature = "window"), windows_subsystem = "windows")]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use flatengine::error::EngineResult;
use flatengine::resources::gameconfig::{EngineConfig, OnError};
use flatengine::scheduler::Scheduler;
use flatengine::surface::RenderSurface;
use flatengine::surface::headless::HeadlessSurface;

/// Flat 2D simulation runtime
#[derive(Parser)]
#[command(version, about = "Runs a Lua script on the Flat 2D simulation runtime.")]
struct Cli {
    /// Script to run.
    #[arg(default_value = "main.lua")]
    script: PathBuf,

    /// Configuration file.
    #[arg(long, value_name = "PATH", default_value = "./config.ini")]
    config: PathBuf,

    /// Run without a window even when one is available.
    #[arg(long)]
    headless: bool,

    /// Stop after this many iterations.
    #[arg(long, value_name = "N")]
    frames: Option<u64>,

    /// Log errors and keep going instead of terminating.
    #[arg(long)]
    retry_on_error: bool,
}

fn run<S: RenderSurface>(config: EngineConfig, surface: S, script: &Path, frames: Option<u64>) -> EngineResult<()> {
    let mut scheduler = Scheduler::new(config, surface);
    scheduler.start(script)?;
    scheduler.run(frames)
}

#[cfg(feature = "window")]
fn run_windowed(config: EngineConfig, script: &Path, frames: Option<u64>) -> EngineResult<()> {
    use flatengine::surface::window::WindowSurface;

    let surface = WindowSurface::open(config.window_width, config.window_height, &config.title);
    run(config, surface, script, frames)
}

#[cfg(not(feature = "window"))]
fn run_windowed(config: EngineConfig, script: &Path, frames: Option<u64>) -> EngineResult<()> {
    log::warn!("Built without the `window` feature, running headless");
    let surface = HeadlessSurface::new(config.window_width, config.window_height);
    run(config, surface, script, frames)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    log::info!("Flat {}", env!("CARGO_PKG_VERSION"));
    let mut config = EngineConfig::load_or_default(&cli.config);
    if cli.retry_on_error {
        config.on_error = OnError::Retry;
    }

    let result = if cli.headless {
        let surface = HeadlessSurface::new(config.window_width, config.window_height);
        run(config, surface, &cli.script, cli.frames)
    } else {
        run_windowed(config, &cli.script, cli.frames)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
