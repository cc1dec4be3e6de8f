//! Engine configuration.
//!
//! Settings are read from an optional INI file. Anything missing keeps its
//! default, and a missing file means all defaults.
//!
//! # Configuration File Format
//!
//! ```ini
//! [window]
//! width = 1280
//! height = 720
//! title = Flat
//! target_fps = 60
//!
//! [physics]
//! gravity_x = 0.0
//! gravity_y = -9.82
//!
//! [network]
//! bind_address = 127.0.0.1
//! response_timeout_ms = 1000
//!
//! [engine]
//! ; terminate | retry
//! on_error = terminate
//! ```

use std::path::PathBuf;
use std::time::Duration;

use configparser::ini::Ini;
use log::{info, warn};

use crate::components::vector::Vector;
use crate::resources::physics::DEFAULT_GRAVITY;
use crate::resources::rendergate::DEFAULT_RENDER_RATE;

const DEFAULT_WINDOW_WIDTH: u32 = 1280;
const DEFAULT_WINDOW_HEIGHT: u32 = 720;
const DEFAULT_TITLE: &str = concat!("Flat ", env!("CARGO_PKG_VERSION"));
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 1000;
const DEFAULT_CONFIG_PATH: &str = "./config.ini";

/// What happens after a fatal error has been reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnError {
    #[default]
    Terminate,
    /// Log the error and carry on with the next iteration.
    Retry,
}

impl OnError {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "terminate" => Some(Self::Terminate),
            "retry" => Some(Self::Retry),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Window width in pixels.
    pub window_width: u32,
    /// Window height in pixels.
    pub window_height: u32,
    /// Initial window title.
    pub title: String,
    /// Initial render rate in ticks per second.
    pub target_fps: f32,
    /// Initial gravity.
    pub gravity: Vector,
    /// Address the request-serving thread binds to.
    pub bind_address: String,
    /// How long an inbound request waits for `serve` before a 504.
    pub response_timeout: Duration,
    pub on_error: OnError,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            window_width: DEFAULT_WINDOW_WIDTH,
            window_height: DEFAULT_WINDOW_HEIGHT,
            title: DEFAULT_TITLE.to_string(),
            target_fps: DEFAULT_RENDER_RATE,
            gravity: DEFAULT_GRAVITY,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            response_timeout: Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS),
            on_error: OnError::Terminate,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current values. Returns an error if the
    /// file cannot be read or parsed.
    pub fn load_from_file(&mut self) -> Result<(), String> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| format!("Failed to load config file: {}", e))?;

        // [window] section
        if let Some(width) = config.getuint("window", "width").ok().flatten() {
            self.window_width = width as u32;
        }
        if let Some(height) = config.getuint("window", "height").ok().flatten() {
            self.window_height = height as u32;
        }
        if let Some(title) = config.get("window", "title") {
            self.title = title;
        }
        if let Some(fps) = config.getfloat("window", "target_fps").ok().flatten() {
            if fps > 0.0 {
                self.target_fps = fps as f32;
            } else {
                warn!("Ignoring non-positive target_fps {}", fps);
            }
        }

        // [physics] section
        if let Some(x) = config.getfloat("physics", "gravity_x").ok().flatten() {
            self.gravity.x = x as f32;
        }
        if let Some(y) = config.getfloat("physics", "gravity_y").ok().flatten() {
            self.gravity.y = y as f32;
        }

        // [network] section
        if let Some(address) = config.get("network", "bind_address") {
            self.bind_address = address;
        }
        if let Some(ms) = config.getuint("network", "response_timeout_ms").ok().flatten() {
            self.response_timeout = Duration::from_millis(ms);
        }

        // [engine] section
        if let Some(value) = config.get("engine", "on_error") {
            match OnError::parse(&value) {
                Some(on_error) => self.on_error = on_error,
                None => warn!("Unknown on_error value '{}', keeping {:?}", value, self.on_error),
            }
        }

        info!(
            "Loaded config: {}x{} window, fps={}, gravity={}, bind={}, timeout={:?}, on_error={:?}",
            self.window_width,
            self.window_height,
            self.target_fps,
            self.gravity,
            self.bind_address,
            self.response_timeout,
            self.on_error
        );

        Ok(())
    }

    /// Loads the file when it exists, keeping defaults otherwise.
    pub fn load_or_default(path: impl Into<PathBuf>) -> Self {
        let mut config = Self::with_path(path);
        if let Err(e) = config.load_from_file() {
            info!("Using default configuration ({})", e);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults() {
        let config = EngineConfig::new();
        assert_eq!(config.window_width, 1280);
        assert_eq!(config.window_height, 720);
        assert_eq!(config.target_fps, 60.0);
        assert_eq!(config.gravity, Vector::new(0.0, -9.82));
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.response_timeout, Duration::from_millis(1000));
        assert_eq!(config.on_error, OnError::Terminate);
    }

    #[test]
    fn missing_file_keeps_defaults() {
        let config = EngineConfig::load_or_default("does/not/exist.ini");
        assert_eq!(config.window_width, 1280);
    }

    #[test]
    fn loads_every_section() {
        let file = write_config(
            "[window]\nwidth = 640\nheight = 480\ntitle = Demo\ntarget_fps = 30\n\
             [physics]\ngravity_x = 1.5\ngravity_y = -3\n\
             [network]\nbind_address = 0.0.0.0\nresponse_timeout_ms = 250\n\
             [engine]\non_error = retry\n",
        );
        let mut config = EngineConfig::with_path(file.path());
        config.load_from_file().unwrap();
        assert_eq!(config.window_width, 640);
        assert_eq!(config.window_height, 480);
        assert_eq!(config.title, "Demo");
        assert_eq!(config.target_fps, 30.0);
        assert_eq!(config.gravity, Vector::new(1.5, -3.0));
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.response_timeout, Duration::from_millis(250));
        assert_eq!(config.on_error, OnError::Retry);
    }

    #[test]
    fn invalid_values_are_ignored() {
        let file = write_config("[window]\ntarget_fps = 0\n[engine]\non_error = explode\n");
        let mut config = EngineConfig::with_path(file.path());
        config.load_from_file().unwrap();
        assert_eq!(config.target_fps, 60.0);
        assert_eq!(config.on_error, OnError::Terminate);
    }
}
