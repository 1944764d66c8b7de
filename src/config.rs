// src/config.rs

//! Configuration for the presentation bridge.
//!
//! Every section deserializes from JSON with defaults for missing fields, so
//! an empty object is a valid configuration. Sizes and formats are checked
//! up front by [`Config::validate`]: a bad resolution or an unbridgeable
//! format pair is a configuration error, not something discovered mid-frame.

use crate::error::BridgeResult;
use crate::frame::FrameDimensions;
use crate::pixel::{FormatPair, PixelFormat};
use crate::simulation::RunnerSettings;
use anyhow::Context;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable naming a JSON config file.
pub const CONFIG_PATH_ENV: &str = "SURFACE_BRIDGE_CONFIG";

/// The game's fixed tic rate.
pub const DEFAULT_TICK_RATE_HZ: u32 = 35;

// --- Top-Level Configuration Structure ---

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub display: DisplayConfig,
    pub lifecycle: LifecycleConfig,
}

// --- Simulation Configuration ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Engine library to locate.
    pub engine: String,
    /// Frame width the engine renders at.
    pub width: i32,
    /// Frame height the engine renders at.
    pub height: i32,
    /// Steps per second. 0 runs unpaced.
    pub tick_rate_hz: u32,
    /// Stop the session on its own after this many steps.
    pub max_steps: Option<u64>,
    /// Documented bound between a stop request and the runner reaching `Stopped`.
    pub stop_timeout_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            engine: "pattern".to_string(),
            // The handheld build's only video mode.
            width: 640,
            height: 400,
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            max_steps: None,
            stop_timeout_ms: 250,
        }
    }
}

impl SimulationConfig {
    pub fn dimensions(&self) -> BridgeResult<FrameDimensions> {
        FrameDimensions::new(self.width, self.height)
    }

    pub fn runner_settings(&self) -> RunnerSettings {
        RunnerSettings {
            tick_interval: (self.tick_rate_hz > 0)
                .then(|| Duration::from_secs(1) / self.tick_rate_hz),
            max_steps: self.max_steps,
            stop_timeout: Duration::from_millis(self.stop_timeout_ms),
        }
    }
}

// --- Display Configuration ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Format the display surface requires.
    pub target_format: PixelFormat,
    /// RGBA used for letterbox borders.
    pub clear_color: [u8; 4],
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            target_format: PixelFormat::Bgra8888,
            clear_color: [0, 0, 0, 0xFF],
        }
    }
}

// --- Lifecycle Configuration ---

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Stop the simulation when its surface is destroyed instead of letting
    /// it run on, dropping frames, until shutdown.
    pub stop_on_surface_destroyed: bool,
}

impl Config {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse configuration JSON")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_json_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Loads from `$SURFACE_BRIDGE_CONFIG` if set, defaults otherwise.
    pub fn load_or_default() -> anyhow::Result<Self> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => {
                info!("{} not set, using default configuration", CONFIG_PATH_ENV);
                Ok(Self::default())
            }
        }
    }

    /// Checks the frame size and that `native_format -> target_format` is bridgeable.
    pub fn validate(&self, native_format: PixelFormat) -> BridgeResult<FormatPair> {
        self.simulation.dimensions()?;
        let pair = FormatPair::new(native_format, self.display.target_format);
        pair.ensure_supported()?;
        if self.simulation.stop_timeout_ms == 0 {
            warn!("simulation.stop_timeout_ms is 0; stop requests will report a timeout");
        }
        Ok(pair)
    }
}
