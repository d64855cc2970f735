//! Viewer configuration.
//!
//! Loaded from TOML. Every section has defaults, so a partial file (or none at
//! all) is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::projection::DepthRange;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub projection: ProjectionConfig,
    pub playback: PlaybackConfig,
    pub picking: PickingConfig,
    pub render: RenderConfig,
}

impl ViewerConfig {
    /// Load configuration from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: ViewerConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations.
    ///
    /// Searches `./cortexview.toml`, then `<config dir>/cortexview/config.toml`.
    /// Falls back to defaults when neither exists. A file that exists but fails
    /// to parse is logged and skipped.
    pub fn load_default() -> Self {
        for path in Self::search_paths() {
            if !path.exists() {
                continue;
            }
            match Self::load(&path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    return config;
                }
                Err(e) => log::warn!("Ignoring config {}: {}", path.display(), e),
            }
        }
        Self::default()
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("cortexview.toml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("cortexview").join("config.toml"));
        }
        paths
    }

    /// Save configuration to a file path.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if !(self.playback.fps > 0.0) {
            return invalid("playback.fps must be positive");
        }
        if !(self.playback.speed > 0.0) {
            return invalid("playback.speed must be positive");
        }
        if self.playback.notify_every == 0 {
            return invalid("playback.notify_every must be at least 1");
        }
        if !(self.picking.threshold > 0.0) {
            return invalid("picking.threshold must be positive");
        }
        if !(self.projection.near > 0.0) || self.projection.near >= self.projection.far {
            return invalid("projection.near must be positive and less than projection.far");
        }
        if !(self.camera.min_distance > 0.0) {
            return invalid("camera.min_distance must be positive");
        }
        if self.camera.min_distance > self.camera.max_distance {
            return invalid("camera.min_distance must not exceed camera.max_distance");
        }
        if self.render.failure_warn_every == 0 {
            return invalid("render.failure_warn_every must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "cortexview".to_string(),
            width: 1200,
            height: 800,
        }
    }
}

/// Orbit camera tuning. Angles are radians.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Initial distance. `None` frames the mesh bounds.
    pub distance: Option<f32>,
    pub min_distance: f32,
    pub max_distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub orbit_sensitivity: f32,
    pub pan_sensitivity: f32,
    /// Distance multiplier per wheel notch (120 units).
    pub zoom_factor: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            distance: None,
            min_distance: 0.05,
            max_distance: 1000.0,
            yaw: 0.0,
            pitch: 0.3,
            orbit_sensitivity: 0.005,
            pan_sensitivity: 0.0015,
            zoom_factor: 1.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProjectionConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub depth_range: DepthRange,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near: 0.01,
            far: 1000.0,
            depth_range: DepthRange::ZeroToOne,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Animation frames per second of wall time.
    pub fps: f64,
    /// Emit frame notifications only on multiples of this.
    pub notify_every: usize,
    /// Playback rate multiplier.
    pub speed: f64,
    /// Start playing immediately.
    pub autoplay: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            notify_every: 5,
            speed: 1.0,
            autoplay: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PickingConfig {
    /// Screen-space pick radius in NDC units (resolution independent).
    pub threshold: f32,
}

impl Default for PickingConfig {
    fn default() -> Self {
        Self { threshold: 0.05 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub background: [f32; 4],
    pub highlight: [f32; 4],
    pub show_traces: bool,
    /// Height of the trace strip as a fraction of the target height.
    pub trace_height: f32,
    pub font_path: Option<PathBuf>,
    pub font_size: f32,
    /// Log a warning after this many consecutive failed frames.
    pub failure_warn_every: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            background: [0.05, 0.05, 0.08, 1.0],
            highlight: [1.0, 1.0, 0.3, 1.0],
            show_traces: true,
            trace_height: 0.22,
            font_path: None,
            font_size: 18.0,
            failure_warn_every: 120,
        }
    }
}
