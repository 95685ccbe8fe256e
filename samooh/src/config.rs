//! Configuration loading for Samooh

use crate::error::{FusionError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SamoohConfig {
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub channels: ChannelConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Shared map geometry
#[derive(Clone, Debug, Deserialize)]
pub struct MapConfig {
    /// Cells per side, 1 cell = 1 cm (default: 400)
    #[serde(default = "default_map_size")]
    pub size: usize,

    /// Column index of map x = 0 (default: 200)
    #[serde(default = "default_center")]
    pub center_x: usize,

    /// Row index of map y = 0 (default: 200)
    #[serde(default = "default_center")]
    pub center_y: usize,
}

/// Sensor parameters
#[derive(Clone, Debug, Deserialize)]
pub struct SensorConfig {
    /// IR readings at or beyond this distance (cm) count as "nothing seen" (default: 50)
    #[serde(default = "default_ir_max_range")]
    pub ir_max_range: f64,

    /// Added to camera distance readings (mm) (default: 0)
    #[serde(default)]
    pub camera_mount_offset_mm: i32,
}

/// Display refresh
#[derive(Clone, Debug, Deserialize)]
pub struct DisplayConfig {
    /// Snapshot rate in Hz (default: 5.0)
    #[serde(default = "default_frame_rate")]
    pub frame_rate_hz: f64,
}

/// Channel sizing
#[derive(Clone, Debug, Deserialize)]
pub struct ChannelConfig {
    /// Buffered slots per inbound channel (default: 3)
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

/// Output configuration
#[derive(Clone, Debug, Deserialize)]
pub struct OutputConfig {
    /// Path of the saved map snapshot
    #[serde(default = "default_map_path")]
    pub map_path: String,

    /// Path of the position log
    #[serde(default = "default_position_log_path")]
    pub position_log_path: String,

    /// Save the map when the fusion thread shuts down (default: true)
    #[serde(default = "default_save_on_exit")]
    pub save_on_exit: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            size: default_map_size(),
            center_x: default_center(),
            center_y: default_center(),
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            ir_max_range: default_ir_max_range(),
            camera_mount_offset_mm: 0,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: default_frame_rate(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            map_path: default_map_path(),
            position_log_path: default_position_log_path(),
            save_on_exit: default_save_on_exit(),
        }
    }
}

// Default value functions
fn default_map_size() -> usize {
    400
}
fn default_center() -> usize {
    200
}
fn default_ir_max_range() -> f64 {
    50.0
}
fn default_frame_rate() -> f64 {
    5.0
}
fn default_capacity() -> usize {
    3
}
fn default_map_path() -> String {
    "output/map.csv".to_string()
}
fn default_position_log_path() -> String {
    "output/positions.csv".to_string()
}
fn default_save_on_exit() -> bool {
    true
}

impl SamoohConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FusionError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: SamoohConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the fusion core cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.map.size == 0 {
            return Err(FusionError::Config("map.size must be positive".into()));
        }
        if self.map.center_x >= self.map.size || self.map.center_y >= self.map.size {
            return Err(FusionError::Config(format!(
                "map center ({}, {}) outside a {}-cell grid",
                self.map.center_x, self.map.center_y, self.map.size
            )));
        }
        if !self.sensor.ir_max_range.is_finite() || self.sensor.ir_max_range <= 0.0 {
            return Err(FusionError::Config(
                "sensor.ir_max_range must be positive".into(),
            ));
        }
        if !self.display.frame_rate_hz.is_finite() || self.display.frame_rate_hz <= 0.0 {
            return Err(FusionError::Config(
                "display.frame_rate_hz must be a positive number".into(),
            ));
        }
        if self.channels.capacity == 0 {
            return Err(FusionError::Config(
                "channels.capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Interval between display snapshots
    pub fn display_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.display.frame_rate_hz)
    }
}
