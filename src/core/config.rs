//! Configuration for the tiled viewport.
//!
//! Every section has serde defaults so a partial JSON document (or an empty
//! one) yields a usable configuration. Viewports and layers take their own
//! copy at construction; nothing here is shared by reference afterwards.

use crate::{
    core::constants::{
        DEFAULT_MAX_ZOOM_LEVEL, DEFAULT_MIN_ZOOM_LEVEL, DEFAULT_MOVE_THROTTLE, TILE_SIZE,
    },
    Result, ViewerError,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub grid: GridConfig,
    pub zoom: ZoomConfig,
    pub interaction: InteractionConfig,
    /// Stack a debug layer on top of every other layer.
    pub debug_layer: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Edge length of a square tile in pixels.
    pub tile_size: u32,
    /// Initial viewport size in pixels.
    pub viewport_width: f64,
    pub viewport_height: f64,
}

impl GridConfig {
    pub fn tile_size_f64(&self) -> f64 {
        self.tile_size as f64
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
            viewport_width: 1024.0,
            viewport_height: 768.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub min_zoom_level: i32,
    pub max_zoom_level: i32,
    pub initial_zoom_level: i32,
}

impl ZoomConfig {
    pub fn clamp(&self, level: i32) -> i32 {
        level.clamp(self.min_zoom_level, self.max_zoom_level)
    }
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min_zoom_level: DEFAULT_MIN_ZOOM_LEVEL,
            max_zoom_level: DEFAULT_MAX_ZOOM_LEVEL,
            initial_zoom_level: DEFAULT_MIN_ZOOM_LEVEL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Apply only every n-th pointer move during a drag. 1 disables throttling.
    pub move_throttle: u32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            move_throttle: DEFAULT_MOVE_THROTTLE,
        }
    }
}

impl ViewerConfig {
    /// Parse a configuration from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ViewerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid.tile_size == 0 {
            return Err(ViewerError::InvalidConfig(
                "tile_size must be greater than zero".to_string(),
            ));
        }
        if !(self.grid.viewport_width.is_finite() && self.grid.viewport_width > 0.0)
            || !(self.grid.viewport_height.is_finite() && self.grid.viewport_height > 0.0)
        {
            return Err(ViewerError::InvalidConfig(format!(
                "viewport size must be positive, got {}x{}",
                self.grid.viewport_width, self.grid.viewport_height
            )));
        }
        if self.zoom.min_zoom_level > self.zoom.max_zoom_level {
            return Err(ViewerError::InvalidConfig(format!(
                "min_zoom_level {} exceeds max_zoom_level {}",
                self.zoom.min_zoom_level, self.zoom.max_zoom_level
            )));
        }
        if self.interaction.move_throttle == 0 {
            return Err(ViewerError::InvalidConfig(
                "move_throttle must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
