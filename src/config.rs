//! Map configuration.
//!
//! The projection constants and zoom limits are fixed defaults that can be
//! overridden from JSON. In the browser the overrides are persisted to
//! localStorage so they survive page reloads.

use serde::{Deserialize, Serialize};

/// Errors raised while reading a configuration document.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// The document is not valid JSON or has fields of the wrong type.
    Parse(String),
    /// A value is outside the range the projection or zoom can use.
    Invalid(String),
    /// localStorage is unavailable or refused the write.
    Storage(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
            ConfigError::Storage(msg) => write!(f, "Config storage error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Projection parameters shared by every map layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Projection scale factor.
    pub scale: f64,
    /// Latitude the map is centered on, in degrees.
    pub latitude: f64,
    /// Longitude used as the central meridian, in degrees.
    pub longitude: f64,
    /// Pixel position the center projects to.
    pub translate: [f64; 2],
    /// Pan/zoom interaction limits.
    pub zoom: ZoomConfig,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            scale: 350_000.0,
            // San Francisco city hall
            latitude: 37.7749,
            longitude: -122.4194,
            translate: [480.0, 250.0],
            zoom: ZoomConfig::default(),
        }
    }
}

/// Zoom limits and the stroke width that is kept constant on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Stroke width in pixels at scale 1.
    pub stroke_width: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min_scale: 1.0,
            max_scale: 8.0,
            stroke_width: 1.5,
        }
    }
}

impl ZoomConfig {
    /// Returns the scale extent as `(min, max)`.
    ///
    /// Always ordered and free of NaN: a NaN bound falls back to its default
    /// and swapped bounds are put back in order.
    pub fn scale_extent(&self) -> (f64, f64) {
        let defaults = ZoomConfig::default();
        let min = if self.min_scale.is_nan() {
            defaults.min_scale
        } else {
            self.min_scale
        };
        let max = if self.max_scale.is_nan() {
            defaults.max_scale
        } else {
            self.max_scale
        };
        if min <= max {
            (min, max)
        } else {
            (max, min)
        }
    }
}

impl MapConfig {
    /// localStorage key for persisting the configuration.
    #[cfg(target_arch = "wasm32")]
    const STORAGE_KEY: &'static str = "sfmap_config";

    /// Rotation applied before projecting, as `[lambda, phi, gamma]` degrees.
    ///
    /// Rotating by the negated longitude puts the configured meridian at the
    /// center of the cone.
    pub fn rotate(&self) -> [f64; 3] {
        [-self.longitude, 0.0, 0.0]
    }

    /// Projection center as `[longitude, latitude]` after rotation.
    pub fn center(&self) -> [f64; 2] {
        [0.0, self.latitude]
    }

    /// Parses a configuration document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: MapConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the values describe a usable projection and zoom extent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ConfigError::Invalid(format!(
                "latitude out of range: {}",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ConfigError::Invalid(format!(
                "longitude out of range: {}",
                self.longitude
            )));
        }
        let (min, max) = (self.zoom.min_scale, self.zoom.max_scale);
        if !(min > 0.0 && min <= max) {
            return Err(ConfigError::Invalid(format!(
                "bad zoom extent [{}, {}]",
                min, max
            )));
        }
        Ok(())
    }

    /// Load the configuration from localStorage, falling back to defaults.
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let json = match local_storage().map(|s| s.get_item(Self::STORAGE_KEY)) {
            Ok(Ok(Some(json))) => json,
            Ok(_) => return Self::default(),
            Err(e) => {
                log::warn!("{}, using defaults", e);
                return Self::default();
            }
        };

        Self::from_json_str(&json).unwrap_or_else(|e| {
            log::warn!("{}, using defaults", e);
            Self::default()
        })
    }

    /// Validates the configuration and persists it for the next page load.
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) -> Result<(), ConfigError> {
        self.validate()?;
        let json = serde_json::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        local_storage()?
            .set_item(Self::STORAGE_KEY, &json)
            .map_err(|e| ConfigError::Storage(format!("{:?}", e)))?;
        log::info!("Saved map config ({} bytes)", json.len());
        Ok(())
    }

    /// Native builds have no persistent store; always the defaults.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }
}

#[cfg(target_arch = "wasm32")]
fn local_storage() -> Result<web_sys::Storage, ConfigError> {
    web_sys::window()
        .ok_or_else(|| ConfigError::Storage("No window object".to_string()))?
        .local_storage()
        .map_err(|e| ConfigError::Storage(format!("{:?}", e)))?
        .ok_or_else(|| ConfigError::Storage("localStorage not available".to_string()))
}
