// THEORY:
// `GaugeConfig` is the optional on-disk form of a session's settings. It only
// carries values; validation that depends on more than one value (a usable
// scale, a marker in the first frame) happens when the session runs.
//
// Key principles:
// 1.  **Everything Optional**: An empty file is a valid config. Missing values
//     fall back to the defaults or to command-line flags.
// 2.  **Strict Keys**: Unknown keys are rejected so a misspelt setting is not
//     silently ignored.
// 3.  **Validated Range**: The colour range is checked on load, before a
//     session is ever built from it.

use crate::core_modules::centroid::PixelPoint;
use crate::core_modules::color_segmenter::ColorRange;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings read from a TOML file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GaugeConfig {
    /// Physical separation of the two calibration points, in millimetres.
    pub reference_width_mm: Option<f64>,
    /// HSV range of the marker colour.
    pub color: ColorRange,
    /// Pre-recorded calibration clicks for headless runs.
    pub calibration: Option<CalibrationPoints>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationPoints {
    pub point_a: [i32; 2],
    pub point_b: [i32; 2],
}

impl CalibrationPoints {
    pub fn points(&self) -> [PixelPoint; 2] {
        [
            PixelPoint::new(self.point_a[0], self.point_a[1]),
            PixelPoint::new(self.point_b[0], self.point_b[1]),
        ]
    }
}

impl GaugeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: GaugeConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.color.validate()?;
        Ok(config)
    }
}
