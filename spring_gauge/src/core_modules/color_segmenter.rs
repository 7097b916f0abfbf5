// THEORY:
// The `color_segmenter` turns a frame into a binary mask: every pixel whose HSV
// value falls inside the configured `ColorRange` becomes 255, every other pixel
// becomes 0. The mask has exactly the frame's dimensions and is the only input
// the centroid extraction needs.
//
// Segmentation is a pure function of (frame, range). It keeps no state between
// frames, so the same frame and range always produce a bit-identical mask.

use crate::core_modules::frame::{Frame, Hsv, HUE_MAX};
use crate::error::ConfigError;
use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

/// Mask value for a pixel inside the colour range.
pub const MASK_ON: u8 = 255;
/// Mask value for a pixel outside the colour range.
pub const MASK_OFF: u8 = 0;

/// A binary per-pixel indicator aligned with the frame it was computed from.
pub type Mask = GrayImage;

/// Inclusive lower/upper bounds over hue, saturation and value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    #[serde(with = "hsv_triplet")]
    pub lower: Hsv,
    #[serde(with = "hsv_triplet")]
    pub upper: Hsv,
}

impl ColorRange {
    /// The yellow marker range: hue 20..=30, saturation and value 100..=255.
    pub const YELLOW: ColorRange = ColorRange {
        lower: Hsv::new(20, 100, 100),
        upper: Hsv::new(30, 255, 255),
    };

    pub fn new(lower: Hsv, upper: Hsv) -> Result<Self, ConfigError> {
        let range = Self { lower, upper };
        range.validate()?;
        Ok(range)
    }

    /// Checks that each lower bound is at most its upper bound and that hue
    /// bounds stay on the 0..=179 scale.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (lower, upper) = (self.lower, self.upper);
        if lower.h > HUE_MAX || upper.h > HUE_MAX {
            return Err(ConfigError::InvalidColorRange(format!(
                "hue bounds must be within 0..={HUE_MAX}, got {}..={}",
                lower.h, upper.h
            )));
        }
        for (name, low, high) in [("hue", lower.h, upper.h), ("saturation", lower.s, upper.s), ("value", lower.v, upper.v)] {
            if low > high {
                return Err(ConfigError::InvalidColorRange(format!(
                    "{name} lower bound {low} exceeds upper bound {high}"
                )));
            }
        }
        Ok(())
    }

    /// True when every channel of `hsv` lies within the inclusive bounds.
    pub fn contains(&self, hsv: Hsv) -> bool {
        (self.lower.h..=self.upper.h).contains(&hsv.h)
            && (self.lower.s..=self.upper.s).contains(&hsv.s)
            && (self.lower.v..=self.upper.v).contains(&hsv.v)
    }
}

impl Default for ColorRange {
    fn default() -> Self {
        Self::YELLOW
    }
}

/// Produces the mask of pixels in `frame` that match `range`.
pub fn segment(frame: &Frame, range: &ColorRange) -> Mask {
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        if range.contains(frame.hsv_at(x, y)) {
            Luma([MASK_ON])
        } else {
            Luma([MASK_OFF])
        }
    })
}

/// (De)serialises an `Hsv` bound as a plain `[h, s, v]` array, the form used in
/// configuration files.
mod hsv_triplet {
    use super::Hsv;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(hsv: &Hsv, serializer: S) -> Result<S::Ok, S::Error> {
        [hsv.h, hsv.s, hsv.v].serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hsv, D::Error> {
        let [h, s, v] = <[u8; 3]>::deserialize(deserializer)?;
        Ok(Hsv::new(h, s, v))
    }
}
