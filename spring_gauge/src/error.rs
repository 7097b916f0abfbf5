// THEORY:
// Every failure the measurement pipeline can report lives here. The pipeline
// distinguishes between failures that end a run before any measurement is made
// (source, calibration, missing marker in the reference frame) and conditions
// that are simply part of the data (a frame without the marker, end of stream).
// Only the former are errors; the latter never reach this module.

use std::path::PathBuf;
use thiserror::Error;

/// The frame source could not be opened or could not deliver a frame.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("could not open frame source `{path}`: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("frame source yielded no first frame")]
    NoFirstFrame,

    #[error("failed to read frame {index}: {reason}")]
    Read { index: u64, reason: String },

    #[error("failed to decode `{path}`")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Calibration could not produce a usable millimetres-per-pixel scale.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("calibration needs two points, got {got}")]
    NotEnoughPoints { got: usize },

    #[error("calibration points are identical, pixel distance is zero")]
    ZeroPixelDistance,

    #[error("reference width must be a positive number of millimetres, got {0}")]
    NonPositiveWidth(f64),

    #[error("calibration produced an unusable scale of {0} mm per pixel")]
    ScaleOutOfRange(f64),

    #[error("calibration interface failed: {0}")]
    Interface(String),
}

/// Configuration file or command-line values that cannot be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config `{path}`")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config `{path}`")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid colour range: {0}")]
    InvalidColorRange(String),
}

/// Fatal, run-ending failures of a tracking session.
#[derive(Debug, Error)]
pub enum GaugeError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no object matching the colour range was detected in the first frame")]
    NoObjectDetected,
}
