// THEORY:
// This file is the entry point of the `spring_gauge` library crate. It exposes
// the measurement pipeline that turns a video of a colour-marked object into a
// physical displacement: a one-time two-point calibration, per-frame HSV
// segmentation and centroid extraction, and a running maximum of the distance
// from the marker's starting position.
//
// `pipeline::TrackingSession` is the high-level interface. The `core_modules`
// are pure functions and small state holders that can be used and tested on
// their own against synthetic frames. Decoding video, drawing windows and
// collecting clicks are left to implementations of the `collaborators` traits.

pub mod collaborators;
pub mod config;
pub mod core_modules;
pub mod error;
pub mod image_sequence;
pub mod pipeline;

pub use collaborators::{FixedPoints, FrameSource, FrameUpdate, NullDisplay, PointPicker, TrackingDisplay};
pub use config::GaugeConfig;
pub use core_modules::calibrator::{CalibrationScale, CalibrationSession, Calibrator};
pub use core_modules::centroid::{extract_centroid, PixelPoint};
pub use core_modules::color_segmenter::{segment, ColorRange, Mask};
pub use core_modules::displacement_tracker::{DisplacementSample, TrackingState};
pub use core_modules::frame::{Frame, Hsv};
pub use error::{CalibrationError, ConfigError, GaugeError, SourceError};
pub use image_sequence::ImageSequenceSource;
pub use pipeline::{DisplacementReport, SessionConfig, SessionOutcome, SessionPhase, Termination, TrackingSession};
