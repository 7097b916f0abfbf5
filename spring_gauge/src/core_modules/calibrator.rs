// THEORY:
// The `calibrator` converts two user-picked reference points with a known
// physical separation into a millimetres-per-pixel scale. It runs once, before
// any tracking, and its output is immutable for the rest of the run.
//
// Key principles:
// 1.  **Explicit Session Object**: Clicks are accumulated in a
//     `CalibrationSession` owned by the orchestrator and lent to whatever UI
//     collects them. The UI never keeps its own list.
// 2.  **Click Order Matters**: The first two recorded points are the reference
//     pair. Anything recorded after that is ignored.
// 3.  **Validated Scale**: A `CalibrationScale` can only be constructed finite
//     and strictly positive. Downstream arithmetic never re-checks it.

use crate::core_modules::centroid::PixelPoint;
use crate::error::CalibrationError;
use tracing::debug;

/// The number of reference points a calibration needs.
pub const REQUIRED_POINTS: usize = 2;

/// Millimetres per pixel. Always finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct CalibrationScale(f64);

impl CalibrationScale {
    pub fn new(mm_per_pixel: f64) -> Option<Self> {
        if mm_per_pixel.is_finite() && mm_per_pixel > 0.0 {
            Some(Self(mm_per_pixel))
        } else {
            None
        }
    }

    pub fn mm_per_pixel(&self) -> f64 {
        self.0
    }

    /// Converts a pixel length to millimetres.
    pub fn to_mm(&self, pixels: f64) -> f64 {
        pixels * self.0
    }
}

/// Collects reference points in click order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationSession {
    points: Vec<PixelPoint>,
}

impl CalibrationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a click. Returns `false` once the session already has both
    /// points; the extra click is dropped.
    pub fn record_point(&mut self, point: PixelPoint) -> bool {
        if self.is_complete() {
            debug!(?point, "ignoring calibration point beyond the first two");
            return false;
        }
        debug!(?point, index = self.points.len(), "recorded calibration point");
        self.points.push(point);
        true
    }

    pub fn is_complete(&self) -> bool {
        self.points.len() >= REQUIRED_POINTS
    }

    /// The points recorded so far, in click order.
    pub fn points(&self) -> &[PixelPoint] {
        &self.points
    }
}

/// Computes `real_width_mm / pixel_distance(point_a, point_b)`.
pub fn compute_scale(
    point_a: PixelPoint,
    point_b: PixelPoint,
    real_width_mm: f64,
) -> Result<CalibrationScale, CalibrationError> {
    if !(real_width_mm.is_finite() && real_width_mm > 0.0) {
        return Err(CalibrationError::NonPositiveWidth(real_width_mm));
    }

    let pixel_distance = point_a.distance_to(&point_b);
    if pixel_distance == 0.0 {
        return Err(CalibrationError::ZeroPixelDistance);
    }

    let mm_per_pixel = real_width_mm / pixel_distance;
    CalibrationScale::new(mm_per_pixel).ok_or(CalibrationError::ScaleOutOfRange(mm_per_pixel))
}

/// Turns a finished `CalibrationSession` into a scale.
pub struct Calibrator;

impl Calibrator {
    /// Uses the first two recorded points. Fails when fewer than two were
    /// recorded, when they coincide, or when the width is not positive.
    pub fn calibrate(session: &CalibrationSession, real_width_mm: f64) -> Result<CalibrationScale, CalibrationError> {
        match session.points() {
            [point_a, point_b, ..] => compute_scale(*point_a, *point_b, real_width_mm),
            points => Err(CalibrationError::NotEnoughPoints { got: points.len() }),
        }
    }
}
