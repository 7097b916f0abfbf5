// THEORY:
// The measurement core never decodes video, opens windows or listens for mouse
// clicks. Those jobs belong to collaborators behind three small traits:
//
// - `FrameSource`: sequential, forward-only frames, ending with `Ok(None)`.
// - `PointPicker`: shows the reference frame and records the user's clicks into
//   a `CalibrationSession` lent to it by the session.
// - `TrackingDisplay`: receives every processed frame and answers whether the
//   user asked to stop.
//
// Headless runs use `FixedPoints` and `NullDisplay`; the OpenCV viewer provides
// interactive implementations.

use crate::core_modules::calibrator::CalibrationSession;
use crate::core_modules::centroid::PixelPoint;
use crate::core_modules::color_segmenter::Mask;
use crate::core_modules::displacement_tracker::DisplacementSample;
use crate::core_modules::frame::Frame;
use crate::error::{CalibrationError, SourceError};

/// A sequential supplier of frames.
pub trait FrameSource {
    /// Blocks until the next frame is available. `Ok(None)` marks the end of
    /// the stream.
    fn read_frame(&mut self) -> Result<Option<Frame>, SourceError>;

    /// Releases the underlying handle. Called exactly once by the session.
    fn close(&mut self);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        (**self).read_frame()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Collects calibration clicks.
pub trait PointPicker {
    /// Presents `frame` and records clicks into `session` in click order,
    /// returning once the user confirms. Blocks for as long as that takes.
    fn collect_points(&mut self, frame: &Frame, session: &mut CalibrationSession) -> Result<(), CalibrationError>;
}

impl<P: PointPicker + ?Sized> PointPicker for &mut P {
    fn collect_points(&mut self, frame: &Frame, session: &mut CalibrationSession) -> Result<(), CalibrationError> {
        (**self).collect_points(frame, session)
    }
}

/// Everything a display needs to render one processed frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameUpdate<'a> {
    pub frame_index: u64,
    pub frame: &'a Frame,
    pub mask: &'a Mask,
    /// Marker position in this frame, if it was found.
    pub centroid: Option<PixelPoint>,
    /// This frame's displacement, if the marker was found.
    pub sample: Option<DisplacementSample>,
    /// The running maximum after this frame.
    pub max_displacement_mm: f64,
}

/// Receives processed frames and reports user cancellation.
pub trait TrackingDisplay {
    /// Renders `update`. Returns `true` when the user asked to stop.
    fn show(&mut self, update: &FrameUpdate<'_>) -> bool;
}

impl<D: TrackingDisplay + ?Sized> TrackingDisplay for &mut D {
    fn show(&mut self, update: &FrameUpdate<'_>) -> bool {
        (**self).show(update)
    }
}

/// A picker that replays a fixed list of points, for headless runs.
#[derive(Debug, Clone, Default)]
pub struct FixedPoints {
    points: Vec<PixelPoint>,
}

impl FixedPoints {
    pub fn new(points: impl IntoIterator<Item = PixelPoint>) -> Self {
        Self {
            points: points.into_iter().collect(),
        }
    }
}

impl PointPicker for FixedPoints {
    fn collect_points(&mut self, _frame: &Frame, session: &mut CalibrationSession) -> Result<(), CalibrationError> {
        for point in &self.points {
            session.record_point(*point);
        }
        Ok(())
    }
}

/// A display that shows nothing and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDisplay;

impl TrackingDisplay for NullDisplay {
    fn show(&mut self, _update: &FrameUpdate<'_>) -> bool {
        false
    }
}
