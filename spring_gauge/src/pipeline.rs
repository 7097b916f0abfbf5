// THEORY:
// The `pipeline` module is the top-level API of the gauge. `TrackingSession`
// sequences the whole measurement: read the reference frame, calibrate, find the
// marker's reference position, then fold every later frame into the running
// maximum until the stream ends or the display asks to stop.
//
// The session moves through five phases:
//
//   Uninitialized -> Calibrating -> Initializing -> Tracking -> Finished
//
// Any failure before `Tracking` (no first frame, bad calibration, no marker in
// the reference frame) jumps straight to `Finished` and yields the zero report.
// Frames are processed strictly in order on the calling thread; the frame source
// is owned by the session for the whole run and closed on every exit path.

use crate::collaborators::{FrameSource, FrameUpdate, PointPicker, TrackingDisplay};
use crate::core_modules::calibrator::{CalibrationScale, CalibrationSession, Calibrator};
use crate::core_modules::centroid::extract_centroid;
use crate::core_modules::color_segmenter::{segment, ColorRange};
use crate::core_modules::displacement_tracker::{self, TrackingState};
use crate::core_modules::frame::Frame;
use crate::error::{CalibrationError, GaugeError, SourceError};
use std::fmt;
use tracing::{debug, info, warn};

/// Index given to the reference frame, the first frame of the stream.
pub const REFERENCE_FRAME_INDEX: u64 = 0;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Calibrating,
    Initializing,
    Tracking,
    Finished,
}

/// Validated inputs of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// HSV range of the marker colour.
    pub color_range: ColorRange,
    /// Physical separation of the two calibration points, in millimetres.
    pub real_width_mm: f64,
}

impl SessionConfig {
    pub fn new(real_width_mm: f64) -> Self {
        Self {
            color_range: ColorRange::YELLOW,
            real_width_mm,
        }
    }

    pub fn with_color_range(mut self, color_range: ColorRange) -> Self {
        self.color_range = color_range;
        self
    }
}

/// The final result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplacementReport {
    pub max_displacement_mm: f64,
    pub max_frame_index: u64,
}

impl From<&TrackingState> for DisplacementReport {
    fn from(state: &TrackingState) -> Self {
        Self {
            max_displacement_mm: state.max_displacement_mm,
            max_frame_index: state.max_frame_index,
        }
    }
}

impl fmt::Display for DisplacementReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Maximum displacement: {:.2} mm at frame {}",
            self.max_displacement_mm, self.max_frame_index
        )
    }
}

/// Why a run stopped.
#[derive(Debug)]
pub enum Termination {
    /// The source ran out of frames.
    EndOfStream,
    /// The display requested cancellation.
    Cancelled,
    /// A frame after the reference frame could not be read. Measurements up
    /// to that point are kept.
    SourceFailed(SourceError),
    /// The run failed before tracking started. The report is zero.
    Failed(GaugeError),
}

/// Report plus bookkeeping for a finished run.
#[derive(Debug)]
pub struct SessionOutcome {
    pub report: DisplacementReport,
    pub termination: Termination,
    /// Frames read from the source, the reference frame included.
    pub frames_read: u64,
    /// Frames after the reference frame in which the marker was found.
    pub frames_tracked: u64,
}

impl SessionOutcome {
    /// The fatal error of a failed run.
    pub fn error(&self) -> Option<&GaugeError> {
        match &self.termination {
            Termination::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error().is_some()
    }
}

/// Closes the wrapped source when dropped.
struct SourceGuard<S: FrameSource> {
    source: S,
}

impl<S: FrameSource> SourceGuard<S> {
    fn read_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        self.source.read_frame()
    }
}

impl<S: FrameSource> Drop for SourceGuard<S> {
    fn drop(&mut self) {
        debug!("closing frame source");
        self.source.close();
    }
}

/// Orchestrates calibration, initialisation and tracking over one stream.
pub struct TrackingSession {
    config: SessionConfig,
    phase: SessionPhase,
    scale: Option<CalibrationScale>,
    state: Option<TrackingState>,
    frames_read: u64,
    frames_tracked: u64,
}

impl TrackingSession {
    /// Validates `config` once: the reference width must be finite and
    /// positive and the colour range well-formed.
    pub fn new(config: SessionConfig) -> Result<Self, GaugeError> {
        if !(config.real_width_mm.is_finite() && config.real_width_mm > 0.0) {
            return Err(CalibrationError::NonPositiveWidth(config.real_width_mm).into());
        }
        config.color_range.validate()?;

        Ok(Self {
            config,
            phase: SessionPhase::Uninitialized,
            scale: None,
            state: None,
            frames_read: 0,
            frames_tracked: 0,
        })
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The calibration scale, once calibration has succeeded.
    pub fn scale(&self) -> Option<CalibrationScale> {
        self.scale
    }

    /// The tracking accumulator, once the reference position is known.
    pub fn state(&self) -> Option<&TrackingState> {
        self.state.as_ref()
    }

    /// Runs the session to completion. The source is closed before this
    /// returns, whatever the outcome.
    pub fn run<S, P, D>(&mut self, source: S, mut picker: P, mut display: D) -> SessionOutcome
    where
        S: FrameSource,
        P: PointPicker,
        D: TrackingDisplay,
    {
        self.phase = SessionPhase::Uninitialized;
        self.scale = None;
        self.state = None;
        self.frames_read = 0;
        self.frames_tracked = 0;

        let mut source = SourceGuard { source };
        let result = self.execute(&mut source, &mut picker, &mut display);
        drop(source);

        let (report, termination) = match result {
            Ok(termination) => {
                let report = self.state.as_ref().map(DisplacementReport::from).unwrap_or_default();
                (report, termination)
            }
            Err(error) => {
                warn!("Session failed: {}", error);
                (DisplacementReport::default(), Termination::Failed(error))
            }
        };
        self.transition(SessionPhase::Finished);
        info!(
            frames_read = self.frames_read,
            frames_tracked = self.frames_tracked,
            "{}",
            report
        );

        SessionOutcome {
            report,
            termination,
            frames_read: self.frames_read,
            frames_tracked: self.frames_tracked,
        }
    }

    fn execute<S, P, D>(
        &mut self,
        source: &mut SourceGuard<S>,
        picker: &mut P,
        display: &mut D,
    ) -> Result<Termination, GaugeError>
    where
        S: FrameSource,
        P: PointPicker,
        D: TrackingDisplay,
    {
        // --- 1. Reference Frame ---
        let reference_frame = source.read_frame()?.ok_or(SourceError::NoFirstFrame)?;
        self.frames_read += 1;
        info!(
            width = reference_frame.width(),
            height = reference_frame.height(),
            "read reference frame"
        );
        self.transition(SessionPhase::Calibrating);

        // --- 2. Calibration ---
        let mut calibration = CalibrationSession::new();
        picker.collect_points(&reference_frame, &mut calibration)?;
        let scale = Calibrator::calibrate(&calibration, self.config.real_width_mm)?;
        info!(mm_per_pixel = scale.mm_per_pixel(), "calibrated");
        self.scale = Some(scale);
        self.transition(SessionPhase::Initializing);

        // --- 3. Reference Position ---
        let reference_mask = segment(&reference_frame, &self.config.color_range);
        let initial_centroid = extract_centroid(&reference_mask).ok_or(GaugeError::NoObjectDetected)?;
        info!(x = initial_centroid.x, y = initial_centroid.y, "marker reference position");
        drop(reference_mask);
        drop(reference_frame);
        self.transition(SessionPhase::Tracking);
        let state = self.state.insert(TrackingState::new(initial_centroid, REFERENCE_FRAME_INDEX));

        // --- 4. Tracking Loop ---
        let mut frame_index = REFERENCE_FRAME_INDEX;
        loop {
            let frame = match source.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("end of stream after {} frames", self.frames_read);
                    return Ok(Termination::EndOfStream);
                }
                Err(error) => {
                    warn!("stopping on unreadable frame: {}", error);
                    return Ok(Termination::SourceFailed(error));
                }
            };
            frame_index += 1;
            self.frames_read += 1;

            let mask = segment(&frame, &self.config.color_range);
            let centroid = extract_centroid(&mask);

            let sample = displacement_tracker::update(state, centroid, frame_index, scale);
            match sample {
                Some(sample) => {
                    self.frames_tracked += 1;
                    debug!(frame_index, displacement_mm = sample.displacement_mm, "tracked frame");
                }
                None => debug!(frame_index, "marker not detected"),
            }

            let update = FrameUpdate {
                frame_index,
                frame: &frame,
                mask: &mask,
                centroid,
                sample,
                max_displacement_mm: state.max_displacement_mm,
            };
            if display.show(&update) {
                info!(frame_index, "tracking cancelled");
                return Ok(Termination::Cancelled);
            }
        }
    }

    fn transition(&mut self, next: SessionPhase) {
        debug!(from = ?self.phase, to = ?next, "session phase change");
        self.phase = next;
    }
}
