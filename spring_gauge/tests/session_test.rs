use image::{Rgb, RgbImage};
use spring_gauge::{
    CalibrationError, CalibrationSession, DisplacementReport, FixedPoints, Frame, FrameSource, FrameUpdate, GaugeError,
    ImageSequenceSource, NullDisplay, PixelPoint, PointPicker, SessionConfig, SessionPhase, SourceError, Termination, TrackingDisplay, TrackingSession,
};
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

const WIDTH: u32 = 320;
const HEIGHT: u32 = 200;
const BACKGROUND: Rgb<u8> = Rgb([30, 30, 140]);
const MARKER: Rgb<u8> = Rgb([255, 200, 0]);

/// A frame with a 5x5 marker centred on `center`, or no marker at all.
fn synthetic_frame(center: Option<(u32, u32)>) -> Frame {
    let mut image = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);
    if let Some((cx, cy)) = center {
        for y in cy - 2..=cy + 2 {
            for x in cx - 2..=cx + 2 {
                image.put_pixel(x, y, MARKER);
            }
        }
    }
    Frame::new(image)
}

/// In-memory frame source. Entries that are `Err` simulate unreadable frames.
struct VecSource {
    frames: VecDeque<Result<Frame, String>>,
    closes: Rc<Cell<u32>>,
}

impl VecSource {
    fn new(frames: Vec<Frame>) -> (Self, Rc<Cell<u32>>) {
        Self::with_results(frames.into_iter().map(Ok).collect())
    }

    fn with_results(frames: Vec<Result<Frame, String>>) -> (Self, Rc<Cell<u32>>) {
        let closes = Rc::new(Cell::new(0));
        let source = Self {
            frames: frames.into(),
            closes: Rc::clone(&closes),
        };
        (source, closes)
    }
}

impl FrameSource for VecSource {
    fn read_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        match self.frames.pop_front() {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(reason)) => Err(SourceError::Read { index: 0, reason }),
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        self.closes.set(self.closes.get() + 1);
    }
}

/// Records what the display saw and cancels after a given frame.
#[derive(Default)]
struct RecordingDisplay {
    cancel_at: Option<u64>,
    seen: Vec<(u64, Option<f64>, f64)>,
}

impl TrackingDisplay for RecordingDisplay {
    fn show(&mut self, update: &FrameUpdate<'_>) -> bool {
        assert_eq!(update.mask.dimensions(), (update.frame.width(), update.frame.height()));
        self.seen.push((
            update.frame_index,
            update.sample.map(|s| s.displacement_mm),
            update.max_displacement_mm,
        ));
        self.cancel_at == Some(update.frame_index)
    }
}

/// A calibration UI whose window system fails after one click.
struct BrokenPicker;

impl PointPicker for BrokenPicker {
    fn collect_points(&mut self, _frame: &Frame, session: &mut CalibrationSession) -> Result<(), CalibrationError> {
        session.record_point(PixelPoint::new(100, 40));
        Err(CalibrationError::Interface("window closed".to_string()))
    }
}

fn calibration_100px() -> FixedPoints {
    FixedPoints::new([PixelPoint::new(100, 40), PixelPoint::new(200, 40)])
}

fn session_50mm() -> TrackingSession {
    TrackingSession::new(SessionConfig::new(50.0)).expect("valid session config")
}

#[test]
fn linear_motion_reaches_fifty_millimetres_at_last_frame() {
    let frames = (0..10u32).map(|i| synthetic_frame(Some((100 + 100 * i / 9, 100)))).collect();
    let (source, closes) = VecSource::new(frames);
    let mut session = session_50mm();

    let outcome = session.run(source, calibration_100px(), NullDisplay);

    assert!(matches!(outcome.termination, Termination::EndOfStream));
    assert_eq!(format!("{:.2}", outcome.report.max_displacement_mm), "50.00");
    assert_eq!(outcome.report.max_frame_index, 9);
    assert_eq!(outcome.frames_read, 10);
    assert_eq!(outcome.frames_tracked, 9);
    assert_eq!(outcome.report.to_string(), "Maximum displacement: 50.00 mm at frame 9");
    assert_eq!(session.scale().map(|s| s.mm_per_pixel()), Some(0.5));
    assert_eq!(session.state().map(|s| s.initial_centroid), Some(PixelPoint::new(100, 100)));
    assert_eq!(session.phase(), SessionPhase::Finished);
    assert_eq!(closes.get(), 1);
}

#[test]
fn empty_frames_do_not_change_the_result() {
    let positions = [Some(100), Some(110), None, None, Some(130)];
    let full: Vec<Frame> = positions
        .iter()
        .map(|x| synthetic_frame(x.map(|x| (x, 100))))
        .collect();
    let reduced: Vec<Frame> = positions
        .iter()
        .flatten()
        .map(|x| synthetic_frame(Some((*x, 100))))
        .collect();

    let mut display = RecordingDisplay::default();
    let (source, _) = VecSource::new(full);
    let with_gaps = session_50mm().run(source, calibration_100px(), &mut display);

    let (source, _) = VecSource::new(reduced);
    let without_gaps = session_50mm().run(source, calibration_100px(), NullDisplay);

    assert_eq!(with_gaps.report.max_displacement_mm, 15.0);
    assert_eq!(with_gaps.report.max_displacement_mm, without_gaps.report.max_displacement_mm);
    // Same physical frame: the last one, whose position shifts by the two removed frames.
    assert_eq!(with_gaps.report.max_frame_index, 4);
    assert_eq!(without_gaps.report.max_frame_index, 2);
    assert_eq!(with_gaps.frames_tracked, without_gaps.frames_tracked);

    // The gap frames reach the display without a sample and with the maximum held.
    assert_eq!(
        display.seen,
        vec![(1, Some(5.0), 5.0), (2, None, 5.0), (3, None, 5.0), (4, Some(15.0), 15.0)]
    );
}

#[test]
fn equal_displacement_later_keeps_first_frame() {
    let xs = [100, 120, 80, 120];
    let frames = xs.iter().map(|x| synthetic_frame(Some((*x, 100)))).collect();
    let (source, _) = VecSource::new(frames);

    let outcome = session_50mm().run(source, calibration_100px(), NullDisplay);

    assert_eq!(outcome.report.max_displacement_mm, 10.0);
    assert_eq!(outcome.report.max_frame_index, 1);
}

#[test]
fn missing_first_frame_reports_zero() {
    let (source, closes) = VecSource::new(Vec::new());
    let mut session = session_50mm();

    let outcome = session.run(source, calibration_100px(), NullDisplay);

    assert!(matches!(
        outcome.error(),
        Some(GaugeError::Source(SourceError::NoFirstFrame))
    ));
    assert_eq!(outcome.report.max_displacement_mm, 0.0);
    assert_eq!(outcome.report.max_frame_index, 0);
    assert_eq!(outcome.frames_read, 0);
    assert_eq!(session.phase(), SessionPhase::Finished);
    assert_eq!(closes.get(), 1);
}

#[test]
fn unreadable_first_frame_is_a_source_error() {
    let (source, closes) = VecSource::with_results(vec![Err("corrupt".to_string())]);

    let outcome = session_50mm().run(source, calibration_100px(), NullDisplay);

    assert!(matches!(outcome.error(), Some(GaugeError::Source(SourceError::Read { .. }))));
    assert_eq!(outcome.report, DisplacementReport::default());
    assert_eq!(closes.get(), 1);
}

#[test]
fn no_marker_in_first_frame_fails_before_tracking() {
    let frames = vec![synthetic_frame(None), synthetic_frame(Some((150, 100)))];
    let (source, closes) = VecSource::new(frames);
    let mut session = session_50mm();

    let outcome = session.run(source, calibration_100px(), NullDisplay);

    assert!(matches!(outcome.error(), Some(GaugeError::NoObjectDetected)));
    assert_eq!(outcome.report, DisplacementReport::default());
    assert_eq!(outcome.frames_read, 1);
    assert!(session.scale().is_some());
    assert!(session.state().is_none());
    assert_eq!(closes.get(), 1);
}

#[test]
fn identical_calibration_points_fail() {
    let frames = vec![synthetic_frame(Some((100, 100))), synthetic_frame(Some((150, 100)))];
    let (source, closes) = VecSource::new(frames);
    let same = FixedPoints::new([PixelPoint::new(10, 10), PixelPoint::new(10, 10)]);

    let outcome = session_50mm().run(source, same, NullDisplay);

    assert!(matches!(
        outcome.error(),
        Some(GaugeError::Calibration(CalibrationError::ZeroPixelDistance))
    ));
    assert_eq!(outcome.report, DisplacementReport::default());
    assert_eq!(closes.get(), 1);
}

#[test]
fn single_calibration_point_fails() {
    let (source, _) = VecSource::new(vec![synthetic_frame(Some((100, 100)))]);
    let one = FixedPoints::new([PixelPoint::new(10, 10)]);

    let outcome = session_50mm().run(source, one, NullDisplay);

    assert!(matches!(
        outcome.error(),
        Some(GaugeError::Calibration(CalibrationError::NotEnoughPoints { got: 1 }))
    ));
}

#[test]
fn calibration_interface_failure_closes_the_source() {
    let frames = vec![synthetic_frame(Some((100, 100))), synthetic_frame(Some((150, 100)))];
    let (source, closes) = VecSource::new(frames);
    let mut session = session_50mm();

    let outcome = session.run(source, BrokenPicker, NullDisplay);

    assert!(matches!(
        outcome.error(),
        Some(GaugeError::Calibration(CalibrationError::Interface(reason))) if reason == "window closed"
    ));
    assert_eq!(outcome.report, DisplacementReport::default());
    assert_eq!(outcome.frames_read, 1);
    assert!(session.scale().is_none());
    assert_eq!(session.phase(), SessionPhase::Finished);
    assert_eq!(closes.get(), 1);
}

#[test]
fn cancellation_stops_after_the_current_frame() {
    let frames = (0..8u32).map(|i| synthetic_frame(Some((100 + 10 * i, 100)))).collect();
    let (source, closes) = VecSource::new(frames);
    let mut display = RecordingDisplay {
        cancel_at: Some(3),
        ..Default::default()
    };

    let outcome = session_50mm().run(source, calibration_100px(), &mut display);

    assert!(matches!(outcome.termination, Termination::Cancelled));
    assert_eq!(outcome.report.max_displacement_mm, 15.0);
    assert_eq!(outcome.report.max_frame_index, 3);
    assert_eq!(outcome.frames_read, 4);
    assert_eq!(display.seen.len(), 3);
    assert_eq!(closes.get(), 1);
}

#[test]
fn read_error_mid_stream_keeps_measurements() {
    let frames = vec![
        Ok(synthetic_frame(Some((100, 100)))),
        Ok(synthetic_frame(Some((140, 100)))),
        Err("decoder hiccup".to_string()),
        Ok(synthetic_frame(Some((200, 100)))),
    ];
    let (source, closes) = VecSource::with_results(frames);

    let outcome = session_50mm().run(source, calibration_100px(), NullDisplay);

    assert!(matches!(outcome.termination, Termination::SourceFailed(_)));
    assert!(!outcome.is_failure());
    assert_eq!(outcome.report.max_displacement_mm, 20.0);
    assert_eq!(outcome.report.max_frame_index, 1);
    assert_eq!(closes.get(), 1);
}

#[test]
fn image_sequence_directory_runs_end_to_end() {
    let dir = std::env::temp_dir().join(format!("spring_gauge_session_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create frame dir");
    for (i, x) in [100u32, 130, 160, 120].iter().enumerate() {
        synthetic_frame(Some((*x, 100)))
            .image()
            .save(dir.join(format!("frame_{i:03}.png")))
            .expect("write frame");
    }

    let source = ImageSequenceSource::open(&dir).expect("open frame dir");
    let outcome = session_50mm().run(source, calibration_100px(), NullDisplay);

    assert!(matches!(outcome.termination, Termination::EndOfStream));
    assert_eq!(outcome.report.max_displacement_mm, 30.0);
    assert_eq!(outcome.report.max_frame_index, 2);

    std::fs::remove_dir_all(&dir).ok();
}
