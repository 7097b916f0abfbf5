use crate::video::{frame_to_bgr_mat, mask_to_mat};
use opencv::{
    core::{Mat, Point, Scalar},
    highgui, imgproc,
    prelude::*,
};
use spring_gauge::{CalibrationError, CalibrationSession, Frame, FrameUpdate, PixelPoint, PointPicker, TrackingDisplay};
use std::sync::mpsc;
use tracing::warn;

const CALIBRATION_WINDOW: &str = "Calibration";
const ORIGINAL_WINDOW: &str = "Original";
const MASK_WINDOW: &str = "Mask";

const QUIT_KEY: i32 = b'q' as i32;
const KEY_POLL_MS: i32 = 20;

fn red() -> Scalar {
    Scalar::new(0.0, 0.0, 255.0, 0.0)
}

fn green() -> Scalar {
    Scalar::new(0.0, 255.0, 0.0, 0.0)
}

fn to_cv(point: PixelPoint) -> Point {
    Point::new(point.x, point.y)
}

/// Shows the reference frame and records left clicks until a key is pressed.
pub struct ClickCalibration;

impl ClickCalibration {
    fn run(&mut self, frame: &Frame, session: &mut CalibrationSession) -> anyhow::Result<()> {
        let mut canvas = frame_to_bgr_mat(frame)?;

        let (clicks_tx, clicks_rx) = mpsc::channel::<PixelPoint>();
        highgui::named_window(CALIBRATION_WINDOW, highgui::WINDOW_AUTOSIZE)?;
        highgui::set_mouse_callback(
            CALIBRATION_WINDOW,
            Some(Box::new(move |event, x, y, _flags| {
                if event == highgui::EVENT_LBUTTONDOWN {
                    let _ = clicks_tx.send(PixelPoint::new(x, y));
                }
            })),
        )?;
        highgui::imshow(CALIBRATION_WINDOW, &canvas)?;

        loop {
            for point in clicks_rx.try_iter() {
                if !session.record_point(point) {
                    continue;
                }
                imgproc::circle(&mut canvas, to_cv(point), 3, red(), -1, imgproc::LINE_8, 0)?;
                if let [a, b] = session.points() {
                    imgproc::line(&mut canvas, to_cv(*a), to_cv(*b), red(), 2, imgproc::LINE_8, 0)?;
                }
                highgui::imshow(CALIBRATION_WINDOW, &canvas)?;
            }

            // Any key confirms the calibration.
            if highgui::wait_key(KEY_POLL_MS)? >= 0 {
                break;
            }
        }

        highgui::set_mouse_callback(CALIBRATION_WINDOW, None)?;
        highgui::destroy_window(CALIBRATION_WINDOW)?;
        Ok(())
    }
}

impl PointPicker for ClickCalibration {
    fn collect_points(&mut self, frame: &Frame, session: &mut CalibrationSession) -> Result<(), CalibrationError> {
        println!("Click the left and right edges of spring, then space after");
        self.run(frame, session)
            .map_err(|e| CalibrationError::Interface(format!("{e:#}")))
    }
}

/// Shows each processed frame with its measurement overlay plus the mask, and
/// stops the run when `q` is pressed.
pub struct LiveDisplay;

impl LiveDisplay {
    fn render(&mut self, update: &FrameUpdate<'_>) -> anyhow::Result<bool> {
        let mut canvas: Mat = frame_to_bgr_mat(update.frame)?;

        if let (Some(centroid), Some(sample)) = (update.centroid, update.sample) {
            imgproc::circle(&mut canvas, to_cv(centroid), 5, green(), -1, imgproc::LINE_8, 0)?;
            imgproc::put_text(
                &mut canvas,
                &format!("Displacement: {:.2} mm", sample.displacement_mm),
                Point::new(10, 30),
                imgproc::FONT_HERSHEY_SIMPLEX,
                1.0,
                green(),
                2,
                imgproc::LINE_8,
                false,
            )?;
            imgproc::put_text(
                &mut canvas,
                &format!("Max Displacement: {:.2} mm", update.max_displacement_mm),
                Point::new(10, 70),
                imgproc::FONT_HERSHEY_SIMPLEX,
                1.0,
                green(),
                2,
                imgproc::LINE_8,
                false,
            )?;
        }

        highgui::imshow(ORIGINAL_WINDOW, &canvas)?;
        highgui::imshow(MASK_WINDOW, &mask_to_mat(update.mask)?)?;

        Ok(highgui::wait_key(1)? & 0xFF == QUIT_KEY)
    }
}

impl TrackingDisplay for LiveDisplay {
    fn show(&mut self, update: &FrameUpdate<'_>) -> bool {
        match self.render(update) {
            Ok(quit) => quit,
            Err(e) => {
                warn!(frame_index = update.frame_index, "display failed: {}", e);
                false
            }
        }
    }
}

/// Closes every window the viewer opened.
pub fn close_windows() {
    if let Err(e) = highgui::destroy_all_windows() {
        warn!("failed to close windows: {}", e);
    }
}
