use anyhow::{bail, Result};
use opencv::{
    core::{self, Mat, Scalar},
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use spring_gauge::{Frame, FrameSource, Mask, SourceError};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Frames decoded from a video file by OpenCV.
pub struct VideoFileSource {
    cap: VideoCapture,
    path: PathBuf,
    frames_read: u64,
}

impl VideoFileSource {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let open_error = |reason: String| SourceError::Open {
            path: path.to_path_buf(),
            reason,
        };

        let cap = VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY)
            .map_err(|e| open_error(e.to_string()))?;
        if !cap.is_opened().map_err(|e| open_error(e.to_string()))? {
            return Err(open_error("not a readable video".to_string()));
        }

        let width = cap.get(videoio::CAP_PROP_FRAME_WIDTH).unwrap_or_default();
        let height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT).unwrap_or_default();
        let fps = cap.get(videoio::CAP_PROP_FPS).unwrap_or_default();
        info!(
            "Opened {}: {}x{} @ {:.1} FPS",
            path.display(),
            width,
            height,
            fps
        );

        Ok(Self {
            cap,
            path: path.to_path_buf(),
            frames_read: 0,
        })
    }
}

impl FrameSource for VideoFileSource {
    fn read_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let read_error = |index: u64, e: opencv::Error| SourceError::Read {
            index,
            reason: e.to_string(),
        };

        let mut bgr = Mat::default();
        let has_frame = self.cap.read(&mut bgr).map_err(|e| read_error(self.frames_read, e))?;
        if !has_frame || bgr.empty() {
            return Ok(None);
        }

        let frame = bgr_mat_to_frame(&bgr).map_err(|e| SourceError::Read {
            index: self.frames_read,
            reason: e.to_string(),
        })?;
        self.frames_read += 1;
        Ok(Some(frame))
    }

    fn close(&mut self) {
        if let Err(e) = self.cap.release() {
            warn!("failed to release {}: {}", self.path.display(), e);
        }
    }
}

/// Converts an OpenCV BGR image into an RGB `Frame`.
pub fn bgr_mat_to_frame(bgr: &Mat) -> Result<Frame> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;
    let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
    let bytes = rgb.data_bytes()?.to_vec();
    match Frame::from_raw_rgb(width, height, bytes) {
        Some(frame) => Ok(frame),
        None => bail!("frame buffer does not match {}x{} RGB", width, height),
    }
}

/// Converts an RGB `Frame` back into an OpenCV BGR image for display.
pub fn frame_to_bgr_mat(frame: &Frame) -> Result<Mat> {
    let mut rgb = Mat::new_rows_cols_with_default(
        frame.height() as i32,
        frame.width() as i32,
        core::CV_8UC3,
        Scalar::all(0.0),
    )?;
    rgb.data_bytes_mut()?.copy_from_slice(frame.image().as_raw());

    let mut bgr = Mat::default();
    imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
    Ok(bgr)
}

/// Copies a mask into a single-channel OpenCV image.
pub fn mask_to_mat(mask: &Mask) -> Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        mask.height() as i32,
        mask.width() as i32,
        core::CV_8UC1,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(mask.as_raw());
    Ok(mat)
}
