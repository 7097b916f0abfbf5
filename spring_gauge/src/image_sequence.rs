// THEORY:
// `ImageSequenceSource` is a pure-Rust frame source: a directory of still images,
// one per frame, played back in file-name order. It lets the gauge run without a
// video decoder (frames exported with `ffmpeg -i in.mp4 frames/%05d.png`, or
// synthetic test frames).

use crate::collaborators::FrameSource;
use crate::core_modules::frame::Frame;
use crate::error::SourceError;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

pub struct ImageSequenceSource {
    directory: PathBuf,
    pending: VecDeque<PathBuf>,
    frames_read: u64,
    closed: bool,
}

impl ImageSequenceSource {
    /// Lists the frame files in `directory`. Fails when the directory cannot
    /// be read; an empty directory opens fine and simply has no frames.
    pub fn open(directory: impl AsRef<Path>) -> Result<Self, SourceError> {
        let directory = directory.as_ref().to_path_buf();
        let entries = std::fs::read_dir(&directory).map_err(|e| SourceError::Open {
            path: directory.clone(),
            reason: e.to_string(),
        })?;

        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_frame_file(path))
            .collect();
        frames.sort();

        info!("Found {} frames in {}", frames.len(), directory.display());

        Ok(Self {
            directory,
            pending: frames.into(),
            frames_read: 0,
            closed: false,
        })
    }

    /// Frames not yet read.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageSequenceSource {
    fn read_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if self.is_closed() {
            return Ok(None);
        }
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };

        let image = image::open(&path)
            .map_err(|source| SourceError::Decode {
                path: path.clone(),
                source,
            })?
            .to_rgb8();
        debug!(frame = self.frames_read, path = %path.display(), "decoded frame");
        self.frames_read += 1;

        Ok(Some(Frame::new(image)))
    }

    fn close(&mut self) {
        debug!(
            directory = %self.directory.display(),
            frames_read = self.frames_read,
            skipped = self.remaining(),
            "closed frame sequence"
        );
        self.pending.clear();
        self.closed = true;
    }
}
