// THEORY:
// The `displacement_tracker` adds memory to the per-frame measurements. It owns
// the reference position captured from the first frame and keeps a running
// maximum of the distance between that reference and each later centroid.
//
// Key principles:
// 1.  **Fixed Baseline**: Displacement is always measured against the single
//     reference centroid. The baseline is never moved.
// 2.  **First Occurrence Wins**: The maximum only moves on a strictly larger
//     displacement, so `max_frame_index` is the earliest frame that reached it.
// 3.  **Misses Are Gaps**: A frame without a centroid produces no sample and
//     leaves the state exactly as it was.
// 4.  **Ordered Updates**: Samples must be fed in frame order for the running
//     maximum to name the right frame.

use crate::core_modules::calibrator::CalibrationScale;
use crate::core_modules::centroid::PixelPoint;
use tracing::debug;

/// One frame's measured displacement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplacementSample {
    pub frame_index: u64,
    pub displacement_mm: f64,
}

/// The mutable accumulator of a tracking run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingState {
    /// Reference centroid from the first frame. Set once.
    pub initial_centroid: PixelPoint,
    /// The largest displacement seen so far, in millimetres. Never decreases.
    pub max_displacement_mm: f64,
    /// Frame at which `max_displacement_mm` was first reached.
    pub max_frame_index: u64,
    /// Index of the last frame that produced a sample.
    pub current_frame_index: u64,
}

impl TrackingState {
    /// Starts a run from the reference centroid found in frame `frame_index`.
    pub fn new(initial_centroid: PixelPoint, frame_index: u64) -> Self {
        Self {
            initial_centroid,
            max_displacement_mm: 0.0,
            max_frame_index: frame_index,
            current_frame_index: frame_index,
        }
    }
}

/// Distance between two points in pixels.
pub fn pixel_distance(p: PixelPoint, q: PixelPoint) -> f64 {
    p.distance_to(&q)
}

/// Distance between two points converted to millimetres.
pub fn displacement_mm(p: PixelPoint, q: PixelPoint, scale: CalibrationScale) -> f64 {
    scale.to_mm(pixel_distance(p, q))
}

/// Folds one frame's centroid into `state`.
///
/// Returns the frame's sample whether or not it set a new maximum, or `None`
/// (with `state` untouched) when the marker was not found.
pub fn update(
    state: &mut TrackingState,
    centroid: Option<PixelPoint>,
    frame_index: u64,
    scale: CalibrationScale,
) -> Option<DisplacementSample> {
    let centroid = centroid?;

    let displacement_mm = displacement_mm(centroid, state.initial_centroid, scale);
    state.current_frame_index = frame_index;

    if displacement_mm > state.max_displacement_mm {
        debug!(frame_index, displacement_mm, "new maximum displacement");
        state.max_displacement_mm = displacement_mm;
        state.max_frame_index = frame_index;
    }

    Some(DisplacementSample {
        frame_index,
        displacement_mm,
    })
}
