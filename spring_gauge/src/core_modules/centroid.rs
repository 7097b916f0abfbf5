// THEORY:
// The `centroid` module estimates where the marker is. It computes the raw
// image moments of a mask (zeroth moment = total mask mass, first moments =
// mass-weighted coordinate sums) and divides them, the same weighted
// center-of-mass calculation the blob layer uses for chunks, but over pixels.
//
// An empty mask is a normal outcome: the marker is not visible in that frame,
// so extraction yields `None` rather than an error.

use crate::core_modules::color_segmenter::Mask;

/// A coordinate in pixel space. Signed so that calibration clicks and
/// displacement arithmetic share one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`, in pixels.
    pub fn distance_to(&self, other: &PixelPoint) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<(i32, i32)> for PixelPoint {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Raw spatial moments of a mask, weighted by mask value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MaskMoments {
    /// Zeroth moment: the mask mass.
    pub m00: f64,
    /// Sum of x coordinates weighted by mask value.
    pub m10: f64,
    /// Sum of y coordinates weighted by mask value.
    pub m01: f64,
}

impl MaskMoments {
    pub fn of(mask: &Mask) -> Self {
        let mut mass = 0u64;
        let mut sum_x = 0u64;
        let mut sum_y = 0u64;

        for (x, y, pixel) in mask.enumerate_pixels() {
            let weight = pixel.0[0] as u64;
            if weight == 0 {
                continue;
            }
            mass += weight;
            sum_x += x as u64 * weight;
            sum_y += y as u64 * weight;
        }

        Self {
            m00: mass as f64,
            m10: sum_x as f64,
            m01: sum_y as f64,
        }
    }

    /// The weighted centroid, or `None` when the mass is zero. Coordinates are
    /// truncated to whole pixels.
    pub fn centroid(&self) -> Option<PixelPoint> {
        if self.m00 == 0.0 {
            return None;
        }
        Some(PixelPoint {
            x: (self.m10 / self.m00) as i32,
            y: (self.m01 / self.m00) as i32,
        })
    }
}

/// Intensity-weighted centroid of `mask`, or `None` if no pixel is set.
pub fn extract_centroid(mask: &Mask) -> Option<PixelPoint> {
    MaskMoments::of(mask).centroid()
}
