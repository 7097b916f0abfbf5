// THEORY:
// The `frame` module holds the most basic data of the gauge: one decoded video
// frame, and the hue/saturation/value view of its pixels that colour matching is
// performed in.
//
// Key principles:
// 1.  **Immutable Input**: A `Frame` is created once from decoded pixel data and
//     is never written to again. Anything derived from it (masks, centroids) is a
//     new value.
// 2.  **OpenCV-Compatible HSV**: Colour ranges are expressed on the 8-bit scale
//     used by common video tooling: hue in 0..=179 (degrees halved), saturation
//     and value in 0..=255. Ranges tuned against that tooling can be pasted in
//     unchanged.
// 3.  **Single-Pixel Scope**: The conversion looks at one pixel at a time and
//     never at its neighbours.

use image::{Rgb, RgbImage};

/// The largest hue on the 8-bit scale. Hue 180 wraps back to 0.
pub const HUE_MAX: u8 = 179;

/// A single decoded video frame in RGB order.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Builds a frame from a tightly packed RGB buffer. Returns `None` when the
    /// buffer length does not match `width * height * 3`.
    pub fn from_raw_rgb(width: u32, height: u32, bytes: Vec<u8>) -> Option<Self> {
        RgbImage::from_raw(width, height, bytes).map(Self::new)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// The HSV value of the pixel at `(x, y)`.
    pub fn hsv_at(&self, x: u32, y: u32) -> Hsv {
        Hsv::from_rgb(*self.image.get_pixel(x, y))
    }
}

/// A pixel in hue/saturation/value space on the 8-bit scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hsv {
    /// Hue, 0..=179.
    pub h: u8,
    /// Saturation, 0..=255.
    pub s: u8,
    /// Value (brightness), 0..=255.
    pub v: u8,
}

impl Hsv {
    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }

    /// Converts an RGB pixel to HSV.
    pub fn from_rgb(pixel: Rgb<u8>) -> Self {
        let [red, green, blue] = pixel.0;
        let maximum_channel = red.max(green).max(blue);
        let minimum_channel = red.min(green).min(blue);
        let chroma = (maximum_channel - minimum_channel) as f32;

        let v = maximum_channel;
        if maximum_channel == 0 {
            return Self { h: 0, s: 0, v };
        }

        let s = (chroma * 255.0 / maximum_channel as f32).round() as u8;
        if chroma == 0.0 {
            return Self { h: 0, s, v };
        }

        let (red, green, blue) = (red as f32, green as f32, blue as f32);
        let maximum = maximum_channel as f32;
        let mut hue_degrees = if maximum == red {
            60.0 * (green - blue) / chroma
        } else if maximum == green {
            120.0 + 60.0 * (blue - red) / chroma
        } else {
            240.0 + 60.0 * (red - green) / chroma
        };
        if hue_degrees < 0.0 {
            hue_degrees += 360.0;
        }

        let mut h = (hue_degrees / 2.0).round() as u16;
        if h > HUE_MAX as u16 {
            h = 0;
        }

        Self { h: h as u8, s, v }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_has_no_saturation_or_value() {
        assert_eq!(Hsv::from_rgb(Rgb([0, 0, 0])), Hsv::new(0, 0, 0));
    }

    #[test]
    fn greys_are_unsaturated() {
        assert_eq!(Hsv::from_rgb(Rgb([128, 128, 128])), Hsv::new(0, 0, 128));
        assert_eq!(Hsv::from_rgb(Rgb([255, 255, 255])), Hsv::new(0, 0, 255));
    }

    #[test]
    fn primaries_land_on_half_degree_scale() {
        assert_eq!(Hsv::from_rgb(Rgb([255, 0, 0])), Hsv::new(0, 255, 255));
        assert_eq!(Hsv::from_rgb(Rgb([0, 255, 0])), Hsv::new(60, 255, 255));
        assert_eq!(Hsv::from_rgb(Rgb([0, 0, 255])), Hsv::new(120, 255, 255));
    }

    #[test]
    fn yellow_is_hue_thirty() {
        assert_eq!(Hsv::from_rgb(Rgb([255, 255, 0])), Hsv::new(30, 255, 255));
        // Orange-ish yellow sits inside the default marker range.
        assert_eq!(Hsv::from_rgb(Rgb([255, 200, 0])).h, 24);
    }

    #[test]
    fn hue_just_below_red_wraps_to_zero() {
        // 359.x degrees rounds to 180 on the halved scale.
        let hsv = Hsv::from_rgb(Rgb([255, 0, 1]));
        assert_eq!(hsv.h, 0);
    }

    #[test]
    fn frame_rejects_short_buffers() {
        assert!(Frame::from_raw_rgb(2, 2, vec![0; 11]).is_none());
        let frame = Frame::from_raw_rgb(2, 2, vec![0; 12]).expect("exact buffer");
        assert_eq!((frame.width(), frame.height()), (2, 2));
    }

    #[test]
    fn hsv_at_reads_the_addressed_pixel() {
        let mut image = RgbImage::new(3, 1);
        image.put_pixel(2, 0, Rgb([0, 255, 0]));
        let frame = Frame::new(image);
        assert_eq!(frame.hsv_at(2, 0), Hsv::new(60, 255, 255));
        assert_eq!(frame.hsv_at(0, 0), Hsv::new(0, 0, 0));
    }
}
