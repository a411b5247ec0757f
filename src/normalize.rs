//! Letterboxing and its inverse.
//!
//! Detectors run on a square input of `input_size` pixels. A frame is fitted into
//! that square by an aspect-preserving resize and centered on a neutral gray
//! canvas. Detections come back in that square's pixel space; `to_original_space`
//! undoes the padding and the scale, then clamps into the original frame.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use crate::detect::Detection;
use crate::frame::FrameDims;

/// Fill value for the letterbox margins.
pub const LETTERBOX_FILL: Rgb<u8> = Rgb([128, 128, 128]);

/// Padding added on each side of one axis (half of the total slack).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Padding {
    pub x: f32,
    pub y: f32,
}

/// Geometry of one frame's letterbox transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    pub input_size: u32,
    pub scale: f32,
    pub padding: Padding,
}

impl Letterbox {
    /// Compute the transform that fits `dims` into an `input_size` square.
    pub fn fit(input_size: u32, dims: FrameDims) -> Self {
        let size = input_size as f32;
        let width = dims.width as f32;
        let height = dims.height as f32;
        let scale = (size / width).min(size / height);
        Self {
            input_size,
            scale,
            padding: Padding {
                x: (size - scale * width) / 2.0,
                y: (size - scale * height) / 2.0,
            },
        }
    }

    /// Scaled size of the frame inside the square, in whole pixels.
    pub fn resized_dims(&self, dims: FrameDims) -> FrameDims {
        let scaled = |v: u32| ((v as f32 * self.scale) as u32).clamp(1, self.input_size.max(1));
        FrameDims::new(scaled(dims.width), scaled(dims.height))
    }

    /// Map a detector-space box back into `dims`.
    pub fn to_original(&self, detection: &Detection, dims: FrameDims) -> Detection {
        to_original_space(detection, self.scale, self.padding, dims)
    }
}

/// Resize `image` into an `input_size` square, preserving aspect ratio.
///
/// Returns the letterboxed image together with the transform used, so the
/// detector's output can be mapped back with `Letterbox::to_original`.
pub fn letterbox_image(image: &RgbImage, input_size: u32) -> (RgbImage, Letterbox) {
    let dims = FrameDims::of(image);
    let letterbox = Letterbox::fit(input_size, dims);
    let resized_dims = letterbox.resized_dims(dims);
    let resized = imageops::resize(
        image,
        resized_dims.width,
        resized_dims.height,
        FilterType::CatmullRom,
    );

    let mut canvas = RgbImage::from_pixel(input_size, input_size, LETTERBOX_FILL);
    let offset_x = (input_size.saturating_sub(resized_dims.width) / 2) as i64;
    let offset_y = (input_size.saturating_sub(resized_dims.height) / 2) as i64;
    imageops::replace(&mut canvas, &resized, offset_x, offset_y);
    (canvas, letterbox)
}

/// Map a detector-space box into original-frame pixels.
///
/// Subtracts the padding, divides by the scale and clamps `x` into `[0, width]`
/// and `y` into `[0, height]`. Any input is accepted: NaN collapses to 0, infinities
/// clamp to the nearest edge, and a box whose corners come back swapped is
/// reordered so that `x1 <= x2` and `y1 <= y2` always hold.
pub fn to_original_space(
    detection: &Detection,
    scale: f32,
    padding: Padding,
    dims: FrameDims,
) -> Detection {
    let width = dims.width as f32;
    let height = dims.height as f32;
    let unscale = |v: f32, pad: f32| {
        if scale.is_finite() && scale > 0.0 {
            (v - pad) / scale
        } else {
            v - pad
        }
    };

    let x1 = clamp_axis(unscale(detection.x1, padding.x), width);
    let x2 = clamp_axis(unscale(detection.x2, padding.x), width);
    let y1 = clamp_axis(unscale(detection.y1, padding.y), height);
    let y2 = clamp_axis(unscale(detection.y2, padding.y), height);

    Detection {
        x1: x1.min(x2),
        x2: x1.max(x2),
        y1: y1.min(y2),
        y2: y1.max(y2),
        ..*detection
    }
}

fn clamp_axis(value: f32, max: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}
