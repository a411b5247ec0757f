//! Frame containers.
//!
//! - `Frame`: One decoded RGB camera frame plus its capture sequence number.
//! - `FrameDims`: Original-frame pixel dimensions used by the coordinate normalizer.
//! - `CompositeFrame`: The joined, tinted output of one pipeline iteration.

use anyhow::{anyhow, Result};
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Original-frame pixel dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDims {
    pub width: u32,
    pub height: u32,
}

impl FrameDims {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of(image: &RgbImage) -> Self {
        Self::new(image.width(), image.height())
    }
}

// ----------------------------------------------------------------------------
// Frame: one decoded camera frame
// ----------------------------------------------------------------------------

/// A decoded RGB frame as produced by a `FrameSource`.
pub struct Frame {
    image: RgbImage,
    /// 1-based capture index within the source.
    pub sequence: u64,
}

impl Frame {
    pub fn new(image: RgbImage, sequence: u64) -> Self {
        Self { image, sequence }
    }

    /// Build a frame from packed RGB24 bytes, validating the buffer length.
    pub fn from_rgb(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("frame dimensions must be non-zero ({}x{})", width, height));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("RGB frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                pixels.len()
            ));
        }
        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow!("RGB buffer does not fit {}x{}", width, height))?;
        Ok(Self::new(image, sequence))
    }

    pub fn dims(&self) -> FrameDims {
        FrameDims::of(&self.image)
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

// ----------------------------------------------------------------------------
// CompositeFrame: joined output of one iteration
// ----------------------------------------------------------------------------

/// Front and back views side by side, front on the left.
///
/// `index` is the output number used for `frameNNNN` file names. It is
/// assigned by the pipeline and strictly increases over a run.
pub struct CompositeFrame {
    pub index: u64,
    image: RgbImage,
}

impl CompositeFrame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    pub fn dims(&self) -> FrameDims {
        FrameDims::of(&self.image)
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}
