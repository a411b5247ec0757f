use anyhow::Result;
use image::RgbImage;

use crate::detect::result::Detection;

/// Default square detector input size.
pub const DEFAULT_INPUT_SIZE: u32 = 416;
pub const DEFAULT_CONFIDENCE: f32 = 0.5;
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.4;

/// Settings passed through to a detector backend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorSettings {
    /// Square input size (pixels) the backend expects. Multiple of 32.
    pub input_size: u32,
    /// Minimum class score for a detection to be reported.
    pub confidence: f32,
    /// IoU above which overlapping boxes of one class are suppressed.
    pub nms_threshold: f32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            input_size: DEFAULT_INPUT_SIZE,
            confidence: DEFAULT_CONFIDENCE,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
        }
    }
}

/// Detector backend trait.
///
/// A backend receives a letterboxed square frame of `input_size` pixels and returns
/// zero or more detections in that frame's pixel space, already non-max-suppressed.
/// An empty vector is a normal result.
///
/// Calls are blocking. The pipeline applies no timeout around `detect`; callers who
/// need bounded latency wrap their backend.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on one letterboxed frame.
    fn detect(&mut self, input: &RgbImage) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<B: DetectorBackend + ?Sized> DetectorBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&mut self, input: &RgbImage) -> Result<Vec<Detection>> {
        (**self).detect(input)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
