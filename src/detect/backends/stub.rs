use std::collections::VecDeque;

use anyhow::Result;
use image::RgbImage;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;

/// Stub backend for testing and dry runs.
///
/// Replays a script of per-call results in order. The pipeline calls the detector
/// once for the front frame and then once for the back frame, so a script built
/// with `from_pairs` lines up with iterations. Once the script runs out every call
/// returns no detections.
#[derive(Default)]
pub struct StubBackend {
    script: VecDeque<Vec<Detection>>,
    calls: u64,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script one result per `detect` call.
    pub fn scripted(script: Vec<Vec<Detection>>) -> Self {
        Self {
            script: script.into(),
            calls: 0,
        }
    }

    /// Script one `(front, back)` pair per pipeline iteration.
    pub fn from_pairs(pairs: Vec<(Vec<Detection>, Vec<Detection>)>) -> Self {
        let script = pairs
            .into_iter()
            .flat_map(|(front, back)| [front, back])
            .collect();
        Self::scripted(script)
    }

    /// Number of `detect` calls served so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _input: &RgbImage) -> Result<Vec<Detection>> {
        self.calls += 1;
        Ok(self.script.pop_front().unwrap_or_default())
    }
}
