use anyhow::Result;

use crate::frame::Frame;

/// Deterministic moving test pattern for `stub://` sources.
pub(crate) struct SyntheticScene {
    width: u32,
    height: u32,
    frame_count: u64,
    /// Bumped every 50 frames to simulate a scene change.
    scene_state: u8,
}

impl SyntheticScene {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_count: 0,
            scene_state: 0,
        }
    }

    #[cfg(feature = "ingest-v4l2")]
    pub(crate) fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub(crate) fn next_frame(&mut self) -> Result<Frame> {
        self.frame_count += 1;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }

        let pixel_count = (self.width as usize) * (self.height as usize) * 3;
        let offset = self.frame_count + self.scene_state as u64;
        let pixels = (0..pixel_count)
            .map(|i| ((i as u64 + offset) % 256) as u8)
            .collect();
        Frame::from_rgb(pixels, self.width, self.height, self.frame_count)
    }
}
