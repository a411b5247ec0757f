//! Still-image frame source.
//!
//! Yields the decoded image once, then reports end of stream.

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use std::path::PathBuf;

use super::FrameSource;
use crate::frame::Frame;

pub struct ImageSource {
    path: PathBuf,
    image: Option<RgbImage>,
    emitted: bool,
}

impl ImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            image: None,
            emitted: false,
        }
    }

    /// Wrap an already decoded image.
    pub fn from_image(image: RgbImage) -> Self {
        Self {
            path: PathBuf::from("<memory>"),
            image: Some(image),
            emitted: false,
        }
    }
}

impl FrameSource for ImageSource {
    fn connect(&mut self) -> Result<()> {
        if self.image.is_none() {
            let decoded = image::open(&self.path)
                .with_context(|| format!("failed to open image {}", self.path.display()))?;
            self.image = Some(decoded.to_rgb8());
        }
        log::info!("ImageSource: loaded {}", self.path.display());
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.emitted {
            return Ok(None);
        }
        let image = self
            .image
            .take()
            .ok_or_else(|| anyhow!("image source {} not connected", self.path.display()))?;
        self.emitted = true;
        Ok(Some(Frame::new(image, 1)))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
