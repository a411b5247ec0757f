//! Frame ingestion sources.
//!
//! This module provides the sources the pipeline pulls camera frames from:
//! - Still images (single-image mode)
//! - Local video files (real decoding behind feature: ingest-file-ffmpeg)
//! - USB/V4L2 webcams (feature: ingest-v4l2)
//! - Synthetic `stub://` sources (testing, dry runs)
//!
//! Every source yields decoded RGB `Frame`s. `Ok(None)` from `next_frame` is the
//! normal end of a stream; `Err` is a read failure. The pipeline treats both as
//! the end of the run and never retries.

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
pub mod still;
mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::Result;
use clap::ValueEnum;

use crate::frame::Frame;
use crate::CameraSide;

pub use file::{FileConfig, FileSource, DEFAULT_SYNTHETIC_FRAMES};
pub use still::ImageSource;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::{V4l2Config, V4l2Source};

/// Prefix selecting the synthetic backend of a source.
pub const STUB_SCHEME: &str = "stub://";

/// A blocking source of camera frames.
pub trait FrameSource {
    /// Open the underlying stream. Failures here are fatal setup errors.
    fn connect(&mut self) -> Result<()>;

    /// Read the next frame. `Ok(None)` means the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Human-readable source identifier for logs.
    fn describe(&self) -> String;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// What kind of input the two source locators name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum SourceMode {
    #[default]
    Video,
    Webcam,
    Image,
}

impl SourceMode {
    /// Image mode stops after a single iteration.
    pub fn is_single_image(self) -> bool {
        matches!(self, SourceMode::Image)
    }

    /// Locator used when none is given for `side`.
    pub fn default_locator(self, side: CameraSide) -> &'static str {
        match (self, side) {
            (SourceMode::Webcam, CameraSide::Front) => "/dev/video0",
            (SourceMode::Webcam, CameraSide::Back) => "/dev/video1",
            (SourceMode::Image, _) => "image.jpg",
            (SourceMode::Video, _) => "video.avi",
        }
    }
}

/// Build and connect the source for `locator` under `mode`.
pub fn open_source(mode: SourceMode, locator: &str) -> Result<Box<dyn FrameSource>> {
    let mut source: Box<dyn FrameSource> = match mode {
        SourceMode::Image => Box::new(ImageSource::new(locator)),
        SourceMode::Video => Box::new(FileSource::new(FileConfig::for_path(locator))?),
        SourceMode::Webcam => open_webcam(locator)?,
    };
    source.connect()?;
    Ok(source)
}

fn open_webcam(locator: &str) -> Result<Box<dyn FrameSource>> {
    if locator.starts_with(STUB_SCHEME) {
        return Ok(Box::new(FileSource::new(FileConfig {
            path: locator.to_string(),
            max_frames: None,
            ..FileConfig::default()
        })?));
    }
    #[cfg(feature = "ingest-v4l2")]
    {
        Ok(Box::new(V4l2Source::new(V4l2Config {
            device: locator.to_string(),
            ..V4l2Config::default()
        })?))
    }
    #[cfg(not(feature = "ingest-v4l2"))]
    {
        anyhow::bail!("webcam capture requires the ingest-v4l2 feature")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_video_source_opens_and_streams() -> Result<()> {
        let mut source = open_source(SourceMode::Video, "stub://front")?;
        let frame = source.next_frame()?.expect("synthetic frame");
        assert_eq!(frame.sequence, 1);
        Ok(())
    }

    #[test]
    fn missing_image_fails_at_open() {
        assert!(open_source(SourceMode::Image, "/nonexistent/front.jpg").is_err());
    }

    #[test]
    fn webcam_defaults_to_first_two_devices() {
        assert_eq!(SourceMode::Webcam.default_locator(CameraSide::Front), "/dev/video0");
        assert_eq!(SourceMode::Webcam.default_locator(CameraSide::Back), "/dev/video1");
    }
}
