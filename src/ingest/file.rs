//! Local video file frame source.
//!
//! This module provides `FileSource` for reading frames from a local video file.
//! `stub://` paths select a synthetic pattern source with a finite frame count;
//! anything else is decoded with FFmpeg (feature: ingest-file-ffmpeg).

use anyhow::{anyhow, Result};

use super::synthetic::SyntheticScene;
use super::{FrameSource, STUB_SCHEME};
#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use crate::frame::Frame;

/// Number of frames a `stub://` file yields unless `max_frames` says otherwise.
pub const DEFAULT_SYNTHETIC_FRAMES: u64 = 100;

/// Configuration for a local file source.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local file path (e.g., "videos/front.avi") or `stub://<name>`.
    pub path: String,
    /// Frame width for synthetic sources.
    pub width: u32,
    /// Frame height for synthetic sources.
    pub height: u32,
    /// Stop after this many frames. `None` reads to the end of the file; for
    /// synthetic sources `None` means an endless stream.
    pub max_frames: Option<u64>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            width: 640,
            height: 480,
            max_frames: None,
        }
    }
}

impl FileConfig {
    /// Config for a locator given on the command line. `stub://` sources stop after
    /// `DEFAULT_SYNTHETIC_FRAMES`; real files play to their end.
    pub fn for_path(path: &str) -> Self {
        Self {
            path: path.to_string(),
            max_frames: path
                .starts_with(STUB_SCHEME)
                .then_some(DEFAULT_SYNTHETIC_FRAMES),
            ..Self::default()
        }
    }
}

/// Local file frame source.
pub struct FileSource {
    config: FileConfig,
    backend: FileBackend,
    frames_captured: u64,
}

enum FileBackend {
    Synthetic(SyntheticScene),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(Box<FfmpegFileSource>),
}

impl FileSource {
    pub fn new(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "file ingestion only supports local paths (no URL schemes): '{}'",
                config.path
            ));
        }
        let backend = if config.path.starts_with(STUB_SCHEME) {
            FileBackend::Synthetic(SyntheticScene::new(config.width, config.height))
        } else {
            #[cfg(feature = "ingest-file-ffmpeg")]
            {
                FileBackend::Ffmpeg(Box::new(FfmpegFileSource::new(&config.path)?))
            }
            #[cfg(not(feature = "ingest-file-ffmpeg"))]
            {
                return Err(anyhow!(
                    "video file ingestion requires the ingest-file-ffmpeg feature"
                ));
            }
        };
        Ok(Self {
            config,
            backend,
            frames_captured: 0,
        })
    }
}

impl FrameSource for FileSource {
    fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            FileBackend::Synthetic(_) => {
                log::info!("FileSource: connected to {} (synthetic)", self.config.path);
                Ok(())
            }
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.connect(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self
            .config
            .max_frames
            .is_some_and(|max| self.frames_captured >= max)
        {
            return Ok(None);
        }
        let frame = match &mut self.backend {
            FileBackend::Synthetic(scene) => Some(scene.next_frame()?),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame()?,
        };
        if frame.is_some() {
            self.frames_captured += 1;
        }
        Ok(frame)
    }

    fn describe(&self) -> String {
        self.config.path.clone()
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with(STUB_SCHEME) {
        return true;
    }
    !path.contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config(max_frames: Option<u64>) -> FileConfig {
        FileConfig {
            path: "stub://test".to_string(),
            width: 64,
            height: 48,
            max_frames,
        }
    }

    #[test]
    fn synthetic_source_stops_after_max_frames() -> Result<()> {
        let mut source = FileSource::new(stub_config(Some(3)))?;
        source.connect()?;

        for expected in 1..=3 {
            let frame = source.next_frame()?.expect("frame");
            assert_eq!(frame.sequence, expected);
            assert_eq!(frame.dims().width, 64);
            assert_eq!(frame.dims().height, 48);
        }
        assert!(source.next_frame()?.is_none());
        assert_eq!(source.frames_captured, 3);
        Ok(())
    }

    #[test]
    fn synthetic_frames_change_over_time() -> Result<()> {
        let mut source = FileSource::new(stub_config(None))?;
        source.connect()?;
        let first = source.next_frame()?.expect("frame").into_image();
        let second = source.next_frame()?.expect("frame").into_image();
        assert_ne!(first.as_raw(), second.as_raw());
        Ok(())
    }

    #[test]
    fn only_synthetic_locators_are_capped() {
        assert_eq!(
            FileConfig::for_path("stub://front").max_frames,
            Some(DEFAULT_SYNTHETIC_FRAMES)
        );
        assert_eq!(FileConfig::for_path("videos/front.avi").max_frames, None);
        assert_eq!(FileConfig::for_path("/data/back.mp4").max_frames, None);
        assert_eq!(FileConfig::default().max_frames, None);
    }

    #[test]
    fn url_schemes_are_rejected() {
        let config = FileConfig {
            path: "http://camera/video.mp4".to_string(),
            ..FileConfig::default()
        };
        assert!(FileSource::new(config).is_err());
        assert!(FileSource::new(FileConfig::default()).is_err());
    }
}
