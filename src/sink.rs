//! Composite frame outputs.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::frame::CompositeFrame;

/// Default directory for numbered output frames.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Receives each composite frame the pipeline produces.
///
/// Sinks only borrow the frame; the pipeline drops it once every sink has run.
pub trait FrameSink {
    fn emit(&mut self, frame: &CompositeFrame) -> Result<()>;
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn emit(&mut self, frame: &CompositeFrame) -> Result<()> {
        (**self).emit(frame)
    }
}

/// Writes every composite to `<dir>/frameNNNN.jpg`, numbered by `CompositeFrame::index`.
pub struct DirectorySink {
    dir: PathBuf,
    written: u64,
}

impl DirectorySink {
    /// Create the sink, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        Ok(Self { dir, written: 0 })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn path_for(&self, index: u64) -> PathBuf {
        self.dir.join(frame_file_name(index))
    }
}

impl FrameSink for DirectorySink {
    fn emit(&mut self, frame: &CompositeFrame) -> Result<()> {
        let path = self.path_for(frame.index);
        frame
            .image()
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        self.written += 1;
        log::debug!("wrote {}", path.display());
        Ok(())
    }
}

/// `frame0000.jpg`, `frame0001.jpg`, ... Wider indices are not truncated.
pub fn frame_file_name(index: u64) -> String {
    format!("frame{:04}.jpg", index)
}
