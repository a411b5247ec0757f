//! Dual-camera occupancy monitor.
//!
//! This crate implements the per-frame orchestration layer for a two-camera
//! (front/back) person-count monitor.
//!
//! # Architecture
//!
//! Each iteration of the pipeline:
//!
//! 1. Reads one frame from each source (both must yield a frame).
//! 2. Letterboxes each frame and runs the detector backend on it.
//! 3. Maps detector-space boxes back into original-frame pixels and clamps them.
//! 4. Draws and counts the "person" detections per side.
//! 5. Folds the counts into the session high-water marks.
//! 6. Derives a RED/GREEN alert per side and tints each view accordingly.
//! 7. Joins both views side by side and hands the composite to the sinks.
//!
//! The high-water marks only ever rise during a run, so an alert never
//! self-clears because of a missed detection.
//!
//! # Module Structure
//!
//! - `frame`: Frame containers (`Frame`, `FrameDims`, `CompositeFrame`)
//! - `ingest`: Frame sources (still image, video file, V4L2 webcam)
//! - `detect`: Detection records and detector backends
//! - `normalize`: Letterboxing and the inverse coordinate mapping
//! - `occupancy`: Session high-water marks
//! - `decision`: Threshold policy and the combined directive rule
//! - `labels` / `palette`: Class names and box colors
//! - `compose`: Box drawing, tinting and side-by-side compositing
//! - `pipeline`: The per-frame loop driver
//! - `sink`: Composite frame outputs
//! - `config`: File and environment configuration for the daemon

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod compose;
pub mod config;
pub mod decision;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod labels;
pub mod normalize;
pub mod occupancy;
pub mod palette;
pub mod pipeline;
pub mod sink;

pub use compose::{LabelStyle, RenderAssets};
pub use config::MonitorConfig;
pub use decision::{AlertColor, Decision, Directive, Thresholds};
pub use detect::{Detection, DetectorBackend, DetectorSettings, StubBackend};
pub use frame::{CompositeFrame, Frame, FrameDims};
pub use ingest::{FileConfig, FileSource, FrameSource, ImageSource, SourceMode};
pub use labels::LabelTable;
pub use normalize::{letterbox_image, to_original_space, Letterbox, Padding};
pub use occupancy::OccupancyState;
pub use palette::Palette;
pub use pipeline::{
    IterationReport, LoopState, PauseHook, Pipeline, PipelineOptions, RunSummary, StopReason,
};
pub use sink::{DirectorySink, FrameSink};

// -------------------- Camera Sides --------------------

/// Which of the two cameras a frame, count or decision belongs to.
///
/// Each side carries its own threshold and its own high-water mark.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraSide {
    Front,
    Back,
}

impl CameraSide {
    pub const ALL: [CameraSide; 2] = [CameraSide::Front, CameraSide::Back];

    pub fn as_str(self) -> &'static str {
        match self {
            CameraSide::Front => "front",
            CameraSide::Back => "back",
        }
    }
}

impl fmt::Display for CameraSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
