mod backend;
mod backends;
mod nms;
mod result;

pub use backend::{
    DetectorBackend, DetectorSettings, DEFAULT_CONFIDENCE, DEFAULT_INPUT_SIZE,
    DEFAULT_NMS_THRESHOLD,
};
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use nms::non_max_suppression;
pub use result::Detection;
