//! V4L2 webcam frame source.
//!
//! This module provides `V4l2Source` for capturing frames from local V4L2 devices
//! (e.g., /dev/video0) in RGB24. `stub://` device paths select a synthetic source.

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use super::synthetic::SyntheticScene;
use super::{FrameSource, STUB_SCHEME};
use crate::frame::Frame;

/// Configuration for a V4L2 source.
#[derive(Clone, Debug)]
pub struct V4l2Config {
    /// Device path (e.g., "/dev/video0")
    pub device: String,
    /// Requested frame rate. Zero leaves the device default.
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for V4l2Config {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 0,
            width: 640,
            height: 480,
        }
    }
}

pub struct V4l2Source {
    config: V4l2Config,
    backend: V4l2Backend,
}

enum V4l2Backend {
    Synthetic(SyntheticScene),
    Device(DeviceV4l2Source),
}

impl V4l2Source {
    pub fn new(config: V4l2Config) -> Result<Self> {
        let backend = if config.device.starts_with(STUB_SCHEME) {
            V4l2Backend::Synthetic(SyntheticScene::new(config.width, config.height))
        } else {
            V4l2Backend::Device(DeviceV4l2Source::new(config.clone()))
        };
        Ok(Self { config, backend })
    }

    pub fn frames_captured(&self) -> u64 {
        match &self.backend {
            V4l2Backend::Synthetic(scene) => scene.frame_count(),
            V4l2Backend::Device(source) => source.frame_count,
        }
    }
}

impl FrameSource for V4l2Source {
    fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            V4l2Backend::Synthetic(_) => {
                log::info!("V4l2Source: connected to {} (synthetic)", self.config.device);
                Ok(())
            }
            V4l2Backend::Device(source) => source.connect(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            V4l2Backend::Synthetic(scene) => scene.next_frame().map(Some),
            V4l2Backend::Device(source) => source.next_frame().map(Some),
        }
    }

    fn describe(&self) -> String {
        self.config.device.clone()
    }
}

// ----------------------------------------------------------------------------
// Device capture using libv4l
// ----------------------------------------------------------------------------

struct DeviceV4l2Source {
    config: V4l2Config,
    state: Option<DeviceV4l2State>,
    frame_count: u64,
    active_width: u32,
    active_height: u32,
}

#[self_referencing]
struct DeviceV4l2State {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl DeviceV4l2Source {
    fn new(config: V4l2Config) -> Self {
        Self {
            active_width: config.width,
            active_height: config.height,
            config,
            state: None,
            frame_count: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open v4l2 device {}", self.config.device))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "V4l2Source: failed to set format on {}: {}",
                    self.config.device,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "V4l2Source: failed to set fps on {}: {}",
                    self.config.device,
                    err
                );
            }
        }

        self.active_width = format.width;
        self.active_height = format.height;

        let state = DeviceV4l2StateTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;
        self.state = Some(state);

        log::info!(
            "V4l2Source: connected to {} ({}x{})",
            self.config.device,
            self.active_width,
            self.active_height
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().context("v4l2 device not connected")?;
        let (buf, _meta) = state
            .with_mut(|fields| fields.stream.next())
            .context("capture v4l2 frame")?;
        let row_bytes = (self.active_width as usize) * 3;
        let len = row_bytes * self.active_height as usize;
        let pixels = buf
            .get(..len)
            .context("v4l2 buffer shorter than negotiated frame size")?
            .to_vec();

        self.frame_count += 1;
        Frame::from_rgb(pixels, self.active_width, self.active_height, self.frame_count)
    }
}
