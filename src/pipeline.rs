//! Pipeline driver.
//!
//! One iteration reads a frame pair, runs the detector on both, renders each
//! side, folds the counts into the session `OccupancyState`, decides, tints,
//! composes and hands the result to the sinks. The loop stops when either
//! source ends or fails, when the quit flag is raised, or after the first
//! iteration in single-image mode.
//!
//! Rendering of the two sides (coordinate mapping, filtering, drawing, counting)
//! is a pure function of the frame, its detections and a side-local RNG, so the
//! two sides run on scoped threads and join before the occupancy update. Only the
//! driver touches `OccupancyState`.

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::compose::{annotate, compose, tint, RenderAssets, DEFAULT_TINT_ALPHA};
use crate::decision::{Decision, Directive, Thresholds};
use crate::detect::{Detection, DetectorBackend, DEFAULT_INPUT_SIZE};
use crate::frame::{CompositeFrame, Frame};
use crate::ingest::FrameSource;
use crate::normalize::{letterbox_image, Letterbox};
use crate::occupancy::OccupancyState;
use crate::sink::FrameSink;
use crate::CameraSide;

/// Why the loop left the running state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The source for this side has no more frames.
    EndOfStream(CameraSide),
    /// Reading from this side's source failed.
    ReadFailed(CameraSide),
    /// The quit flag was raised.
    Quit,
    /// Single-image mode finished its only iteration.
    SingleImage,
    /// The detector, a sink or the pause hook returned an error.
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped(StopReason),
}

#[derive(Clone, Debug)]
pub struct PipelineOptions {
    pub thresholds: Thresholds,
    /// Square detector input size.
    pub input_size: u32,
    /// Share of the alert color in each tinted view.
    pub tint_alpha: f32,
    /// Stop after the first iteration (still-image mode).
    pub single_image: bool,
    /// Seed for box colors. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            input_size: DEFAULT_INPUT_SIZE,
            tint_alpha: DEFAULT_TINT_ALPHA,
            single_image: false,
            seed: None,
        }
    }
}

/// Called once after the composite is emitted in single-image mode.
pub type PauseHook = Box<dyn FnMut() -> Result<()>>;

/// One side after coordinate mapping, filtering and drawing.
pub struct SideRender {
    pub image: RgbImage,
    pub person_count: usize,
    /// All detections mapped into original-frame pixels, persons or not.
    pub detections: Vec<Detection>,
}

/// Map `raw` detections back into `frame`, then draw and count the persons.
pub fn render_side<R: Rng + ?Sized>(
    frame: Frame,
    raw: &[Detection],
    letterbox: Letterbox,
    assets: &RenderAssets,
    rng: &mut R,
) -> SideRender {
    let dims = frame.dims();
    let detections: Vec<Detection> = raw
        .iter()
        .map(|det| letterbox.to_original(det, dims))
        .collect();
    let mut image = frame.into_image();
    let person_count = annotate(&mut image, &detections, assets, rng);
    SideRender {
        image,
        person_count,
        detections,
    }
}

/// Outcome of one completed iteration.
#[derive(Clone, Debug)]
pub struct IterationReport {
    /// Output frame number of this iteration's composite.
    pub index: u64,
    pub front_count: usize,
    pub back_count: usize,
    /// High-water marks after this iteration's counts were folded in.
    pub state: OccupancyState,
    pub decision: Decision,
    pub directive: Option<Directive>,
    pub elapsed: Duration,
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub state: OccupancyState,
    pub directives: u64,
    pub stop_reason: Option<StopReason>,
}

pub struct Pipeline<D> {
    front: Box<dyn FrameSource>,
    back: Box<dyn FrameSource>,
    detector: D,
    assets: RenderAssets,
    options: PipelineOptions,
    state: OccupancyState,
    loop_state: LoopState,
    next_index: u64,
    directives: u64,
    front_rng: StdRng,
    back_rng: StdRng,
    quit: Arc<AtomicBool>,
    pause: Option<PauseHook>,
}

impl<D: DetectorBackend> Pipeline<D> {
    /// Build a driver over two already connected sources.
    pub fn new(
        front: Box<dyn FrameSource>,
        back: Box<dyn FrameSource>,
        detector: D,
        assets: RenderAssets,
        options: PipelineOptions,
    ) -> Self {
        let (front_rng, back_rng) = match options.seed {
            Some(seed) => (
                StdRng::seed_from_u64(seed),
                StdRng::seed_from_u64(seed.wrapping_add(1)),
            ),
            None => (StdRng::from_entropy(), StdRng::from_entropy()),
        };
        Self {
            front,
            back,
            detector,
            assets,
            options,
            state: OccupancyState::new(),
            loop_state: LoopState::Running,
            next_index: 0,
            directives: 0,
            front_rng,
            back_rng,
            quit: Arc::new(AtomicBool::new(false)),
            pause: None,
        }
    }

    /// Share an externally owned quit flag (e.g. one set by a signal handler).
    pub fn with_quit_flag(mut self, quit: Arc<AtomicBool>) -> Self {
        self.quit = quit;
        self
    }

    pub fn with_pause_hook(mut self, hook: impl FnMut() -> Result<()> + 'static) -> Self {
        self.pause = Some(Box::new(hook));
        self
    }

    pub fn quit_flag(&self) -> Arc<AtomicBool> {
        self.quit.clone()
    }

    pub fn state(&self) -> OccupancyState {
        self.state
    }

    pub fn loop_state(&self) -> LoopState {
        self.loop_state
    }

    pub fn frames_processed(&self) -> u64 {
        self.next_index
    }

    /// Run until the loop stops.
    pub fn run(&mut self, sinks: &mut [&mut dyn FrameSink]) -> Result<RunSummary> {
        while self.step(sinks)?.is_some() {}
        Ok(self.summary())
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            frames_processed: self.next_index,
            state: self.state,
            directives: self.directives,
            stop_reason: match self.loop_state {
                LoopState::Running => None,
                LoopState::Stopped(reason) => Some(reason),
            },
        }
    }

    /// Run one iteration. Returns `Ok(None)` once the loop has stopped.
    pub fn step(&mut self, sinks: &mut [&mut dyn FrameSink]) -> Result<Option<IterationReport>> {
        if self.loop_state != LoopState::Running {
            return Ok(None);
        }
        let started = Instant::now();

        // Both reads happen before either result is looked at.
        let front = self.read(CameraSide::Front);
        let back = self.read(CameraSide::Back);
        let (Some(front), Some(back)) = (front, back) else {
            return Ok(None);
        };

        let input_size = self.options.input_size;
        let (front_input, front_lb) = letterbox_image(front.image(), input_size);
        let (back_input, back_lb) = letterbox_image(back.image(), input_size);
        let front_raw = self.detect(CameraSide::Front, &front_input)?;
        let back_raw = self.detect(CameraSide::Back, &back_input)?;

        let assets = &self.assets;
        let front_rng = &mut self.front_rng;
        let back_rng = &mut self.back_rng;
        let (front_out, back_out) = std::thread::scope(|scope| {
            let front_task =
                scope.spawn(move || render_side(front, &front_raw, front_lb, assets, front_rng));
            let back_out = render_side(back, &back_raw, back_lb, assets, back_rng);
            (front_task.join(), back_out)
        });
        let front_out = front_out.map_err(|_| anyhow!("front side renderer panicked"))?;

        let front_count = self.state.record(CameraSide::Front, front_out.person_count);
        let back_count = self.state.record(CameraSide::Back, back_out.person_count);
        let decision = Decision::evaluate(&self.options.thresholds, &self.state);

        let mut front_image = front_out.image;
        let mut back_image = back_out.image;
        tint(&mut front_image, decision.front, self.options.tint_alpha);
        tint(&mut back_image, decision.back, self.options.tint_alpha);
        let composite = CompositeFrame::new(self.next_index, compose(&front_image, &back_image));
        self.next_index += 1;

        for sink in sinks.iter_mut() {
            if let Err(err) = sink.emit(&composite) {
                self.stop(StopReason::Failed);
                return Err(err.context(format!("failed to emit frame {}", composite.index)));
            }
        }

        if self.options.single_image {
            if let Some(pause) = self.pause.as_mut() {
                if let Err(err) = pause() {
                    self.stop(StopReason::Failed);
                    return Err(err.context("single-image pause failed"));
                }
            }
        }

        log::info!("front person: {} back person: {}", front_count, back_count);
        log::info!(
            "max front: {} ({}) max back: {} ({})",
            self.state.max_front,
            decision.front,
            self.state.max_back,
            decision.back
        );

        let directive = decision.directive();
        if let Some(directive) = directive {
            self.directives += 1;
            log::warn!("{}", directive);
        }

        if self.options.single_image {
            self.stop(StopReason::SingleImage);
        } else if self.quit.load(Ordering::SeqCst) {
            log::info!("quit requested; stopping after frame {}", composite.index);
            self.stop(StopReason::Quit);
        }

        let elapsed = started.elapsed();
        log::info!("detecting time: {:.3}s", elapsed.as_secs_f64());

        Ok(Some(IterationReport {
            index: composite.index,
            front_count,
            back_count,
            state: self.state,
            decision,
            directive,
            elapsed,
        }))
    }

    fn read(&mut self, side: CameraSide) -> Option<Frame> {
        let source = match side {
            CameraSide::Front => &mut self.front,
            CameraSide::Back => &mut self.back,
        };
        let result = source.next_frame();
        let name = source.describe();
        match result {
            Ok(Some(frame)) => Some(frame),
            Ok(None) => {
                log::info!("{} source {} reached end of stream", side, name);
                self.stop(StopReason::EndOfStream(side));
                None
            }
            Err(err) => {
                log::warn!("{} source {} read failed: {:#}", side, name, err);
                self.stop(StopReason::ReadFailed(side));
                None
            }
        }
    }

    fn detect(&mut self, side: CameraSide, input: &RgbImage) -> Result<Vec<Detection>> {
        match self.detector.detect(input) {
            Ok(detections) => {
                log::debug!("{} raw detections: {:?}", side, detections);
                Ok(detections)
            }
            Err(err) => {
                self.stop(StopReason::Failed);
                Err(err).with_context(|| format!("{} detector ({}) failed", side, self.detector.name()))
            }
        }
    }

    /// The first stop reason wins.
    fn stop(&mut self, reason: StopReason) {
        if self.loop_state == LoopState::Running {
            self.loop_state = LoopState::Stopped(reason);
        }
    }
}
