//! occupancyd - dual-camera occupancy monitor
//!
//! Reads frame pairs from a front and a back source, counts people on each side,
//! tints each view by its alert color and writes the side-by-side composites to
//! the output directory as `frameNNNN.jpg`. Logs "Go back!" whenever the front is
//! over capacity while the back still has room.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use occupancy_monitor::{
    ingest::open_source, CameraSide, DetectorBackend, DirectorySink, FrameSink, LabelStyle,
    LabelTable, MonitorConfig, Palette, Pipeline, PipelineOptions, RenderAssets, SourceMode,
    StubBackend,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Input kind for both sources.
    #[arg(long = "option", value_enum, default_value_t = SourceMode::Video)]
    mode: SourceMode,
    /// Front source: image path, video path, or webcam device.
    #[arg(long)]
    front: Option<String>,
    /// Back source: image path, video path, or webcam device.
    #[arg(long)]
    back: Option<String>,
    /// Object confidence to filter predictions.
    #[arg(long)]
    confidence: Option<f32>,
    /// NMS threshold.
    #[arg(long = "nms-thresh", alias = "nms_thresh")]
    nms_thresh: Option<f32>,
    /// ONNX detector weights.
    #[arg(long)]
    model: Option<PathBuf>,
    /// Detector input resolution. Multiple of 32, greater than 32.
    #[arg(long)]
    reso: Option<u32>,
    /// Newline-separated class names (defaults to COCO).
    #[arg(long)]
    labels: Option<PathBuf>,
    /// JSON array of [r, g, b] box colors.
    #[arg(long)]
    palette: Option<PathBuf>,
    /// TTF font for box labels.
    #[arg(long)]
    font: Option<PathBuf>,
    /// Output directory for composite frames.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Seed for box colors.
    #[arg(long)]
    seed: Option<u64>,
    /// Config file (JSON or .toml). Falls back to $OCCUPANCY_CONFIG.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Front alert threshold (RED above this many people).
    #[arg(long = "front-threshold")]
    front_threshold: Option<usize>,
    /// Back alert threshold (RED above this many people).
    #[arg(long = "back-threshold")]
    back_threshold: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = resolve_config(&args)?;

    let assets = load_assets(&cfg)?;
    let mut detector = build_detector(&cfg)?;
    detector.warm_up().context("detector warm-up failed")?;
    log::info!("detector backend: {}", detector.name());

    let front_locator = args
        .front
        .clone()
        .unwrap_or_else(|| args.mode.default_locator(CameraSide::Front).to_string());
    let back_locator = args
        .back
        .clone()
        .unwrap_or_else(|| args.mode.default_locator(CameraSide::Back).to_string());
    let front = open_source(args.mode, &front_locator)
        .with_context(|| format!("failed to open front source {}", front_locator))?;
    let back = open_source(args.mode, &back_locator)
        .with_context(|| format!("failed to open back source {}", back_locator))?;

    let mut sink = DirectorySink::new(&cfg.output_dir)?;
    log::info!("writing composites to {}", sink.dir().display());

    let quit = Arc::new(AtomicBool::new(false));
    let handler_flag = quit.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })
    .context("failed to install Ctrl-C handler")?;

    let options = PipelineOptions {
        thresholds: cfg.thresholds,
        input_size: cfg.detector.input_size,
        tint_alpha: cfg.tint_alpha,
        single_image: args.mode.is_single_image(),
        seed: cfg.seed,
    };
    let mut pipeline =
        Pipeline::new(front, back, detector, assets, options).with_quit_flag(quit);
    if args.mode.is_single_image() {
        pipeline = pipeline.with_pause_hook(wait_for_enter);
    }

    let mut sinks: [&mut dyn FrameSink; 1] = [&mut sink];
    let summary = pipeline.run(&mut sinks)?;
    log::info!(
        "stopped after {} frames ({:?}); max front {} max back {}; {} directives",
        summary.frames_processed,
        summary.stop_reason,
        summary.state.max_front,
        summary.state.max_back,
        summary.directives
    );
    Ok(())
}

fn resolve_config(args: &Args) -> Result<MonitorConfig> {
    let mut cfg = MonitorConfig::load(args.config.as_deref())?;
    apply_overrides(args, &mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

fn apply_overrides(args: &Args, cfg: &mut MonitorConfig) {
    if let Some(confidence) = args.confidence {
        cfg.detector.confidence = confidence;
    }
    if let Some(nms) = args.nms_thresh {
        cfg.detector.nms_threshold = nms;
    }
    if let Some(reso) = args.reso {
        cfg.detector.input_size = reso;
    }
    if let Some(front) = args.front_threshold {
        cfg.thresholds.front = front;
    }
    if let Some(back) = args.back_threshold {
        cfg.thresholds.back = back;
    }
    if args.model.is_some() {
        cfg.model_path = args.model.clone();
    }
    if args.labels.is_some() {
        cfg.labels_path = args.labels.clone();
    }
    if args.palette.is_some() {
        cfg.palette_path = args.palette.clone();
    }
    if args.font.is_some() {
        cfg.font_path = args.font.clone();
    }
    if let Some(output) = &args.output {
        cfg.output_dir = output.clone();
    }
    if args.seed.is_some() {
        cfg.seed = args.seed;
    }
}

fn load_assets(cfg: &MonitorConfig) -> Result<RenderAssets> {
    let labels = match &cfg.labels_path {
        Some(path) => LabelTable::from_file(path)?,
        None => LabelTable::coco(),
    };
    let palette = match &cfg.palette_path {
        Some(path) => Palette::from_file(path)?,
        None => Palette::default(),
    };
    let style = match &cfg.font_path {
        Some(path) => LabelStyle::from_font_file(path)?,
        None => LabelStyle::plain(),
    };
    if !style.has_font() {
        log::info!("no label font configured; boxes get unlabeled tabs");
    }
    RenderAssets::new(labels, palette, style)
}

fn build_detector(cfg: &MonitorConfig) -> Result<Box<dyn DetectorBackend>> {
    match &cfg.model_path {
        #[cfg(feature = "backend-tract")]
        Some(path) => {
            log::info!("loading detector model {}", path.display());
            let backend = occupancy_monitor::detect::TractBackend::new(path, cfg.detector)?;
            log::info!("detector model loaded");
            Ok(Box::new(backend))
        }
        #[cfg(not(feature = "backend-tract"))]
        Some(path) => anyhow::bail!(
            "cannot load {}: ONNX inference requires the backend-tract feature",
            path.display()
        ),
        None => {
            log::warn!("no detector model configured; every frame will report zero detections");
            Ok(Box::new(StubBackend::new()))
        }
    }
}

fn wait_for_enter() -> Result<()> {
    log::info!("press Enter to exit");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nms_threshold_accepts_both_spellings() {
        let args = Args::try_parse_from(["occupancyd", "--nms_thresh", "0.3"]).unwrap();
        assert_eq!(args.nms_thresh, Some(0.3));
        let args = Args::try_parse_from(["occupancyd", "--nms-thresh", "0.25"]).unwrap();
        assert_eq!(args.nms_thresh, Some(0.25));
    }

    #[test]
    fn flags_override_loaded_config() {
        let args = Args::try_parse_from([
            "occupancyd",
            "--option",
            "webcam",
            "--reso",
            "320",
            "--front-threshold",
            "5",
            "--output",
            "frames",
        ])
        .unwrap();
        assert_eq!(args.mode, SourceMode::Webcam);

        let mut cfg = MonitorConfig::default();
        apply_overrides(&args, &mut cfg);
        assert_eq!(cfg.detector.input_size, 320);
        assert_eq!(cfg.thresholds.front, 5);
        assert_eq!(cfg.thresholds.back, 10);
        assert_eq!(cfg.output_dir, PathBuf::from("frames"));
    }
}
