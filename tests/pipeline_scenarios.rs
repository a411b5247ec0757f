use anyhow::Result;
use image::{Rgb, RgbImage};

use occupancy_monitor::ingest::open_source;
use occupancy_monitor::{
    AlertColor, CameraSide, CompositeFrame, Detection, DirectorySink, Directive, FileConfig,
    FileSource, FrameSink, FrameSource, LoopState, Pipeline, PipelineOptions, RenderAssets,
    SourceMode, StopReason, StubBackend,
};

#[derive(Default)]
struct MemorySink {
    frames: Vec<CompositeFrame>,
}

impl FrameSink for MemorySink {
    fn emit(&mut self, frame: &CompositeFrame) -> Result<()> {
        self.frames.push(CompositeFrame::new(frame.index, frame.image().clone()));
        Ok(())
    }
}

fn synthetic(name: &str, width: u32, height: u32, frames: u64) -> Box<dyn FrameSource> {
    let mut source = FileSource::new(FileConfig {
        path: format!("stub://{}", name),
        width,
        height,
        max_frames: Some(frames),
    })
    .expect("synthetic source");
    source.connect().expect("connect");
    Box::new(source)
}

/// `n` non-overlapping person boxes inside the letterboxed content area.
fn persons(n: usize) -> Vec<Detection> {
    (0..n)
        .map(|i| {
            let x = 8.0 + i as f32 * 30.0;
            Detection::new(0, x, 80.0, x + 24.0, 200.0, 0.9)
        })
        .collect()
}

fn seeded() -> PipelineOptions {
    PipelineOptions {
        seed: Some(11),
        ..PipelineOptions::default()
    }
}

#[test]
fn crowded_front_with_room_behind_issues_directive() -> Result<()> {
    let detector = StubBackend::from_pairs(vec![(persons(4), persons(2))]);
    let mut pipeline = Pipeline::new(
        synthetic("front", 640, 480, 1),
        synthetic("back", 640, 480, 1),
        detector,
        RenderAssets::default(),
        seeded(),
    );
    let mut sink = MemorySink::default();

    let report = pipeline.step(&mut [&mut sink])?.expect("one iteration");
    assert_eq!(report.front_count, 4);
    assert_eq!(report.back_count, 2);
    assert_eq!(report.decision.front, AlertColor::Red);
    assert_eq!(report.decision.back, AlertColor::Green);
    assert_eq!(report.directive, Some(Directive::MoveBack));
    Ok(())
}

#[test]
fn red_persists_after_an_empty_frame() -> Result<()> {
    let detector = StubBackend::from_pairs(vec![
        (persons(4), persons(1)),
        (Vec::new(), Vec::new()),
        (persons(1), Vec::new()),
    ]);
    let mut pipeline = Pipeline::new(
        synthetic("front", 320, 240, 3),
        synthetic("back", 320, 240, 3),
        detector,
        RenderAssets::default(),
        seeded(),
    );
    let mut sink = MemorySink::default();

    let mut reports = Vec::new();
    while let Some(report) = pipeline.step(&mut [&mut sink])? {
        reports.push(report);
    }

    assert_eq!(reports.len(), 3);
    for report in &reports {
        assert_eq!(report.decision.front, AlertColor::Red);
        assert_eq!(report.state.max_front, 4);
        assert_eq!(report.directive, Some(Directive::MoveBack));
    }
    assert_eq!(reports[1].front_count, 0);
    assert_eq!(
        pipeline.loop_state(),
        LoopState::Stopped(StopReason::EndOfStream(CameraSide::Front))
    );
    Ok(())
}

#[test]
fn maxima_never_decrease_across_a_run() -> Result<()> {
    let counts = [(1, 3), (5, 0), (2, 11), (0, 4), (6, 12)];
    let detector = StubBackend::from_pairs(
        counts
            .iter()
            .map(|&(front, back)| (persons(front), persons(back)))
            .collect(),
    );
    let mut pipeline = Pipeline::new(
        synthetic("front", 640, 480, 5),
        synthetic("back", 640, 480, 5),
        detector,
        RenderAssets::default(),
        seeded(),
    );
    let mut sink = MemorySink::default();

    let mut previous = pipeline.state();
    let mut expected_front = 0;
    let mut expected_back = 0;
    for &(front, back) in &counts {
        let report = pipeline.step(&mut [&mut sink])?.expect("iteration");
        expected_front = expected_front.max(front);
        expected_back = expected_back.max(back);
        assert!(report.state.max_front >= previous.max_front);
        assert!(report.state.max_back >= previous.max_back);
        assert_eq!(report.state.max_front, expected_front);
        assert_eq!(report.state.max_back, expected_back);
        previous = report.state;
    }
    assert_eq!(pipeline.state().max_back, 12);
    assert_eq!(pipeline.summary().state.max_front, 6);
    Ok(())
}

#[test]
fn composite_joins_views_of_different_heights() -> Result<()> {
    let mut pipeline = Pipeline::new(
        synthetic("front", 200, 100, 1),
        synthetic("back", 120, 160, 1),
        StubBackend::new(),
        RenderAssets::default(),
        seeded(),
    );
    let mut sink = MemorySink::default();
    pipeline.run(&mut [&mut sink])?;

    assert_eq!(sink.frames.len(), 1);
    let dims = sink.frames[0].dims();
    assert_eq!((dims.width, dims.height), (320, 160));
    // Below the shorter front view the composite stays black.
    assert_eq!(*sink.frames[0].image().get_pixel(10, 150), Rgb([0, 0, 0]));
    Ok(())
}

#[test]
fn single_image_mode_writes_one_frame_and_stops() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let front_path = dir.path().join("front.png");
    let back_path = dir.path().join("back.png");
    RgbImage::from_pixel(64, 48, Rgb([100, 100, 100])).save(&front_path)?;
    RgbImage::from_pixel(64, 48, Rgb([100, 100, 100])).save(&back_path)?;

    let front = open_source(SourceMode::Image, &front_path.to_string_lossy())?;
    let back = open_source(SourceMode::Image, &back_path.to_string_lossy())?;
    let mut pipeline = Pipeline::new(
        front,
        back,
        StubBackend::new(),
        RenderAssets::default(),
        PipelineOptions {
            single_image: true,
            ..seeded()
        },
    );
    let mut sink = DirectorySink::new(dir.path().join("output"))?;
    let summary = pipeline.run(&mut [&mut sink])?;

    assert_eq!(summary.frames_processed, 1);
    assert_eq!(summary.stop_reason, Some(StopReason::SingleImage));
    assert_eq!(sink.written(), 1);
    assert!(dir.path().join("output/frame0000.jpg").exists());
    assert!(!dir.path().join("output/frame0001.jpg").exists());

    // Zero people on both sides: both views tinted green, 100 * 0.8 + 255 * 0.2 = 131.
    let written = image::open(dir.path().join("output/frame0000.jpg"))?.to_rgb8();
    assert_eq!((written.width(), written.height()), (128, 48));
    let pixel = written.get_pixel(32, 24);
    assert!(pixel[1] > pixel[0] + 30, "expected a green tint, got {:?}", pixel);
    Ok(())
}

#[test]
fn directory_sink_numbers_frames_from_zero() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut pipeline = Pipeline::new(
        synthetic("front", 64, 48, 3),
        synthetic("back", 64, 48, 3),
        StubBackend::new(),
        RenderAssets::default(),
        seeded(),
    );
    let mut sink = DirectorySink::new(dir.path())?;
    let summary = pipeline.run(&mut [&mut sink])?;

    assert_eq!(summary.frames_processed, 3);
    for index in 0..3 {
        assert!(dir.path().join(format!("frame{:04}.jpg", index)).exists());
    }
    assert!(!dir.path().join("frame0003.jpg").exists());
    Ok(())
}
