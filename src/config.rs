use anyhow::{anyhow, bail, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::compose::DEFAULT_TINT_ALPHA;
use crate::decision::{Thresholds, DEFAULT_BACK_THRESHOLD, DEFAULT_FRONT_THRESHOLD};
use crate::detect::{DetectorSettings, DEFAULT_CONFIDENCE, DEFAULT_INPUT_SIZE, DEFAULT_NMS_THRESHOLD};
use crate::sink::DEFAULT_OUTPUT_DIR;

/// Environment variable naming the config file when no path is given.
pub const CONFIG_ENV: &str = "OCCUPANCY_CONFIG";

#[derive(Debug, Deserialize, Default)]
struct MonitorConfigFile {
    detector: Option<DetectorConfigFile>,
    thresholds: Option<ThresholdsConfigFile>,
    output: Option<OutputConfigFile>,
    labels_path: Option<PathBuf>,
    palette_path: Option<PathBuf>,
    font_path: Option<PathBuf>,
    seed: Option<u64>,
    tint_alpha: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    input_size: Option<u32>,
    confidence: Option<f32>,
    nms_threshold: Option<f32>,
    model_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct ThresholdsConfigFile {
    front: Option<usize>,
    back: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub detector: DetectorSettings,
    /// ONNX weights. `None` runs without a real detector.
    pub model_path: Option<PathBuf>,
    pub thresholds: Thresholds,
    pub output_dir: PathBuf,
    pub labels_path: Option<PathBuf>,
    pub palette_path: Option<PathBuf>,
    pub font_path: Option<PathBuf>,
    pub seed: Option<u64>,
    pub tint_alpha: f32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::from_file(MonitorConfigFile::default())
    }
}

impl MonitorConfig {
    /// Load `path` (or `$OCCUPANCY_CONFIG`), apply `OCCUPANCY_*` overrides, validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let file_cfg = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => read_config_file(&path)?,
            None => MonitorConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: MonitorConfigFile) -> Self {
        let detector = file.detector.unwrap_or_default();
        let thresholds = file.thresholds.unwrap_or_default();
        Self {
            detector: DetectorSettings {
                input_size: detector.input_size.unwrap_or(DEFAULT_INPUT_SIZE),
                confidence: detector.confidence.unwrap_or(DEFAULT_CONFIDENCE),
                nms_threshold: detector.nms_threshold.unwrap_or(DEFAULT_NMS_THRESHOLD),
            },
            model_path: detector.model_path,
            thresholds: Thresholds {
                front: thresholds.front.unwrap_or(DEFAULT_FRONT_THRESHOLD),
                back: thresholds.back.unwrap_or(DEFAULT_BACK_THRESHOLD),
            },
            output_dir: file
                .output
                .and_then(|output| output.dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            labels_path: file.labels_path,
            palette_path: file.palette_path,
            font_path: file.font_path,
            seed: file.seed,
            tint_alpha: file.tint_alpha.unwrap_or(DEFAULT_TINT_ALPHA),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(size) = env_parsed::<u32>("OCCUPANCY_RESO")? {
            self.detector.input_size = size;
        }
        if let Some(confidence) = env_parsed::<f32>("OCCUPANCY_CONFIDENCE")? {
            self.detector.confidence = confidence;
        }
        if let Some(nms) = env_parsed::<f32>("OCCUPANCY_NMS_THRESH")? {
            self.detector.nms_threshold = nms;
        }
        if let Some(front) = env_parsed::<usize>("OCCUPANCY_FRONT_THRESHOLD")? {
            self.thresholds.front = front;
        }
        if let Some(back) = env_parsed::<usize>("OCCUPANCY_BACK_THRESHOLD")? {
            self.thresholds.back = back;
        }
        if let Some(seed) = env_parsed::<u64>("OCCUPANCY_SEED")? {
            self.seed = Some(seed);
        }
        if let Some(path) = env_path("OCCUPANCY_MODEL") {
            self.model_path = Some(path);
        }
        if let Some(path) = env_path("OCCUPANCY_OUTPUT_DIR") {
            self.output_dir = path;
        }
        if let Some(path) = env_path("OCCUPANCY_LABELS") {
            self.labels_path = Some(path);
        }
        if let Some(path) = env_path("OCCUPANCY_PALETTE") {
            self.palette_path = Some(path);
        }
        if let Some(path) = env_path("OCCUPANCY_FONT") {
            self.font_path = Some(path);
        }
        Ok(())
    }

    /// Check ranges. Called by `load`, and again by callers that patch fields afterwards.
    pub fn validate(&self) -> Result<()> {
        let size = self.detector.input_size;
        if size <= 32 || size % 32 != 0 {
            bail!("detector input size must be a multiple of 32 greater than 32, got {}", size);
        }
        check_unit("detector confidence", self.detector.confidence)?;
        check_unit("detector nms threshold", self.detector.nms_threshold)?;
        check_unit("tint alpha", self.tint_alpha)?;
        if self.output_dir.as_os_str().is_empty() {
            bail!("output directory must not be empty");
        }
        Ok(())
    }
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        bail!("{} must be within [0, 1], got {}", name, value);
    }
    Ok(())
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} has an invalid value: '{}'", key, value)),
        _ => Ok(None),
    }
}

fn read_config_file(path: &Path) -> Result<MonitorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
