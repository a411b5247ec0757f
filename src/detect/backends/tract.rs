#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use tract_onnx::prelude::*;

use crate::detect::backend::{DetectorBackend, DetectorSettings};
use crate::detect::nms::non_max_suppression;
use crate::detect::result::Detection;

/// Number of box coordinates (`cx, cy, w, h`) ahead of the class scores.
const BOX_FIELDS: usize = 4;

/// Tract-based backend for YOLO-style ONNX detectors.
///
/// Expects a single output of shape `[1, 4 + classes, anchors]` with center/size
/// boxes in input pixels. Scores below `confidence` are dropped and the survivors
/// go through per-class NMS before being returned.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    settings: DetectorSettings,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for `settings.input_size` inputs.
    pub fn new<P: AsRef<Path>>(model_path: P, settings: DetectorSettings) -> Result<Self> {
        let model_path = model_path.as_ref();
        let size = settings.input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self { model, settings })
    }

    fn build_input(&self, input: &RgbImage) -> Result<Tensor> {
        let size = self.settings.input_size;
        if input.width() != size || input.height() != size {
            return Err(anyhow!(
                "input size {}x{} does not match model input {}x{}",
                input.width(),
                input.height(),
                size,
                size
            ));
        }

        let size = size as usize;
        let tensor = tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
            input.get_pixel(x as u32, y as u32).0[c] as f32 / 255.0
        });
        Ok(tensor.into_tensor())
    }

    fn decode(&self, outputs: TVec<TValue>) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let preds = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?
            .into_dimensionality::<tract_ndarray::Ix3>()
            .context("model output is not [batch, fields, anchors]")?;

        let fields = preds.shape()[1];
        if fields <= BOX_FIELDS {
            return Err(anyhow!("model output has no class scores ({} fields)", fields));
        }

        let mut detections = Vec::new();
        for anchor in 0..preds.shape()[2] {
            let (class_id, score) = (BOX_FIELDS..fields)
                .map(|f| (f - BOX_FIELDS, preds[[0, f, anchor]]))
                .fold((0, f32::NEG_INFINITY), |best, x| if x.1 > best.1 { x } else { best });
            if !score.is_finite() || score < self.settings.confidence {
                continue;
            }

            let cx = preds[[0, 0, anchor]];
            let cy = preds[[0, 1, anchor]];
            let w = preds[[0, 2, anchor]];
            let h = preds[[0, 3, anchor]];
            detections.push(Detection::new(
                class_id as u32,
                cx - w / 2.0,
                cy - h / 2.0,
                cx + w / 2.0,
                cy + h / 2.0,
                score,
            ));
        }

        non_max_suppression(&mut detections, self.settings.nms_threshold);
        Ok(detections)
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, input: &RgbImage) -> Result<Vec<Detection>> {
        let tensor = self.build_input(input)?;
        let outputs = self
            .model
            .run(tvec!(tensor.into()))
            .context("ONNX inference failed")?;
        self.decode(outputs)
    }

    fn warm_up(&mut self) -> Result<()> {
        let size = self.settings.input_size;
        self.detect(&RgbImage::new(size, size)).map(|_| ())
    }
}
