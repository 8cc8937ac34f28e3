//! ONNX 模型后端 (tract)

use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use tract_onnx::prelude::*;

use super::error::DominoError;
use super::frame::Tensor as FrameTensor;
use super::model::{ClassificationModel, DetectionModel, DetectionOutput};

pub const DETECTOR_FILE: &str = "detector.onnx";
pub const PIP_CLASSIFIER_FILE: &str = "pip_classifier.onnx";

type Plan = TypedRunnableModel<TypedModel>;

fn load_plan(path: &Path, size: u32) -> Result<Plan, DominoError> {
    let fail = |stage: &str, e: TractError| {
        DominoError::ModelLoadFailed(format!("{} ({}): {}", path.display(), stage, e))
    };
    let side = size as usize;

    tract_onnx::onnx()
        .model_for_path(path)
        .map_err(|e| fail("parse", e))?
        .with_input_fact(
            0,
            InferenceFact::dt_shape(f32::datum_type(), tvec!(1, side, side, 3)),
        )
        .map_err(|e| fail("input fact", e))?
        .into_optimized()
        .map_err(|e| fail("optimize", e))?
        .into_runnable()
        .map_err(|e| fail("plan", e))
}

fn to_input(tensor: &FrameTensor) -> Result<Tensor, DominoError> {
    let [n, h, w, c] = tensor.shape;
    tract_ndarray::Array4::from_shape_vec((n, h, w, c), tensor.data.clone())
        .map(|array| array.into_tensor())
        .map_err(|e| DominoError::Inference(format!("bad input shape {:?}: {}", tensor.shape, e)))
}

fn run(plan: &Plan, tensor: &FrameTensor) -> Result<TVec<TValue>, DominoError> {
    let input = to_input(tensor)?;
    plan.run(tvec!(input.into()))
        .map_err(|e| DominoError::Inference(e.to_string()))
}

fn output_f32(outputs: &TVec<TValue>, index: usize, name: &str) -> Result<Vec<f32>, DominoError> {
    let output = outputs
        .get(index)
        .ok_or_else(|| DominoError::Inference(format!("model produced no {} output", name)))?;
    let view = output
        .to_array_view::<f32>()
        .map_err(|e| DominoError::Inference(format!("{} output was not f32: {}", name, e)))?;
    Ok(view.iter().copied().collect())
}

/// SSD-style tile detector: boxes `[1, N, 4]`, scores `[1, N]`, classes `[1, N]`.
pub struct TractDetectionModel {
    plan: Plan,
}

impl TractDetectionModel {
    pub fn load<P: AsRef<Path>>(path: P, input_size: u32) -> Result<Self, DominoError> {
        let path = path.as_ref();
        info!("🧠 Loading detector from {:?}", path);
        Ok(Self {
            plan: load_plan(path, input_size)?,
        })
    }
}

impl DetectionModel for TractDetectionModel {
    fn name(&self) -> &'static str {
        "tract-detector"
    }

    fn infer(&self, input: &FrameTensor) -> Result<DetectionOutput, DominoError> {
        let outputs = run(&self.plan, input)?;

        let boxes = output_f32(&outputs, 0, "boxes")?
            .chunks_exact(4)
            .map(|b| [b[0], b[1], b[2], b[3]])
            .collect();
        Ok(DetectionOutput {
            boxes,
            scores: output_f32(&outputs, 1, "scores")?,
            classes: output_f32(&outputs, 2, "classes")?,
        })
    }
}

/// Pip-count classifier: one score per class, `[1, K]`.
pub struct TractClassificationModel {
    plan: Plan,
}

impl TractClassificationModel {
    pub fn load<P: AsRef<Path>>(path: P, input_size: u32) -> Result<Self, DominoError> {
        let path = path.as_ref();
        info!("🧠 Loading pip classifier from {:?}", path);
        Ok(Self {
            plan: load_plan(path, input_size)?,
        })
    }
}

impl ClassificationModel for TractClassificationModel {
    fn name(&self) -> &'static str {
        "tract-pip-classifier"
    }

    fn infer(&self, input: &FrameTensor) -> Result<Vec<f32>, DominoError> {
        let outputs = run(&self.plan, input)?;
        output_f32(&outputs, 0, "class scores")
    }
}

/// Loads both models from `models_dir`. The pip classifier is optional.
pub fn load_models(
    models_dir: &Path,
    detector_input_size: u32,
    pip_input_size: u32,
) -> Result<(Arc<dyn DetectionModel>, Option<Arc<dyn ClassificationModel>>), DominoError> {
    let detector_path = models_dir.join(DETECTOR_FILE);
    if !detector_path.exists() {
        return Err(DominoError::ModelLoadFailed(format!(
            "detector model not found at {:?}",
            detector_path
        )));
    }
    let detector: Arc<dyn DetectionModel> =
        Arc::new(TractDetectionModel::load(&detector_path, detector_input_size)?);

    let pip_path = models_dir.join(PIP_CLASSIFIER_FILE);
    let pip_model: Option<Arc<dyn ClassificationModel>> = if pip_path.exists() {
        Some(Arc::new(TractClassificationModel::load(&pip_path, pip_input_size)?))
    } else {
        warn!("⚠️ Pip classifier not found at {:?}", pip_path);
        None
    };

    Ok((detector, pip_model))
}
