//! Pip counting for one tile half.
//!
//! Two strategies share one entry point:
//! - `Model`: crop, resize to the classifier input, arg-max over the class distribution
//! - `Heuristic`: grayscale threshold plus a blob count, for when no model is loaded

use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::RgbImage;
use log::warn;

use super::analyzer::TileHalf;
use super::config::{HeuristicConfig, HeuristicMode};
use super::error::DominoError;
use super::frame::{Frame, Tensor};
use super::model::{argmax, ClassificationModel};

/// Highest pip class accepted from a model without a warning.
pub const MAX_PIP_CLASS: u32 = 9;

#[derive(Clone)]
pub enum PipClassifier {
    Model {
        model: Arc<dyn ClassificationModel>,
        input_size: u32,
        clamp: bool,
    },
    Heuristic(HeuristicConfig),
}

impl PipClassifier {
    pub fn with_model(model: Arc<dyn ClassificationModel>, input_size: u32) -> Self {
        PipClassifier::Model {
            model,
            input_size,
            clamp: false,
        }
    }

    pub fn heuristic(config: HeuristicConfig) -> Self {
        PipClassifier::Heuristic(config)
    }

    pub fn strategy_name(&self) -> &'static str {
        match self {
            PipClassifier::Model { .. } => "model",
            PipClassifier::Heuristic(_) => "heuristic",
        }
    }

    pub fn count_pips(&self, frame: &Frame, half: &TileHalf) -> Result<u32, DominoError> {
        let region = frame.crop(half.x, half.y, half.width, half.height)?;
        match self {
            PipClassifier::Model {
                model,
                input_size,
                clamp,
            } => classify_with_model(model.as_ref(), region, *input_size, *clamp),
            PipClassifier::Heuristic(config) => Ok(count_heuristic(&region, config)),
        }
    }
}

impl std::fmt::Debug for PipClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipClassifier::Model {
                model, input_size, ..
            } => write!(f, "PipClassifier::Model({}, {}px)", model.name(), input_size),
            PipClassifier::Heuristic(config) => {
                write!(f, "PipClassifier::Heuristic({:?})", config.mode)
            }
        }
    }
}

fn classify_with_model(
    model: &dyn ClassificationModel,
    region: RgbImage,
    input_size: u32,
    clamp: bool,
) -> Result<u32, DominoError> {
    let input = {
        let resized = imageops::resize(&region, input_size, input_size, FilterType::Triangle);
        drop(region);
        Tensor::from_rgb_image(&resized)
    };

    let distribution = model.infer(&input)?;
    drop(input);

    let class = argmax(&distribution)
        .ok_or_else(|| DominoError::Inference(format!("{} returned no classes", model.name())))?
        as u32;

    if class > MAX_PIP_CLASS {
        warn!("⚠️ {} predicted pip class {} outside 0-9", model.name(), class);
        if clamp {
            return Ok(MAX_PIP_CLASS);
        }
    }
    Ok(class)
}

pub fn count_heuristic(region: &RgbImage, config: &HeuristicConfig) -> u32 {
    let mask = dark_mask(region, config.dark_threshold);
    let count = match config.mode {
        HeuristicMode::Lookahead => count_lookahead(&mask, config.lookahead),
        HeuristicMode::ConnectedComponents => {
            let (width, height) = region.dimensions();
            count_components(&mask, width as usize, height as usize, config.min_blob_area)
        }
    };
    count.min(config.max_pips)
}

/// Channel-mean grayscale in [0, 1]; `true` where strictly below `threshold`.
pub fn dark_mask(region: &RgbImage, threshold: f32) -> Vec<bool> {
    region
        .pixels()
        .map(|p| {
            let gray = (p[0] as f32 + p[1] as f32 + p[2] as f32) / (3.0 * 255.0);
            gray < threshold
        })
        .collect()
}

/// Raster-order blob approximation: every counted dark pixel hides the
/// remaining `lookahead - 1` indices after it. Rows are not merged, so a pip
/// taller than one row is counted once per row.
pub fn count_lookahead(mask: &[bool], lookahead: usize) -> u32 {
    let mut count = 0u32;
    let mut next_free = 0usize;

    for (i, &dark) in mask.iter().enumerate() {
        if dark && i >= next_free {
            count += 1;
            next_free = i + lookahead.max(1);
        }
    }
    count
}

/// 8-connected components over the mask with at least `min_area` pixels.
pub fn count_components(mask: &[bool], width: usize, height: usize, min_area: usize) -> u32 {
    if width == 0 || height == 0 || mask.len() < width * height {
        return 0;
    }

    let mut visited = vec![false; width * height];
    let mut stack = Vec::new();
    let mut count = 0u32;

    for start in 0..width * height {
        if !mask[start] || visited[start] {
            continue;
        }

        visited[start] = true;
        stack.push(start);
        let mut area = 0usize;

        while let Some(idx) = stack.pop() {
            area += 1;
            let x = idx % width;
            let y = idx / width;

            for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                    let n = ny * width + nx;
                    if mask[n] && !visited[n] {
                        visited[n] = true;
                        stack.push(n);
                    }
                }
            }
        }

        if area >= min_area.max(1) {
            count += 1;
        }
    }
    count
}
