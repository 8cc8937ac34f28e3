use std::collections::HashSet;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::model::DetectionOutput;

/// One detector candidate, normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionBox {
    pub y_min: f32,
    pub x_min: f32,
    pub y_max: f32,
    pub x_max: f32,
    pub score: f32,
    pub class_id: u32,
}

impl DetectionBox {
    pub fn from_output(output: &DetectionOutput, index: usize) -> Option<Self> {
        let [y_min, x_min, y_max, x_max] = *output.boxes.get(index)?;
        Some(Self {
            y_min,
            x_min,
            y_max,
            x_max,
            score: *output.scores.get(index)?,
            class_id: output.classes.get(index)?.max(0.0) as u32,
        })
    }

    pub fn to_region(&self, frame_width: u32, frame_height: u32) -> TileRegion {
        let fw = frame_width as f32;
        let fh = frame_height as f32;
        TileRegion {
            x: self.x_min * fw,
            y: self.y_min * fh,
            width: (self.x_max - self.x_min) * fw,
            height: (self.y_max - self.y_min) * fh,
            confidence: self.score,
            class_id: self.class_id,
        }
    }
}

/// Pixel-space tile rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    pub class_id: u32,
}

impl TileRegion {
    pub fn position_key(&self) -> (i64, i64) {
        (self.x.round() as i64, self.y.round() as i64)
    }
}

/// Confidence threshold plus same-frame dedup by rounded position.
///
/// The first box at a given position wins, in detector output order, even when a
/// later box at the same spot scores higher.
#[derive(Debug, Clone, Copy)]
pub struct DetectionFilter {
    threshold: f32,
}

impl DetectionFilter {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn filter(
        &self,
        output: &DetectionOutput,
        frame_width: u32,
        frame_height: u32,
    ) -> Vec<TileRegion> {
        if output.boxes.len() != output.scores.len() || output.scores.len() != output.classes.len() {
            warn!(
                "⚠️ Detector arrays disagree (boxes={}, scores={}, classes={}), using {}",
                output.boxes.len(),
                output.scores.len(),
                output.classes.len(),
                output.len()
            );
        }

        let mut seen_positions = HashSet::new();
        let mut regions = Vec::new();

        for index in 0..output.len() {
            let Some(candidate) = DetectionBox::from_output(output, index) else {
                continue;
            };
            if candidate.score.is_nan() || candidate.score < self.threshold {
                continue;
            }

            let region = candidate.to_region(frame_width, frame_height);
            if seen_positions.insert(region.position_key()) {
                regions.push(region);
            } else {
                debug!("🔁 Dropped same-position box #{} at {:?}", index, region.position_key());
            }
        }

        regions
    }
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self::new(0.65)
    }
}
