use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use super::error::DominoError;

/// How the heuristic classifier groups dark pixels into pips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicMode {
    /// Scan in raster order; each counted pixel suppresses the next `lookahead - 1` indices.
    Lookahead,
    /// 8-connected blob labeling over the dark mask.
    ConnectedComponents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Grayscale values strictly below this (in [0, 1]) are dark.
    pub dark_threshold: f32,
    pub lookahead: usize,
    pub max_pips: u32,
    pub mode: HeuristicMode,
    /// Smallest blob kept in `ConnectedComponents` mode.
    pub min_blob_area: usize,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            dark_threshold: 0.3,
            lookahead: 10,
            max_pips: 9,
            mode: HeuristicMode::Lookahead,
            min_blob_area: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub confidence_threshold: f32,
    pub detector_input_size: u32,
    pub pip_input_size: u32,
    pub sample_fps: u32,
    /// Classify halves with the pip model when one is loaded.
    pub use_ai: bool,
    pub clamp_model_pips: bool,
    pub heuristic: HeuristicConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.65,
            detector_input_size: 320,
            pip_input_size: 64,
            sample_fps: 3,
            use_ai: true,
            clamp_model_pips: false,
            heuristic: HeuristicConfig::default(),
        }
    }
}

impl ScanConfig {
    pub fn for_low_power() -> Self {
        Self {
            sample_fps: 1,
            use_ai: false,
            ..Default::default()
        }
    }

    pub fn for_fast_scan() -> Self {
        Self {
            confidence_threshold: 0.55,
            sample_fps: 5,
            ..Default::default()
        }
    }

    pub fn from_json5_str(text: &str) -> Result<Self, DominoError> {
        let config: ScanConfig =
            json5::from_str(text).map_err(|e| DominoError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DominoError> {
        let path = path.as_ref();
        info!("⚙️ Loading scan config from {:?}", path);
        let text = std::fs::read_to_string(path)?;
        Self::from_json5_str(&text)
    }

    pub fn validate(&self) -> Result<(), DominoError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(DominoError::Config(format!(
                "confidence_threshold must be in [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if self.detector_input_size == 0 || self.pip_input_size == 0 {
            return Err(DominoError::Config("input sizes must be non-zero".into()));
        }
        if self.sample_fps == 0 {
            return Err(DominoError::Config("sample_fps must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.heuristic.dark_threshold) {
            return Err(DominoError::Config(format!(
                "heuristic.dark_threshold must be in [0, 1], got {}",
                self.heuristic.dark_threshold
            )));
        }
        if self.heuristic.lookahead == 0 {
            return Err(DominoError::Config("heuristic.lookahead must be at least 1".into()));
        }
        Ok(())
    }

    /// Minimum spacing between admitted frames.
    pub fn sample_interval_ms(&self) -> u64 {
        1000 / self.sample_fps.max(1) as u64
    }
}
