use std::sync::Arc;

use log::{debug, warn};

use super::analyzer::{AnalyzedTile, TileAnalyzer};
use super::classifier::PipClassifier;
use super::config::ScanConfig;
use super::error::DominoError;
use super::filter::{DetectionFilter, TileRegion};
use super::frame::Frame;
use super::model::{ClassificationModel, DetectionModel};

/// Stateless per-frame stages: preprocess, detect, filter, analyze.
/// Session state (dedup keys, score) lives in `Session`.
pub struct DominoPipeline {
    config: ScanConfig,
    detector: Arc<dyn DetectionModel>,
    filter: DetectionFilter,
    analyzer: TileAnalyzer,
}

impl DominoPipeline {
    /// Uses the pip model when `config.use_ai` is set and one is supplied,
    /// otherwise falls back to the heuristic counter.
    pub fn new(
        detector: Arc<dyn DetectionModel>,
        pip_model: Option<Arc<dyn ClassificationModel>>,
        config: ScanConfig,
    ) -> Self {
        let classifier = match pip_model {
            Some(model) if config.use_ai => PipClassifier::Model {
                model,
                input_size: config.pip_input_size,
                clamp: config.clamp_model_pips,
            },
            None if config.use_ai => {
                warn!("⚠️ No pip model loaded, counting pips heuristically");
                PipClassifier::heuristic(config.heuristic.clone())
            }
            _ => PipClassifier::heuristic(config.heuristic.clone()),
        };
        Self::with_classifier(detector, classifier, config)
    }

    pub fn with_classifier(
        detector: Arc<dyn DetectionModel>,
        classifier: PipClassifier,
        config: ScanConfig,
    ) -> Self {
        Self {
            filter: DetectionFilter::new(config.confidence_threshold),
            analyzer: TileAnalyzer::new(classifier),
            detector,
            config,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn classifier(&self) -> &PipClassifier {
        self.analyzer.classifier()
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    /// Runs the detector and returns the surviving tile regions in detector order.
    pub fn detect(&self, frame: &Frame) -> Result<Vec<TileRegion>, DominoError> {
        let output = {
            let input = frame.preprocess(self.config.detector_input_size)?;
            self.detector.infer(&input)?
        };

        let regions = self.filter.filter(&output, frame.width, frame.height);
        debug!(
            "🔍 Frame #{}: {} candidates, {} kept (threshold {})",
            frame.frame_number,
            output.len(),
            regions.len(),
            self.filter.threshold()
        );
        Ok(regions)
    }

    pub fn analyze(&self, frame: &Frame, regions: &[TileRegion]) -> Vec<AnalyzedTile> {
        self.analyzer.analyze(frame, regions)
    }

    pub fn process(&self, frame: &Frame) -> Result<Vec<AnalyzedTile>, DominoError> {
        let regions = self.detect(frame)?;
        Ok(self.analyze(frame, &regions))
    }
}
