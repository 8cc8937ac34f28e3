pub mod accumulator;
pub mod analyzer;
pub mod classifier;
pub mod config;
pub mod deduplicator;
pub mod error;
pub mod filter;
pub mod frame;
pub mod manager;
pub mod model;
pub mod pipeline;
pub mod sampler;
pub mod session;
#[cfg(feature = "backend-tract")]
pub mod tract;

#[cfg(test)]
pub(crate) mod test_utils;

pub use accumulator::{ScoreAccumulator, ScoreSnapshot};
pub use analyzer::{AnalyzedTile, TileAnalyzer, TileHalf};
pub use classifier::PipClassifier;
pub use config::{HeuristicConfig, HeuristicMode, ScanConfig};
pub use deduplicator::{CrossFrameDeduplicator, DetectionKey};
pub use error::DominoError;
pub use filter::{DetectionFilter, TileRegion};
pub use frame::{Frame, Tensor, YuvFrame};
pub use manager::{CycleOutcome, CycleReport, DominoScanManager, ScanStats};
pub use model::{ClassificationModel, DetectionModel, DetectionOutput};
pub use pipeline::DominoPipeline;
pub use sampler::FrameSampler;
pub use session::Session;
