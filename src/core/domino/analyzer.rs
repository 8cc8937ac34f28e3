use log::{debug, warn};
use once_cell::sync::Lazy;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::classifier::PipClassifier;
use super::filter::TileRegion;
use super::frame::Frame;

static ANALYSIS_POOL: Lazy<Option<rayon::ThreadPool>> = Lazy::new(|| {
    let num_threads = num_cpus::get().min(4);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("domino-analyze-{}", i))
        .build()
        .map_err(|e| warn!("⚠️ Analysis pool unavailable, using global pool: {}", e))
        .ok()
});

/// Integer pixel rectangle covering one half of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileHalf {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TileHalf {
    /// Splits a region along its width. Both halves are `floor(width / 2)` wide.
    pub fn split(region: &TileRegion) -> (TileHalf, TileHalf) {
        let half_width = region.width.max(0.0) / 2.0;
        let width = half_width.floor() as u32;
        let height = region.height.max(0.0).round() as u32;
        let y = region.y.round().max(0.0) as u32;

        let left = TileHalf {
            x: region.x.round().max(0.0) as u32,
            y,
            width,
            height,
        };
        let right = TileHalf {
            x: (region.x + half_width).round().max(0.0) as u32,
            y,
            width,
            height,
        };
        (left, right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedTile {
    pub region: TileRegion,
    pub value1: u32,
    pub value2: u32,
    pub points: u32,
}

impl AnalyzedTile {
    pub fn new(region: TileRegion, value1: u32, value2: u32) -> Self {
        Self {
            region,
            value1,
            value2,
            points: value1 + value2,
        }
    }
}

pub struct TileAnalyzer {
    classifier: PipClassifier,
}

impl TileAnalyzer {
    pub fn new(classifier: PipClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &PipClassifier {
        &self.classifier
    }

    /// Classifies both halves of every region. Output order follows `regions`.
    pub fn analyze(&self, frame: &Frame, regions: &[TileRegion]) -> Vec<AnalyzedTile> {
        let run = || {
            regions
                .par_iter()
                .map(|region| self.analyze_region(frame, region))
                .collect::<Vec<_>>()
        };

        match ANALYSIS_POOL.as_ref() {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    fn analyze_region(&self, frame: &Frame, region: &TileRegion) -> AnalyzedTile {
        let (left, right) = TileHalf::split(region);
        let value1 = self.classify_half(frame, &left);
        let value2 = self.classify_half(frame, &right);

        debug!(
            "🧩 Tile at ({:.0}, {:.0}) -> {}|{} via {}",
            region.x,
            region.y,
            value1,
            value2,
            self.classifier.strategy_name()
        );
        AnalyzedTile::new(*region, value1, value2)
    }

    fn classify_half(&self, frame: &Frame, half: &TileHalf) -> u32 {
        match self.classifier.count_pips(frame, half) {
            Ok(value) => value,
            Err(e) => {
                warn!("⚠️ Pip classification failed for {:?}, using 0: {}", half, e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domino::config::{HeuristicConfig, HeuristicMode};
    use crate::core::domino::frame::Tensor;
    use crate::core::domino::model::MockClassificationModel;
    use crate::core::domino::test_utils::{frame_with_tile, region, solid_frame};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_split_widths() {
        for tenths in 0..500 {
            let width = tenths as f32 / 10.0;
            let (left, right) = TileHalf::split(&region(3.0, 4.0, width, 10.0));
            let total = left.width + right.width;

            assert_eq!(left.width, right.width);
            assert!(total as f32 <= width + 1e-4);
            assert!(total as f32 >= width.floor() - 1.0);
        }
    }

    #[test]
    fn test_split_integer_width() {
        for width in 0..100u32 {
            let (left, right) = TileHalf::split(&region(0.0, 0.0, width as f32, 5.0));
            let total = left.width + right.width;
            assert!(total == width || total + 1 == width);
        }
    }

    #[test]
    fn test_split_positions() {
        let (left, right) = TileHalf::split(&region(10.4, 20.6, 41.0, 30.2));
        assert_eq!(left, TileHalf { x: 10, y: 21, width: 20, height: 30 });
        assert_eq!(right, TileHalf { x: 31, y: 21, width: 20, height: 30 });

        let (left, _) = TileHalf::split(&region(5.0, 5.0, -8.0, -2.0));
        assert_eq!(left.width, 0);
        assert_eq!(left.height, 0);
    }

    #[test]
    fn test_blank_tile_scores_zero() {
        let frame = solid_frame(200, 100, 255);
        let analyzer = TileAnalyzer::new(PipClassifier::heuristic(HeuristicConfig::default()));

        let tiles = analyzer.analyze(&frame, &[region(20.0, 20.0, 80.0, 40.0)]);
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].value1, 0);
        assert_eq!(tiles[0].value2, 0);
        assert_eq!(tiles[0].points, 0);
    }

    #[test]
    fn test_rendered_tile_values() {
        let frame = frame_with_tile(300, 200, 40, 50, 96, 2, 5);
        let analyzer = TileAnalyzer::new(PipClassifier::heuristic(HeuristicConfig {
            mode: HeuristicMode::ConnectedComponents,
            min_blob_area: 4,
            ..Default::default()
        }));

        let tiles = analyzer.analyze(&frame, &[region(40.0, 50.0, 192.0, 96.0)]);
        assert_eq!((tiles[0].value1, tiles[0].value2, tiles[0].points), (2, 5, 7));
    }

    #[test]
    fn test_failed_half_defaults_to_zero() {
        // left half lies inside the frame, right half falls off the edge
        let frame = solid_frame(100, 100, 255);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let model = MockClassificationModel::with_pattern(move |_: &Tensor| {
            counter.fetch_add(1, Ordering::SeqCst);
            3
        });
        let analyzer = TileAnalyzer::new(PipClassifier::with_model(Arc::new(model), 64));

        let tiles = analyzer.analyze(
            &frame,
            &[region(80.0, 10.0, 40.0, 20.0), region(10.0, 10.0, 20.0, 20.0)],
        );

        assert_eq!(tiles.len(), 2);
        assert_eq!((tiles[0].value1, tiles[0].value2), (3, 0));
        assert_eq!((tiles[1].value1, tiles[1].value2), (3, 3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_failing_model_keeps_batch() {
        let frame = solid_frame(100, 100, 255);
        let analyzer = TileAnalyzer::new(PipClassifier::with_model(
            Arc::new(MockClassificationModel::failing()),
            64,
        ));

        let regions: Vec<_> = (0..5).map(|i| region(i as f32 * 15.0, 0.0, 14.0, 10.0)).collect();
        let tiles = analyzer.analyze(&frame, &regions);

        assert_eq!(tiles.len(), 5);
        assert!(tiles.iter().all(|t| t.points == 0));
        for (tile, region) in tiles.iter().zip(&regions) {
            assert_eq!(tile.region.x, region.x);
        }
    }
}
