use serde::{Deserialize, Serialize};

use super::analyzer::AnalyzedTile;
use super::error::DominoError;

/// Read-only view of a session's score, handed to the game-scoring side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub total_points: u32,
    pub detected_dominos: Vec<AnalyzedTile>,
}

impl ScoreSnapshot {
    pub fn to_json(&self) -> Result<String, DominoError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Running total plus the append-only list of counted tiles.
#[derive(Debug, Default)]
pub struct ScoreAccumulator {
    total_points: u32,
    detected_dominos: Vec<AnalyzedTile>,
}

impl ScoreAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the batch and returns the points it added.
    pub fn add_batch(&mut self, tiles: &[AnalyzedTile]) -> u32 {
        let added = tiles
            .iter()
            .fold(0u32, |sum, tile| sum.saturating_add(tile.points));
        self.total_points = self.total_points.saturating_add(added);
        self.detected_dominos.extend_from_slice(tiles);
        added
    }

    pub fn total_points(&self) -> u32 {
        self.total_points
    }

    pub fn detected_dominos(&self) -> &[AnalyzedTile] {
        &self.detected_dominos
    }

    pub fn len(&self) -> usize {
        self.detected_dominos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detected_dominos.is_empty()
    }

    pub fn snapshot(&self) -> ScoreSnapshot {
        ScoreSnapshot {
            total_points: self.total_points,
            detected_dominos: self.detected_dominos.clone(),
        }
    }

    pub fn reset(&mut self) {
        self.total_points = 0;
        self.detected_dominos.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domino::test_utils::region;

    fn tile(value1: u32, value2: u32) -> AnalyzedTile {
        AnalyzedTile::new(region(0.0, 0.0, 10.0, 5.0), value1, value2)
    }

    #[test]
    fn test_total_tracks_tiles() {
        let mut acc = ScoreAccumulator::new();
        assert_eq!(acc.add_batch(&[tile(3, 4), tile(0, 0)]), 7);
        assert_eq!(acc.add_batch(&[]), 0);
        assert_eq!(acc.add_batch(&[tile(6, 5)]), 11);

        let sum: u32 = acc.detected_dominos().iter().map(|t| t.points).sum();
        assert_eq!(acc.total_points(), 18);
        assert_eq!(acc.total_points(), sum);
        assert_eq!(acc.len(), 3);
    }

    #[test]
    fn test_reset_clears_both() {
        let mut acc = ScoreAccumulator::new();
        acc.add_batch(&[tile(2, 2)]);
        acc.reset();
        assert_eq!(acc.total_points(), 0);
        assert!(acc.is_empty());
    }

    #[test]
    fn test_snapshot_json() {
        let mut acc = ScoreAccumulator::new();
        acc.add_batch(&[tile(1, 2)]);

        let json = acc.snapshot().to_json().unwrap();
        let parsed: ScoreSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.total_points, 3);
        assert_eq!(parsed.detected_dominos[0].value2, 2);
    }
}
