use std::collections::HashSet;
use std::fmt;

use super::analyzer::AnalyzedTile;

/// Identity of a counted tile: both values plus the rounded top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DetectionKey {
    pub value1: u32,
    pub value2: u32,
    pub x: i64,
    pub y: i64,
}

impl DetectionKey {
    pub fn from_tile(tile: &AnalyzedTile) -> Self {
        let (x, y) = tile.region.position_key();
        Self {
            value1: tile.value1,
            value2: tile.value2,
            x,
            y,
        }
    }
}

impl fmt::Display for DetectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}-{}", self.value1, self.value2, self.x, self.y)
    }
}

/// 跨帧去重器 - a tile visible over many frames is counted once per session.
#[derive(Debug, Default)]
pub struct CrossFrameDeduplicator {
    seen: HashSet<DetectionKey>,
}

impl CrossFrameDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the tile and returns `true` the first time its key shows up.
    pub fn accept(&mut self, tile: &AnalyzedTile) -> bool {
        self.seen.insert(DetectionKey::from_tile(tile))
    }

    /// Keeps the tiles whose keys are new, in order. Repeats inside `tiles` collapse too.
    pub fn filter_new(&mut self, tiles: Vec<AnalyzedTile>) -> Vec<AnalyzedTile> {
        tiles.into_iter().filter(|tile| self.accept(tile)).collect()
    }

    pub fn contains(&self, key: &DetectionKey) -> bool {
        self.seen.contains(key)
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
