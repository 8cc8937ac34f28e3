use log::{debug, info};

use super::accumulator::{ScoreAccumulator, ScoreSnapshot};
use super::analyzer::AnalyzedTile;
use super::deduplicator::CrossFrameDeduplicator;

/// Issued when a cycle starts; only a ticket from the current epoch may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTicket {
    epoch: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Applied {
        accepted: Vec<AnalyzedTile>,
        points_added: u32,
    },
    /// The session stopped or restarted while the cycle was running.
    Stale,
}

/// One camera-open to camera-close interaction. Owns the dedup keys and the score,
/// which are only ever cleared together.
#[derive(Debug, Default)]
pub struct Session {
    active: bool,
    epoch: u64,
    dedup: CrossFrameDeduplicator,
    score: ScoreAccumulator,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.epoch += 1;
        self.active = true;
        self.clear();
        info!("📷 Session {} started", self.epoch);
    }

    pub fn stop(&mut self) {
        let ended = self.epoch;
        self.epoch += 1;
        self.active = false;
        self.clear();
        info!("🛑 Session {} stopped", ended);
    }

    fn clear(&mut self) {
        self.dedup.clear();
        self.score.reset();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn ticket(&self) -> Option<CycleTicket> {
        self.active.then_some(CycleTicket { epoch: self.epoch })
    }

    pub fn is_current(&self, ticket: &CycleTicket) -> bool {
        self.active && ticket.epoch == self.epoch
    }

    /// Applies a cycle's tiles: unseen keys are recorded and scored, repeats dropped.
    pub fn commit(&mut self, ticket: &CycleTicket, tiles: Vec<AnalyzedTile>) -> CommitOutcome {
        if !self.is_current(ticket) {
            debug!(
                "⏭️ Discarding {} tiles from epoch {} (current {})",
                tiles.len(),
                ticket.epoch,
                self.epoch
            );
            return CommitOutcome::Stale;
        }

        let accepted = self.dedup.filter_new(tiles);
        let points_added = self.score.add_batch(&accepted);
        CommitOutcome::Applied {
            accepted,
            points_added,
        }
    }

    pub fn total_points(&self) -> u32 {
        self.score.total_points()
    }

    pub fn detected_count(&self) -> usize {
        self.score.len()
    }

    pub fn seen_keys(&self) -> usize {
        self.dedup.len()
    }

    pub fn snapshot(&self) -> ScoreSnapshot {
        self.score.snapshot()
    }
}
