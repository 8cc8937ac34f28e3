//! 扫描会话管理器

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use log::{debug, error, info};

use super::accumulator::ScoreSnapshot;
use super::analyzer::AnalyzedTile;
use super::error::DominoError;
use super::frame::{Frame, YuvFrame};
use super::pipeline::DominoPipeline;
use super::sampler::FrameSampler;
use super::session::{CommitOutcome, Session};

/// What happened to one submitted frame.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Detection ran and its new tiles were committed.
    Applied,
    /// Arrived sooner than the sampling interval allows.
    Throttled,
    /// Another cycle was still in flight.
    Busy,
    /// No session running.
    Inactive,
    /// The session stopped or restarted mid-cycle; results were discarded.
    Stale,
    Failed(String),
}

/// 单帧处理结果
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub frame_number: u64,
    pub timestamp_ms: u64,
    pub outcome: CycleOutcome,
    /// Tiles counted for the first time in this cycle.
    pub new_tiles: Vec<AnalyzedTile>,
    pub points_added: u32,
    pub total_points: u32,
}

impl CycleReport {
    fn skipped(frame_number: u64, timestamp_ms: u64, outcome: CycleOutcome) -> Self {
        Self {
            frame_number,
            timestamp_ms,
            outcome,
            new_tiles: Vec::new(),
            points_added: 0,
            total_points: 0,
        }
    }

    pub fn is_applied(&self) -> bool {
        self.outcome == CycleOutcome::Applied
    }
}

/// 扫描统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanStats {
    pub frames_seen: u64,
    pub cycles_run: u64,
    pub tiles_accepted: u64,
    pub failed_cycles: u64,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives one scanning session over a stream of camera frames.
///
/// At most one cycle runs at a time; frames arriving meanwhile are refused
/// with `Busy` rather than queued.
pub struct DominoScanManager {
    pipeline: DominoPipeline,
    session: Mutex<Session>,
    sampler: Mutex<FrameSampler>,
    in_flight: AtomicBool,
    stats: Mutex<ScanStats>,
}

impl DominoScanManager {
    pub fn new(pipeline: DominoPipeline) -> Self {
        let sampler = FrameSampler::with_interval(pipeline.config().sample_interval_ms());
        Self {
            pipeline,
            session: Mutex::new(Session::new()),
            sampler: Mutex::new(sampler),
            in_flight: AtomicBool::new(false),
            stats: Mutex::new(ScanStats::default()),
        }
    }

    pub fn pipeline(&self) -> &DominoPipeline {
        &self.pipeline
    }

    fn session(&self) -> Result<MutexGuard<'_, Session>, DominoError> {
        self.session.lock().map_err(|_| DominoError::LockPoisoned)
    }

    fn sampler(&self) -> Result<MutexGuard<'_, FrameSampler>, DominoError> {
        self.sampler.lock().map_err(|_| DominoError::LockPoisoned)
    }

    fn update_stats(&self, f: impl FnOnce(&mut ScanStats)) {
        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut stats);
    }

    /// Begins a fresh session: empty score, no remembered tiles.
    pub fn start(&self) -> Result<(), DominoError> {
        self.session()?.start();
        self.sampler()?.reset();
        Ok(())
    }

    /// Ends the session. A cycle still in flight will come back `Stale`.
    pub fn stop(&self) -> Result<(), DominoError> {
        self.session()?.stop();
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.session().map(|s| s.is_active()).unwrap_or(false)
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn process_frame(&self, frame: &Frame) -> CycleReport {
        self.update_stats(|s| s.frames_seen += 1);

        match self.run_cycle(frame) {
            Ok(report) => report,
            Err(e) => {
                error!("❌ Frame #{} skipped: {}", frame.frame_number, e);
                self.update_stats(|s| s.failed_cycles += 1);
                CycleReport::skipped(
                    frame.frame_number,
                    frame.timestamp_ms,
                    CycleOutcome::Failed(e.to_string()),
                )
            }
        }
    }

    /// Converts the camera planes and runs a cycle. A bad conversion fails only this frame.
    pub fn process_yuv_frame(&self, frame: &YuvFrame) -> CycleReport {
        match frame.to_rgb() {
            Ok(rgb) => self.process_frame(&rgb),
            Err(e) => {
                error!("❌ Frame #{} conversion failed: {}", frame.frame_number, e);
                self.update_stats(|s| {
                    s.frames_seen += 1;
                    s.failed_cycles += 1;
                });
                CycleReport::skipped(
                    frame.frame_number,
                    frame.timestamp_ms,
                    CycleOutcome::Failed(e.to_string()),
                )
            }
        }
    }

    /// Feeds frames in order, as a camera would.
    pub fn process_batch(&self, frames: &[Frame]) -> Vec<CycleReport> {
        frames.iter().map(|frame| self.process_frame(frame)).collect()
    }

    fn run_cycle(&self, frame: &Frame) -> Result<CycleReport, DominoError> {
        let skip = |outcome| Ok(CycleReport::skipped(frame.frame_number, frame.timestamp_ms, outcome));

        let Some(ticket) = self.session()?.ticket() else {
            return skip(CycleOutcome::Inactive);
        };

        frame.validate()?;

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("⏳ Frame #{} refused, cycle in flight", frame.frame_number);
            return skip(CycleOutcome::Busy);
        }
        let _guard = InFlightGuard(&self.in_flight);

        if !self.sampler()?.admit(frame.timestamp_ms) {
            return skip(CycleOutcome::Throttled);
        }

        self.update_stats(|s| s.cycles_run += 1);

        let regions = self.pipeline.detect(frame)?;

        // no point classifying halves for a session that is already gone
        if !self.session()?.is_current(&ticket) {
            return skip(CycleOutcome::Stale);
        }

        let tiles = self.pipeline.analyze(frame, &regions);

        let mut session = self.session()?;
        match session.commit(&ticket, tiles) {
            CommitOutcome::Stale => skip(CycleOutcome::Stale),
            CommitOutcome::Applied {
                accepted,
                points_added,
            } => {
                let total_points = session.total_points();
                drop(session);

                if !accepted.is_empty() {
                    info!(
                        "🎯 Frame #{}: {} new tiles, +{} points (total {})",
                        frame.frame_number,
                        accepted.len(),
                        points_added,
                        total_points
                    );
                }
                self.update_stats(|s| s.tiles_accepted += accepted.len() as u64);

                Ok(CycleReport {
                    frame_number: frame.frame_number,
                    timestamp_ms: frame.timestamp_ms,
                    outcome: CycleOutcome::Applied,
                    new_tiles: accepted,
                    points_added,
                    total_points,
                })
            }
        }
    }

    /// Total and tile list, read under one lock so they always agree.
    pub fn snapshot(&self) -> Result<ScoreSnapshot, DominoError> {
        Ok(self.session()?.snapshot())
    }

    pub fn total_points(&self) -> u32 {
        self.session().map(|s| s.total_points()).unwrap_or(0)
    }

    pub fn stats(&self) -> ScanStats {
        self.stats.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn reset_stats(&self) {
        self.update_stats(|s| *s = ScanStats::default());
    }
}
