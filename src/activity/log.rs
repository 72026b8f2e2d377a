//! Lock-free counters for signal throughput.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Session counters, updated from the producer and publisher threads.
#[derive(Debug)]
pub struct ActivityLog {
    /// Frames that produced a calibration sample or a score
    frames_scored: AtomicU64,
    /// Frames rejected for a degenerate shoulder line
    frames_rejected: AtomicU64,
    /// Frames whose metrics could not be computed
    frames_failed: AtomicU64,
    /// Frames dropped because the ingest queue was full
    frames_dropped: AtomicU64,
    key_presses: AtomicU64,
    snapshots_published: AtomicU64,
    breaks_recorded: AtomicU64,
    session_start: DateTime<Utc>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self {
            frames_scored: AtomicU64::new(0),
            frames_rejected: AtomicU64::new(0),
            frames_failed: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            key_presses: AtomicU64::new(0),
            snapshots_published: AtomicU64::new(0),
            breaks_recorded: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    pub fn record_frame_scored(&self) {
        self.frames_scored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_failed(&self) {
        self.frames_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_key_press(&self) {
        self.key_presses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot_published(&self) {
        self.snapshots_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_break(&self) {
        self.breaks_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> ActivityStats {
        ActivityStats {
            frames_scored: self.frames_scored.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            frames_failed: self.frames_failed.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            key_presses: self.key_presses.load(Ordering::Relaxed),
            snapshots_published: self.snapshots_published.load(Ordering::Relaxed),
            breaks_recorded: self.breaks_recorded.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Human-readable summary for the CLI.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Activity:\n\
             - Pose frames scored: {}\n\
             - Pose frames rejected: {}\n\
             - Pose frames failed: {}\n\
             - Pose frames dropped: {}\n\
             - Key presses counted: {}\n\
             - Snapshots published: {}\n\
             - Breaks recorded: {}\n\
             - Session duration: {} seconds\n\
             \n\
             Privacy Guarantee:\n\
             - No images leave the pose model\n\
             - No key content captured\n\
             - Nothing written to disk",
            stats.frames_scored,
            stats.frames_rejected,
            stats.frames_failed,
            stats.frames_dropped,
            stats.key_presses,
            stats.snapshots_published,
            stats.breaks_recorded,
            stats.session_duration_secs
        )
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityStats {
    pub frames_scored: u64,
    pub frames_rejected: u64,
    pub frames_failed: u64,
    pub frames_dropped: u64,
    pub key_presses: u64,
    pub snapshots_published: u64,
    pub breaks_recorded: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

pub type SharedActivityLog = Arc<ActivityLog>;

pub fn create_shared_log() -> SharedActivityLog {
    Arc::new(ActivityLog::new())
}
