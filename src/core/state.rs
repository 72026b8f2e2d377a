//! The published state snapshot and the store that produces it.
//!
//! Producers mutate their own engine behind its own lock. The publisher
//! samples every engine, builds a complete [`StateSnapshot`] and swaps it in
//! under a short write lock; readers clone the current `Arc` and never see
//! a half-built snapshot.

use crate::core::breaks::{BreakRecord, BreakScheduler, BreakStatistics, BreakStatus};
use crate::core::posture::{PostureScoreEngine, PostureStatus};
use crate::core::stress::{StressAggregator, StressEvent, StressLevel, StressTrend};
use crate::core::typing::{TypingMetrics, TypingStressEngine};
use crate::error::ControlError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub const STATUS_STARTING: &str = "Starting...";
pub const STATUS_RUNNING: &str = "Running";
pub const STATUS_WAITING: &str = "Waiting for signal";

/// The flat, read-only state consumed by dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub posture: u8,
    pub time: String,
    pub stress: StressLevel,
    pub breaks_taken: u32,
    pub should_break: bool,
    pub typing_speed: u32,
    pub status: String,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            posture: 0,
            time: "0 min".to_string(),
            stress: StressLevel::Low,
            breaks_taken: 0,
            should_break: false,
            typing_speed: 0,
            status: STATUS_STARTING.to_string(),
        }
    }
}

/// Detailed, on-demand view across all engines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub posture: PostureStatus,
    pub typing: TypingMetrics,
    pub breaks: BreakStatus,
    pub break_statistics: BreakStatistics,
    pub break_interval_minutes: i64,
    pub stress_level: StressLevel,
    pub stress_trend: StressTrend,
    pub recommendation: String,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owner of the engines and of the current snapshot.
#[derive(Debug)]
pub struct StateStore {
    posture: Arc<RwLock<PostureScoreEngine>>,
    typing: Arc<Mutex<TypingStressEngine>>,
    breaks: Arc<Mutex<BreakScheduler>>,
    stress: Arc<Mutex<StressAggregator>>,
    current: RwLock<Arc<StateSnapshot>>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(
            PostureScoreEngine::default(),
            TypingStressEngine::default(),
            BreakScheduler::default(),
        )
    }
}

impl StateStore {
    pub fn new(
        posture: PostureScoreEngine,
        typing: TypingStressEngine,
        breaks: BreakScheduler,
    ) -> Self {
        Self {
            posture: Arc::new(RwLock::new(posture)),
            typing: Arc::new(Mutex::new(typing)),
            breaks: Arc::new(Mutex::new(breaks)),
            stress: Arc::new(Mutex::new(StressAggregator::new())),
            current: RwLock::new(Arc::new(StateSnapshot::default())),
        }
    }

    /// Handle for the pose loop, the only writer of posture state.
    pub fn posture_engine(&self) -> Arc<RwLock<PostureScoreEngine>> {
        Arc::clone(&self.posture)
    }

    /// Handle for the key listener, the only writer of typing state.
    pub fn typing_engine(&self) -> Arc<Mutex<TypingStressEngine>> {
        Arc::clone(&self.typing)
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<StateSnapshot> {
        Arc::clone(&read(&self.current))
    }

    pub fn publish(&self) -> Arc<StateSnapshot> {
        self.publish_at(Utc::now())
    }

    /// Sample all engines at `now` and replace the current snapshot.
    ///
    /// Engine locks are taken one at a time, never nested.
    pub fn publish_at(&self, now: DateTime<Utc>) -> Arc<StateSnapshot> {
        let posture = read(&self.posture).published_score_at(now);
        let typing = lock(&self.typing).metrics_at(now);
        let (status, time) = {
            let breaks = lock(&self.breaks);
            (breaks.status_at(now), breaks.formatted_time_at(now))
        };
        // The fused level feeds trend and recommendation only.
        let posture_evidence = (posture > 0).then_some(posture);
        lock(&self.stress).evaluate_at(&typing, posture_evidence, now);

        let snapshot = Arc::new(StateSnapshot {
            posture,
            time,
            stress: typing.stress_level,
            breaks_taken: status.breaks_taken,
            should_break: status.should_break,
            typing_speed: typing.typing_speed,
            status: if posture > 0 {
                STATUS_RUNNING.to_string()
            } else {
                STATUS_WAITING.to_string()
            },
        });

        *write(&self.current) = Arc::clone(&snapshot);
        snapshot
    }

    pub fn insights(&self) -> Insights {
        self.insights_at(Utc::now())
    }

    pub fn insights_at(&self, now: DateTime<Utc>) -> Insights {
        let posture = read(&self.posture).status_at(now);
        let typing = lock(&self.typing).metrics_at(now);
        let (breaks, break_statistics, break_interval_minutes) = {
            let scheduler = lock(&self.breaks);
            (
                scheduler.status_at(now),
                scheduler.statistics(),
                scheduler.interval_minutes(),
            )
        };
        let (stress_level, stress_trend, recommendation) = {
            let stress = lock(&self.stress);
            (
                stress.current_level(),
                stress.trend(),
                stress.recommendation().to_string(),
            )
        };

        Insights {
            posture,
            typing,
            breaks,
            break_statistics,
            break_interval_minutes,
            stress_level,
            stress_trend,
            recommendation,
        }
    }

    /// Record a break; visible in the snapshot after the next publish.
    pub fn record_break(&self) -> BreakRecord {
        lock(&self.breaks).take_break()
    }

    pub fn record_break_at(&self, now: DateTime<Utc>) -> BreakRecord {
        lock(&self.breaks).take_break_at(now)
    }

    /// Clear break history and stress history.
    pub fn reset_statistics(&self) {
        self.reset_statistics_at(Utc::now());
    }

    pub fn reset_statistics_at(&self, now: DateTime<Utc>) {
        lock(&self.breaks).reset_at(now);
        lock(&self.stress).reset();
    }

    pub fn set_break_interval(&self, minutes: i64) -> Result<(), ControlError> {
        lock(&self.breaks).set_interval(minutes)
    }

    pub fn reset_calibration(&self) {
        write(&self.posture).reset_calibration();
    }

    /// Clear typing counters and restart the typing clock.
    pub fn reset_typing(&self) {
        self.reset_typing_at(Utc::now());
    }

    pub fn reset_typing_at(&self, now: DateTime<Utc>) {
        lock(&self.typing).reset_at(now);
    }

    pub fn break_history(&self) -> Vec<BreakRecord> {
        lock(&self.breaks).history().to_vec()
    }

    pub fn break_statistics(&self) -> BreakStatistics {
        lock(&self.breaks).statistics()
    }

    pub fn stress_history(&self) -> Vec<StressEvent> {
        lock(&self.stress).history().cloned().collect()
    }
}
