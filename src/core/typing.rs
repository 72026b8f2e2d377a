//! Typing-derived stress metrics.
//!
//! Only two facts about each key press are kept: when it happened and
//! whether it was a backspace. Speed is computed over a trailing window,
//! the backspace ratio over the whole monitoring period.

use crate::core::stress::StressLevel;
use crate::core::windowing::{TrailingWindow, DEFAULT_WINDOW_SECS};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds of monitoring needed before a speed is reported.
pub const MIN_ELAPSED_SECS: f64 = 5.0;

/// Keystrokes needed before stress is classified above Low.
pub const MIN_KEYSTROKES_FOR_STRESS: u64 = 10;

/// A key press counts as active typing for this many seconds.
pub const ACTIVE_TYPING_SECS: f64 = 5.0;

pub const HIGH_BACKSPACE_RATIO: f64 = 0.3;
pub const MEDIUM_BACKSPACE_RATIO: f64 = 0.15;
pub const HIGH_SPEED_KPM: u32 = 400;
pub const MEDIUM_SPEED_KPM: u32 = 250;

/// Snapshot of typing behaviour at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingMetrics {
    pub total_keystrokes: u64,
    pub total_backspaces: u64,
    /// Keys per minute over the trailing window
    pub typing_speed: u32,
    /// Lifetime backspaces over lifetime keystrokes (0-1)
    #[serde(serialize_with = "serialize_ratio")]
    pub backspace_ratio: f64,
    pub stress_level: StressLevel,
    /// Backspaces over the trailing window
    pub recent_backspaces: usize,
    pub actively_typing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds_since_last_key: Option<f64>,
}

impl Default for TypingMetrics {
    fn default() -> Self {
        Self {
            total_keystrokes: 0,
            total_backspaces: 0,
            typing_speed: 0,
            backspace_ratio: 0.0,
            stress_level: StressLevel::Low,
            recent_backspaces: 0,
            actively_typing: false,
            seconds_since_last_key: None,
        }
    }
}

/// Ratios are shown to three decimals; comparisons use the exact value.
fn serialize_ratio<S>(ratio: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64((ratio * 1000.0).round() / 1000.0)
}

/// Classify typing stress from speed and backspace ratio.
pub fn classify(total_keystrokes: u64, speed: u32, backspace_ratio: f64) -> StressLevel {
    if total_keystrokes < MIN_KEYSTROKES_FOR_STRESS {
        StressLevel::Low
    } else if backspace_ratio > HIGH_BACKSPACE_RATIO || speed > HIGH_SPEED_KPM {
        StressLevel::High
    } else if backspace_ratio > MEDIUM_BACKSPACE_RATIO || speed > MEDIUM_SPEED_KPM {
        StressLevel::Medium
    } else {
        StressLevel::Low
    }
}

/// Rolling-window typing analyzer.
#[derive(Debug, Clone)]
pub struct TypingStressEngine {
    keys: TrailingWindow,
    backspaces: TrailingWindow,
    total_keystrokes: u64,
    total_backspaces: u64,
    started_at: DateTime<Utc>,
    last_key_at: Option<DateTime<Utc>>,
}

impl Default for TypingStressEngine {
    fn default() -> Self {
        Self::starting_at(Utc::now())
    }
}

impl TypingStressEngine {
    pub fn new(window_secs: u64) -> Self {
        Self::with_window_at(window_secs, Utc::now())
    }

    /// Engine whose monitoring clock started at `started_at`.
    pub fn starting_at(started_at: DateTime<Utc>) -> Self {
        Self::with_window_at(DEFAULT_WINDOW_SECS as u64, started_at)
    }

    pub fn with_window_at(window_secs: u64, started_at: DateTime<Utc>) -> Self {
        let window_secs = window_secs.max(1);
        Self {
            keys: TrailingWindow::new(window_secs),
            backspaces: TrailingWindow::new(window_secs),
            total_keystrokes: 0,
            total_backspaces: 0,
            started_at,
            last_key_at: None,
        }
    }

    /// Record a key press happening now.
    pub fn on_key(&mut self, is_backspace: bool) {
        self.on_key_at(is_backspace, Utc::now());
    }

    /// Record a key press at `timestamp`.
    pub fn on_key_at(&mut self, is_backspace: bool, timestamp: DateTime<Utc>) {
        self.total_keystrokes += 1;
        self.keys.record(timestamp);
        if is_backspace {
            self.total_backspaces += 1;
            self.backspaces.record(timestamp);
        }
        self.last_key_at = Some(self.last_key_at.map_or(timestamp, |t| t.max(timestamp)));
    }

    /// Keys per minute over the trailing window, 0 until enough time passed.
    pub fn typing_speed_at(&mut self, now: DateTime<Utc>) -> u32 {
        let elapsed = (now - self.started_at).num_milliseconds() as f64 / 1000.0;
        let elapsed = elapsed.min(self.keys.duration_secs());
        if elapsed < MIN_ELAPSED_SECS {
            return 0;
        }
        let recent = self.keys.count_at(now);
        self.backspaces.prune(now);
        ((recent as f64 / elapsed) * 60.0) as u32
    }

    /// Lifetime backspace ratio.
    pub fn backspace_ratio(&self) -> f64 {
        if self.total_keystrokes == 0 {
            return 0.0;
        }
        self.total_backspaces as f64 / self.total_keystrokes as f64
    }

    pub fn stress_level_at(&mut self, now: DateTime<Utc>) -> StressLevel {
        if self.total_keystrokes < MIN_KEYSTROKES_FOR_STRESS {
            return StressLevel::Low;
        }
        let speed = self.typing_speed_at(now);
        classify(self.total_keystrokes, speed, self.backspace_ratio())
    }

    /// `None` before the first key, or when the latest key is stamped after `now`.
    pub fn seconds_since_last_key_at(&self, now: DateTime<Utc>) -> Option<f64> {
        self.last_key_at
            .filter(|&t| t <= now)
            .map(|t| (now - t).num_milliseconds() as f64 / 1000.0)
    }

    pub fn is_actively_typing_at(&self, now: DateTime<Utc>) -> bool {
        self.seconds_since_last_key_at(now)
            .is_some_and(|secs| secs < ACTIVE_TYPING_SECS)
    }

    /// Backspaces within the trailing window.
    pub fn recent_backspaces_at(&mut self, now: DateTime<Utc>) -> usize {
        self.backspaces.count_at(now)
    }

    /// All metrics at once, consistent with each other.
    pub fn metrics_at(&mut self, now: DateTime<Utc>) -> TypingMetrics {
        let typing_speed = self.typing_speed_at(now);
        let backspace_ratio = self.backspace_ratio();
        TypingMetrics {
            total_keystrokes: self.total_keystrokes,
            total_backspaces: self.total_backspaces,
            typing_speed,
            backspace_ratio,
            stress_level: classify(self.total_keystrokes, typing_speed, backspace_ratio),
            recent_backspaces: self.recent_backspaces_at(now),
            actively_typing: self.is_actively_typing_at(now),
            seconds_since_last_key: self.seconds_since_last_key_at(now),
        }
    }

    pub fn metrics(&mut self) -> TypingMetrics {
        self.metrics_at(Utc::now())
    }

    pub fn total_keystrokes(&self) -> u64 {
        self.total_keystrokes
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Clear all counters and restart the monitoring clock at `now`.
    pub fn reset_at(&mut self, now: DateTime<Utc>) {
        self.keys.clear();
        self.backspaces.clear();
        self.total_keystrokes = 0;
        self.total_backspaces = 0;
        self.started_at = now;
        self.last_key_at = None;
        tracing::info!("Typing statistics reset");
    }
}
