//! Multi-source stress aggregation with trend detection.

use crate::core::typing::{TypingMetrics, HIGH_BACKSPACE_RATIO, HIGH_SPEED_KPM};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Number of evaluations kept for trend analysis.
pub const STRESS_HISTORY_LEN: usize = 100;

/// Posture scores below this raise the poor-posture indicator.
pub const POOR_POSTURE_SCORE: u8 = 50;

/// Events needed before a trend other than stable is reported.
const TREND_SPAN: usize = 5;

/// Qualitative stress level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum StressLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl StressLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StressLevel::Low => "Low",
            StressLevel::Medium => "Medium",
            StressLevel::High => "High",
        }
    }

    /// Ordinal used for trend arithmetic (Low = 1).
    pub fn ordinal(&self) -> u8 {
        match self {
            StressLevel::Low => 1,
            StressLevel::Medium => 2,
            StressLevel::High => 3,
        }
    }

    /// Level implied by a count of raised indicators.
    pub fn from_indicator_count(count: usize) -> Self {
        match count {
            0 => StressLevel::Low,
            1 | 2 => StressLevel::Medium,
            _ => StressLevel::High,
        }
    }
}

impl fmt::Display for StressLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Evidence flags raised by individual signal sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressIndicator {
    VeryFastTyping,
    ExcessiveCorrections,
    HighTypingStress,
    PoorPosture,
}

/// Direction of recent stress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StressTrend {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

/// One recorded evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressEvent {
    pub timestamp: DateTime<Utc>,
    pub level: StressLevel,
    pub indicators: Vec<StressIndicator>,
}

/// Collect the indicators raised by the current evidence.
pub fn indicators(typing: &TypingMetrics, posture_score: Option<u8>) -> Vec<StressIndicator> {
    let mut raised = Vec::with_capacity(4);
    if typing.typing_speed > HIGH_SPEED_KPM {
        raised.push(StressIndicator::VeryFastTyping);
    }
    if typing.backspace_ratio > HIGH_BACKSPACE_RATIO {
        raised.push(StressIndicator::ExcessiveCorrections);
    }
    if typing.stress_level == StressLevel::High {
        raised.push(StressIndicator::HighTypingStress);
    }
    if posture_score.is_some_and(|score| score < POOR_POSTURE_SCORE) {
        raised.push(StressIndicator::PoorPosture);
    }
    raised
}

/// Fuses typing and posture evidence into one stress judgment.
#[derive(Debug, Clone, Default)]
pub struct StressAggregator {
    events: VecDeque<StressEvent>,
    current: StressLevel,
}

impl StressAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate the evidence now and record the result.
    pub fn evaluate(&mut self, typing: &TypingMetrics, posture_score: Option<u8>) -> StressLevel {
        self.evaluate_at(typing, posture_score, Utc::now())
    }

    pub fn evaluate_at(
        &mut self,
        typing: &TypingMetrics,
        posture_score: Option<u8>,
        now: DateTime<Utc>,
    ) -> StressLevel {
        let raised = indicators(typing, posture_score);
        self.record(StressEvent {
            timestamp: now,
            level: StressLevel::from_indicator_count(raised.len()),
            indicators: raised,
        })
    }

    /// Append an event, evicting the oldest beyond the history bound.
    pub fn record(&mut self, event: StressEvent) -> StressLevel {
        let level = event.level;
        if level != self.current {
            tracing::debug!(from = %self.current, to = %level, "Stress level changed");
        }
        self.events.push_back(event);
        while self.events.len() > STRESS_HISTORY_LEN {
            self.events.pop_front();
        }
        self.current = level;
        level
    }

    /// Compare the first three of the last five levels with the last three.
    ///
    /// The two halves share the middle event.
    pub fn trend(&self) -> StressTrend {
        if self.events.len() < TREND_SPAN {
            return StressTrend::Stable;
        }
        let recent: Vec<f64> = self
            .events
            .iter()
            .skip(self.events.len() - TREND_SPAN)
            .map(|e| f64::from(e.level.ordinal()))
            .collect();

        let first = recent[..3].iter().sum::<f64>() / 3.0;
        let second = recent[2..].iter().sum::<f64>() / 3.0;

        if second > first + 0.5 {
            StressTrend::Increasing
        } else if second < first - 0.5 {
            StressTrend::Decreasing
        } else {
            StressTrend::Stable
        }
    }

    pub fn recommendation(&self) -> &'static str {
        recommendation(self.current, self.trend())
    }

    pub fn current_level(&self) -> StressLevel {
        self.current
    }

    pub fn history(&self) -> impl Iterator<Item = &StressEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn reset(&mut self) {
        self.events.clear();
        self.current = StressLevel::Low;
    }
}

/// Advice for a level and trend.
pub fn recommendation(level: StressLevel, trend: StressTrend) -> &'static str {
    match (level, trend) {
        (StressLevel::High, StressTrend::Increasing) => {
            "High stress detected and increasing. Take a break NOW!"
        }
        (StressLevel::High, _) => "High stress detected. Step away for 5 minutes.",
        (StressLevel::Medium, StressTrend::Increasing) => {
            "Stress is building up. Take deep breaths."
        }
        (StressLevel::Medium, _) => "Moderate stress. Consider a short break soon.",
        (StressLevel::Low, _) => "Stress levels are healthy. Keep up the good work!",
    }
}
