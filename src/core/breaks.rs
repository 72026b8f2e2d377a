//! Session timing and break suggestions.
//!
//! All durations are derived from the wall clock at read time; nothing
//! needs to tick for them to stay current.

use crate::error::ControlError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Default minutes between suggested breaks.
pub const DEFAULT_BREAK_INTERVAL_MINUTES: i64 = 45;

/// A break the user reported taking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakRecord {
    pub timestamp: DateTime<Utc>,
    /// Whole minutes worked since the session started
    pub minutes_worked_before_break: i64,
    /// Minutes since the previous break (or session start)
    pub duration_since_previous_break_minutes: f64,
}

/// Aggregates over the break history, in minutes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakStatistics {
    pub total_breaks: usize,
    pub average_interval: f64,
    pub longest_session: f64,
    pub shortest_session: f64,
}

/// Point-in-time break status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakStatus {
    pub time_working: i64,
    pub time_since_break: i64,
    pub breaks_taken: u32,
    pub should_break: bool,
    pub suggestion: String,
}

/// Tracks work/break time and decides when to suggest a break.
#[derive(Debug, Clone)]
pub struct BreakScheduler {
    session_start: DateTime<Utc>,
    last_break: DateTime<Utc>,
    breaks_taken: u32,
    interval_minutes: i64,
    history: Vec<BreakRecord>,
}

impl Default for BreakScheduler {
    fn default() -> Self {
        Self::starting_at(Utc::now())
    }
}

impl BreakScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheduler whose session began at `now`.
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            session_start: now,
            last_break: now,
            breaks_taken: 0,
            interval_minutes: DEFAULT_BREAK_INTERVAL_MINUTES,
            history: Vec::new(),
        }
    }

    pub fn with_interval(mut self, minutes: i64) -> Result<Self, ControlError> {
        self.set_interval(minutes)?;
        Ok(self)
    }

    pub fn time_working_at(&self, now: DateTime<Utc>) -> i64 {
        (now - self.session_start).num_minutes().max(0)
    }

    pub fn time_since_break_at(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_break).num_minutes().max(0)
    }

    pub fn should_suggest_break_at(&self, now: DateTime<Utc>) -> bool {
        self.time_since_break_at(now) >= self.interval_minutes
    }

    /// Record a break at `now` and restart the since-break clock.
    pub fn take_break_at(&mut self, now: DateTime<Utc>) -> BreakRecord {
        let since_previous = (now - self.last_break).num_milliseconds().max(0) as f64 / 60_000.0;
        let record = BreakRecord {
            timestamp: now,
            minutes_worked_before_break: self.time_working_at(now),
            duration_since_previous_break_minutes: since_previous,
        };
        self.history.push(record.clone());
        self.last_break = now;
        self.breaks_taken += 1;
        tracing::info!(
            breaks_taken = self.breaks_taken,
            minutes_since_previous = since_previous,
            "Break recorded"
        );
        record
    }

    pub fn take_break(&mut self) -> BreakRecord {
        self.take_break_at(Utc::now())
    }

    pub fn suggestion_at(&self, now: DateTime<Utc>) -> &'static str {
        suggestion(self.time_since_break_at(now))
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> BreakStatus {
        BreakStatus {
            time_working: self.time_working_at(now),
            time_since_break: self.time_since_break_at(now),
            breaks_taken: self.breaks_taken,
            should_break: self.should_suggest_break_at(now),
            suggestion: self.suggestion_at(now).to_string(),
        }
    }

    /// Display string for the time worked, e.g. "12 min" or "1h 5m".
    pub fn formatted_time_at(&self, now: DateTime<Utc>) -> String {
        format_minutes(self.time_working_at(now))
    }

    /// Statistics over the break history; all zero when empty.
    pub fn statistics(&self) -> BreakStatistics {
        if self.history.is_empty() {
            return BreakStatistics::default();
        }

        let intervals: Vec<f64> = self
            .history
            .iter()
            .map(|b| b.duration_since_previous_break_minutes)
            .collect();

        BreakStatistics {
            total_breaks: intervals.len(),
            average_interval: round1(Statistics::mean(&intervals)),
            longest_session: round1(Statistics::max(&intervals)),
            shortest_session: round1(Statistics::min(&intervals)),
        }
    }

    /// Change the suggestion interval. Non-positive values are rejected
    /// without touching the scheduler.
    pub fn set_interval(&mut self, minutes: i64) -> Result<(), ControlError> {
        if minutes <= 0 {
            return Err(ControlError::InvalidBreakInterval(minutes));
        }
        self.interval_minutes = minutes;
        tracing::info!(minutes, "Break interval updated");
        Ok(())
    }

    pub fn interval_minutes(&self) -> i64 {
        self.interval_minutes
    }

    pub fn breaks_taken(&self) -> u32 {
        self.breaks_taken
    }

    pub fn history(&self) -> &[BreakRecord] {
        &self.history
    }

    /// Clear counters and history and restart the session at `now`.
    ///
    /// The configured interval is kept.
    pub fn reset_at(&mut self, now: DateTime<Utc>) {
        self.session_start = now;
        self.last_break = now;
        self.breaks_taken = 0;
        self.history.clear();
        tracing::info!("Break statistics reset");
    }

    pub fn reset(&mut self) {
        self.reset_at(Utc::now());
    }
}

/// Suggestion text for the minutes since the last break.
pub fn suggestion(minutes_since_break: i64) -> &'static str {
    match minutes_since_break {
        m if m < 30 => "Keep coding! Break coming soon.",
        m if m < 45 => "Consider a short break soon.",
        m if m < 60 => "Time for a 5-minute break!",
        m if m < 90 => "You've been working a while. Take a 10-minute break.",
        _ => "Long session! Take a 15-minute break and stretch.",
    }
}

pub fn format_minutes(minutes: i64) -> String {
    if minutes < 60 {
        format!("{minutes} min")
    } else {
        format!("{}h {}m", minutes / 60, minutes % 60)
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_should_suggest_break_threshold() {
        let start = Utc::now();
        let scheduler = BreakScheduler::starting_at(start);

        assert!(!scheduler.should_suggest_break_at(start + Duration::minutes(44)));
        assert!(scheduler.should_suggest_break_at(start + Duration::minutes(45)));
        assert!(scheduler.should_suggest_break_at(start + Duration::minutes(46)));
    }

    #[test]
    fn test_take_break_resets_clock() {
        let start = Utc::now();
        let mut scheduler = BreakScheduler::starting_at(start);
        let at = start + Duration::minutes(50);

        let record = scheduler.take_break_at(at);

        assert_eq!(scheduler.breaks_taken(), 1);
        assert_eq!(scheduler.time_since_break_at(at), 0);
        assert!(!scheduler.should_suggest_break_at(at));
        assert_eq!(record.minutes_worked_before_break, 50);
        assert!((record.duration_since_previous_break_minutes - 50.0).abs() < 1e-9);
        assert_eq!(scheduler.time_working_at(at), 50);
    }

    #[test]
    fn test_statistics_empty() {
        let scheduler = BreakScheduler::new();
        assert_eq!(scheduler.statistics(), BreakStatistics::default());
    }

    #[test]
    fn test_statistics() {
        let start = Utc::now();
        let mut scheduler = BreakScheduler::starting_at(start);

        scheduler.take_break_at(start + Duration::minutes(30));
        scheduler.take_break_at(start + Duration::minutes(80));
        scheduler.take_break_at(start + Duration::minutes(120));

        assert_eq!(
            scheduler.statistics(),
            BreakStatistics {
                total_breaks: 3,
                average_interval: 40.0,
                longest_session: 50.0,
                shortest_session: 30.0,
            }
        );
        assert_eq!(scheduler.history().len(), 3);
    }

    #[test]
    fn test_suggestion_thresholds() {
        assert_eq!(suggestion(0), "Keep coding! Break coming soon.");
        assert_eq!(suggestion(29), "Keep coding! Break coming soon.");
        assert_eq!(suggestion(30), "Consider a short break soon.");
        assert_eq!(suggestion(45), "Time for a 5-minute break!");
        assert_eq!(
            suggestion(60),
            "You've been working a while. Take a 10-minute break."
        );
        assert_eq!(
            suggestion(90),
            "Long session! Take a 15-minute break and stretch."
        );
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(0), "0 min");
        assert_eq!(format_minutes(59), "59 min");
        assert_eq!(format_minutes(60), "1h 0m");
        assert_eq!(format_minutes(135), "2h 15m");
    }

    #[test]
    fn test_set_interval_rejects_non_positive() {
        let start = Utc::now();
        let mut scheduler = BreakScheduler::starting_at(start);

        assert_eq!(
            scheduler.set_interval(0),
            Err(ControlError::InvalidBreakInterval(0))
        );
        assert_eq!(
            scheduler.set_interval(-5),
            Err(ControlError::InvalidBreakInterval(-5))
        );
        assert_eq!(scheduler.interval_minutes(), DEFAULT_BREAK_INTERVAL_MINUTES);

        scheduler.set_interval(20).unwrap();
        assert!(scheduler.should_suggest_break_at(start + Duration::minutes(20)));
    }

    #[test]
    fn test_reset() {
        let start = Utc::now();
        let mut scheduler = BreakScheduler::starting_at(start).with_interval(30).unwrap();
        scheduler.take_break_at(start + Duration::minutes(40));

        let later = start + Duration::minutes(100);
        scheduler.reset_at(later);

        assert_eq!(scheduler.breaks_taken(), 0);
        assert!(scheduler.history().is_empty());
        assert_eq!(scheduler.time_working_at(later), 0);
        assert_eq!(scheduler.interval_minutes(), 30);
    }
}
