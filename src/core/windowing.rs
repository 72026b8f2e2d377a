//! Trailing time windows over event timestamps.
//!
//! A window keeps only timestamps newer than `now - duration`; older ones
//! are purged whenever the window is observed or read.

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// Default trailing window for typing activity.
pub const DEFAULT_WINDOW_SECS: i64 = 60;

/// A time-ordered sequence of timestamps pruned to a trailing duration.
#[derive(Debug, Clone)]
pub struct TrailingWindow {
    duration: Duration,
    timestamps: VecDeque<DateTime<Utc>>,
}

impl Default for TrailingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SECS as u64)
    }
}

impl TrailingWindow {
    /// Create a window spanning the given number of seconds.
    pub fn new(duration_secs: u64) -> Self {
        Self {
            duration: Duration::seconds(duration_secs as i64),
            timestamps: VecDeque::new(),
        }
    }

    /// Record a timestamp and purge anything that fell out of the window.
    ///
    /// Out-of-order timestamps are inserted in position so the sequence stays
    /// sorted; the keyboard source makes no ordering promise.
    pub fn record(&mut self, timestamp: DateTime<Utc>) {
        match self.timestamps.back() {
            Some(&last) if timestamp < last => {
                let idx = self.timestamps.partition_point(|&t| t <= timestamp);
                self.timestamps.insert(idx, timestamp);
            }
            _ => self.timestamps.push_back(timestamp),
        }
        let newest = self.timestamps.back().copied().unwrap_or(timestamp);
        self.prune(newest);
    }

    /// Drop every timestamp at or before `now - duration`.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.duration;
        while let Some(&front) = self.timestamps.front() {
            if front > cutoff {
                break;
            }
            self.timestamps.pop_front();
        }
    }

    /// Number of timestamps inside the window ending at `now`.
    ///
    /// Timestamps after `now` are kept but not counted.
    pub fn count_at(&mut self, now: DateTime<Utc>) -> usize {
        self.prune(now);
        self.timestamps
            .iter()
            .filter(|&&t| self.contains(t, now))
            .count()
    }

    /// Check if a timestamp would fall inside the window ending at `now`.
    pub fn contains(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        timestamp > now - self.duration && timestamp <= now
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration.num_milliseconds() as f64 / 1000.0
    }

    pub fn clear(&mut self) {
        self.timestamps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_contains() {
        let now = Utc::now();
        let window = TrailingWindow::new(60);

        assert!(window.contains(now, now));
        assert!(window.contains(now - Duration::seconds(59), now));
        assert!(!window.contains(now - Duration::seconds(60), now));
        assert!(!window.contains(now + Duration::seconds(1), now));
    }

    #[test]
    fn test_prune_on_read() {
        let start = Utc::now();
        let mut window = TrailingWindow::new(60);

        for i in 0..6 {
            window.record(start + Duration::seconds(i * 10));
        }
        assert_eq!(window.len(), 6);

        // At start+75s the cutoff is start+15s (exclusive).
        assert_eq!(window.count_at(start + Duration::seconds(75)), 4);
        assert_eq!(window.len(), 4);
    }

    #[test]
    fn test_record_prunes_old_entries() {
        let start = Utc::now();
        let mut window = TrailingWindow::new(60);

        window.record(start);
        window.record(start + Duration::seconds(61));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_count_skips_future_timestamps() {
        let start = Utc::now();
        let mut window = TrailingWindow::new(60);

        window.record(start + Duration::minutes(10));
        window.record(start + Duration::minutes(10) + Duration::seconds(1));

        assert_eq!(window.count_at(start + Duration::seconds(10)), 0);
        assert_eq!(window.len(), 2);
        assert_eq!(window.count_at(start + Duration::minutes(10)), 1);
    }

    #[test]
    fn test_out_of_order_record_stays_sorted() {
        let start = Utc::now();
        let mut window = TrailingWindow::new(60);

        window.record(start + Duration::seconds(10));
        window.record(start + Duration::seconds(5));
        window.record(start + Duration::seconds(20));

        assert_eq!(window.count_at(start + Duration::seconds(66)), 2);
    }
}
