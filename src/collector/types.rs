//! Privacy-preserving key press events.
//!
//! A key press carries its time and whether it was a backspace. Nothing
//! else about the key is ever captured.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// macOS virtual key code for Delete (backspace).
pub const BACKSPACE_KEYCODE: i64 = 51;

/// One key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPressEvent {
    /// When the key went down
    pub timestamp: DateTime<Utc>,
    /// Whether the key was a backspace
    pub is_backspace: bool,
}

impl KeyPressEvent {
    pub fn new(is_backspace: bool) -> Self {
        Self::at(is_backspace, Utc::now())
    }

    pub fn at(is_backspace: bool, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            is_backspace,
        }
    }

    /// Build an event from a raw platform key code, keeping only the
    /// backspace flag.
    pub fn from_keycode(keycode: i64) -> Self {
        Self::new(keycode == BACKSPACE_KEYCODE)
    }
}

/// Configuration for key capture.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub capture_keyboard: bool,
    /// Capacity of the event channel; events are dropped when it is full
    pub channel_capacity: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            capture_keyboard: true,
            channel_capacity: 10_000,
        }
    }
}
