//! Core functionality for the DevCare agent.
//!
//! This module contains:
//! - Landmark frames and posture scoring against a calibrated baseline
//! - Trailing windows and typing stress analysis
//! - Break scheduling
//! - Stress fusion and the published state snapshot

pub mod breaks;
pub mod curves;
pub mod landmarks;
pub mod posture;
pub mod state;
pub mod stress;
pub mod typing;
pub mod windowing;

// Re-export commonly used types
pub use breaks::{BreakRecord, BreakScheduler, BreakStatistics, BreakStatus};
pub use landmarks::{Keypoint, Landmark, LandmarkFrame};
pub use posture::{PostureConfig, PostureOutcome, PostureScoreEngine, PostureStatus};
pub use state::{Insights, StateSnapshot, StateStore};
pub use stress::{StressAggregator, StressEvent, StressLevel, StressTrend};
pub use typing::{TypingMetrics, TypingStressEngine};
pub use windowing::TrailingWindow;
