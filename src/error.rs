//! Error types for the DevCare agent.

use crate::core::landmarks::Landmark;
use thiserror::Error;

/// Reasons a landmark frame cannot be turned into posture metrics.
///
/// These never escape the posture engine: each one is mapped to a
/// [`PostureOutcome`](crate::core::posture::PostureOutcome) for the frame.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("Missing landmark: {0:?}")]
    MissingLandmark(Landmark),

    #[error("Non-finite coordinate on landmark: {0:?}")]
    NonFiniteCoordinate(Landmark),

    #[error("Shoulder width {width:.4} is below the reliability threshold")]
    DegenerateShoulders { width: f64 },
}

/// Errors returned by operator control operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("Break interval must be a positive number of minutes, got {0}")]
    InvalidBreakInterval(i64),
}

/// Errors that can occur during key collection.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Collector is already running")]
    AlreadyRunning,

    #[error("Input Monitoring permission not granted")]
    PermissionDenied,

    #[error("Failed to create CGEvent tap")]
    TapCreationFailed,

    #[error("Failed to create run loop source")]
    RunLoopSourceFailed,
}
