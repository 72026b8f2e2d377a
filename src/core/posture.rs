//! Calibration-relative posture scoring.
//!
//! Every metric is a ratio over shoulder width, so the score does not depend
//! on how far the subject sits from the camera. The first frames of a
//! session are used to learn the subject's own upright baseline; later
//! frames are scored by how far they fall short of it.

use crate::core::curves::{HEAD, NECK, SYMMETRY, TORSO, VISIBILITY, WEIGHTS};
use crate::core::landmarks::{Landmark, LandmarkFrame};
use crate::error::FrameError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median};
use std::collections::VecDeque;

/// Frames collected before the baseline is frozen.
pub const CALIBRATION_FRAMES: usize = 90;

/// Number of recent scores averaged into the reported score.
pub const SMOOTHING_WINDOW: usize = 5;

/// Shoulder widths below this (normalized units) are not trusted.
pub const MIN_SHOULDER_WIDTH: f64 = 0.05;

/// Placeholder score reported while calibrating.
pub const CALIBRATING_SCORE: u8 = 85;

/// Score reported for a frame whose metrics could not be computed.
pub const FALLBACK_SCORE: u8 = 50;

/// Seconds without a scored frame before the posture signal is stale.
pub const STALE_AFTER_SECS: i64 = 5;

/// Posture engine tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct PostureConfig {
    pub calibration_frames: usize,
    pub smoothing_window: usize,
    pub stale_after: Duration,
}

impl Default for PostureConfig {
    fn default() -> Self {
        Self {
            calibration_frames: CALIBRATION_FRAMES,
            smoothing_window: SMOOTHING_WINDOW,
            stale_after: Duration::seconds(STALE_AFTER_SECS),
        }
    }
}

/// Distance-invariant proportions extracted from one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PostureMetrics {
    pub shoulder_width: f64,
    /// Vertical shoulder-hip distance over shoulder width
    pub shoulder_hip_ratio: f64,
    /// Vertical ear-shoulder distance over shoulder width
    pub head_shoulder_ratio: f64,
    /// Horizontal ear-shoulder offset over shoulder width
    pub head_forward_ratio: f64,
    /// Left/right shoulder height difference over shoulder width
    pub shoulder_tilt_ratio: f64,
    /// Mean visibility of nose and both ears
    pub face_visibility: f64,
}

impl PostureMetrics {
    pub fn from_frame(frame: &LandmarkFrame) -> Result<Self, FrameError> {
        let nose = frame.require(Landmark::Nose)?;
        let left_ear = frame.require(Landmark::LeftEar)?;
        let right_ear = frame.require(Landmark::RightEar)?;
        let left_shoulder = frame.require(Landmark::LeftShoulder)?;
        let right_shoulder = frame.require(Landmark::RightShoulder)?;
        let left_hip = frame.require(Landmark::LeftHip)?;
        let right_hip = frame.require(Landmark::RightHip)?;

        let shoulder_width = ((left_shoulder.x - right_shoulder.x).powi(2)
            + (left_shoulder.y - right_shoulder.y).powi(2))
        .sqrt();
        if shoulder_width < MIN_SHOULDER_WIDTH {
            return Err(FrameError::DegenerateShoulders {
                width: shoulder_width,
            });
        }

        let shoulder_x = (left_shoulder.x + right_shoulder.x) / 2.0;
        let shoulder_y = (left_shoulder.y + right_shoulder.y) / 2.0;
        let hip_y = (left_hip.y + right_hip.y) / 2.0;
        let ear_x = (left_ear.x + right_ear.x) / 2.0;
        let ear_y = (left_ear.y + right_ear.y) / 2.0;

        Ok(Self {
            shoulder_width,
            shoulder_hip_ratio: (hip_y - shoulder_y).abs() / shoulder_width,
            head_shoulder_ratio: (shoulder_y - ear_y).abs() / shoulder_width,
            head_forward_ratio: (ear_x - shoulder_x).abs() / shoulder_width,
            shoulder_tilt_ratio: (left_shoulder.y - right_shoulder.y).abs() / shoulder_width,
            face_visibility: (nose.visibility + left_ear.visibility + right_ear.visibility) / 3.0,
        })
    }
}

/// The subject's calibrated upright proportions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub shoulder_hip: f64,
    pub head_shoulder: f64,
}

impl Baseline {
    /// Fractional shortfall of the live metrics against the baseline
    /// (positive means worse). A zero baseline yields no deviation.
    fn deviations(&self, metrics: &PostureMetrics) -> (f64, f64) {
        (
            deviation(self.shoulder_hip, metrics.shoulder_hip_ratio),
            deviation(self.head_shoulder, metrics.head_shoulder_ratio),
        )
    }
}

fn deviation(baseline: f64, current: f64) -> f64 {
    if baseline.abs() < f64::EPSILON {
        return 0.0;
    }
    (baseline - current) / baseline
}

/// Calibration state machine.
///
/// `Collecting` moves to `Complete` once the configured number of samples
/// has been seen; only [`PostureScoreEngine::reset_calibration`] moves back.
#[derive(Debug, Clone, PartialEq)]
pub enum Calibration {
    Collecting {
        shoulder_hip: Vec<f64>,
        head_shoulder: Vec<f64>,
    },
    Complete(Baseline),
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration::Collecting {
            shoulder_hip: Vec::new(),
            head_shoulder: Vec::new(),
        }
    }
}

impl Calibration {
    pub fn is_complete(&self) -> bool {
        matches!(self, Calibration::Complete(_))
    }

    pub fn baseline(&self) -> Option<Baseline> {
        match self {
            Calibration::Complete(baseline) => Some(*baseline),
            Calibration::Collecting { .. } => None,
        }
    }

    /// Samples gathered so far in the current cycle.
    pub fn collected(&self) -> usize {
        match self {
            Calibration::Collecting { shoulder_hip, .. } => shoulder_hip.len(),
            Calibration::Complete(_) => 0,
        }
    }

    /// Record one sample. Returns the frozen baseline if this sample
    /// completed calibration.
    fn observe(&mut self, metrics: &PostureMetrics, required: usize) -> Option<Baseline> {
        let Calibration::Collecting {
            shoulder_hip,
            head_shoulder,
        } = self
        else {
            return None;
        };

        shoulder_hip.push(metrics.shoulder_hip_ratio);
        head_shoulder.push(metrics.head_shoulder_ratio);
        if shoulder_hip.len() < required {
            return None;
        }

        let baseline = Baseline {
            shoulder_hip: median(shoulder_hip),
            head_shoulder: median(head_shoulder),
        };
        *self = Calibration::Complete(baseline);
        Some(baseline)
    }
}

fn median(samples: &[f64]) -> f64 {
    Data::new(samples.to_vec()).median()
}

/// Bounded FIFO of recent scores.
#[derive(Debug, Clone)]
pub struct ScoreHistory {
    scores: VecDeque<u8>,
    capacity: usize,
}

impl ScoreHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            scores: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a score and return the integer mean of the window.
    pub fn push(&mut self, score: u8) -> u8 {
        self.scores.push_back(score);
        while self.scores.len() > self.capacity {
            self.scores.pop_front();
        }
        self.mean()
    }

    pub fn mean(&self) -> u8 {
        if self.scores.is_empty() {
            return 0;
        }
        let total: u32 = self.scores.iter().map(|&s| u32::from(s)).sum();
        (total / self.scores.len() as u32) as u8
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn clear(&mut self) {
        self.scores.clear();
    }
}

/// Result of feeding one frame to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostureOutcome {
    /// Sample recorded toward the baseline
    Calibrating { collected: usize, required: usize },
    /// Frame scored against the baseline
    Scored { raw: u8, smoothed: u8 },
    /// Shoulders too close together to trust the frame
    Rejected,
    /// Metrics could not be computed for this frame
    Fallback,
}

impl PostureOutcome {
    /// The score this frame reports.
    pub fn score(&self) -> u8 {
        match self {
            PostureOutcome::Calibrating { .. } => CALIBRATING_SCORE,
            PostureOutcome::Scored { smoothed, .. } => *smoothed,
            PostureOutcome::Rejected => 0,
            PostureOutcome::Fallback => FALLBACK_SCORE,
        }
    }
}

/// Human-readable posture band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostureStatus {
    pub score: u8,
    pub status: String,
    pub color: String,
    pub calibrated: bool,
    pub person_detected: bool,
    pub calibration_collected: usize,
    pub calibration_required: usize,
}

/// Converts landmark frames into a smoothed 0-100 posture score.
#[derive(Debug, Clone)]
pub struct PostureScoreEngine {
    config: PostureConfig,
    calibration: Calibration,
    history: ScoreHistory,
    current_score: u8,
    last_frame_at: Option<DateTime<Utc>>,
}

impl Default for PostureScoreEngine {
    fn default() -> Self {
        Self::new(PostureConfig::default())
    }
}

impl PostureScoreEngine {
    pub fn new(config: PostureConfig) -> Self {
        let config = PostureConfig {
            calibration_frames: config.calibration_frames.max(1),
            ..config
        };
        Self {
            history: ScoreHistory::new(config.smoothing_window),
            config,
            calibration: Calibration::default(),
            current_score: 0,
            last_frame_at: None,
        }
    }

    /// Score a frame captured now.
    pub fn score(&mut self, frame: &LandmarkFrame) -> PostureOutcome {
        self.score_at(frame, Utc::now())
    }

    /// Score a frame captured at `now`.
    pub fn score_at(&mut self, frame: &LandmarkFrame, now: DateTime<Utc>) -> PostureOutcome {
        let metrics = match PostureMetrics::from_frame(frame) {
            Ok(metrics) => metrics,
            Err(FrameError::DegenerateShoulders { width }) => {
                tracing::debug!(width, "Frame rejected: shoulders too narrow");
                return PostureOutcome::Rejected;
            }
            Err(e) => {
                tracing::debug!("Frame scoring failed: {}", e);
                return PostureOutcome::Fallback;
            }
        };

        let required = self.config.calibration_frames;
        let outcome = match self.calibration.baseline() {
            Some(baseline) => {
                let raw = final_score(&baseline, &metrics);
                let smoothed = self.history.push(raw);
                self.current_score = smoothed;
                PostureOutcome::Scored { raw, smoothed }
            }
            None => {
                let collected = self.calibration.collected() + 1;
                if let Some(baseline) = self.calibration.observe(&metrics, required) {
                    // Calibration placeholders must not leak into live scores.
                    self.history.clear();
                    tracing::info!(
                        shoulder_hip = baseline.shoulder_hip,
                        head_shoulder = baseline.head_shoulder,
                        "Posture calibration complete"
                    );
                }
                PostureOutcome::Calibrating {
                    collected,
                    required,
                }
            }
        };

        self.last_frame_at = Some(now);
        outcome
    }

    /// Discard the baseline and smoothing history and start collecting again.
    pub fn reset_calibration(&mut self) {
        self.calibration = Calibration::default();
        self.history.clear();
        self.current_score = 0;
        tracing::info!("Posture calibration reset");
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_complete()
    }

    /// Latest smoothed score, without any staleness handling.
    pub fn current_score(&self) -> u8 {
        self.current_score
    }

    pub fn last_frame_at(&self) -> Option<DateTime<Utc>> {
        self.last_frame_at
    }

    pub fn history(&self) -> &ScoreHistory {
        &self.history
    }

    /// Score as it should be shown to readers at `now`: zero while
    /// calibrating or when no frame arrived within the stale window.
    pub fn published_score_at(&self, now: DateTime<Utc>) -> u8 {
        if !self.calibration.is_complete() {
            return 0;
        }
        match self.last_frame_at {
            Some(at) if now - at <= self.config.stale_after => self.current_score,
            _ => 0,
        }
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> PostureStatus {
        let score = self.published_score_at(now);
        let calibrated = self.calibration.is_complete();
        let (status, color) = if !calibrated {
            ("Calibrating...", "yellow")
        } else if score == 0 {
            ("No person detected", "gray")
        } else if score >= 80 {
            ("Excellent posture", "green")
        } else if score >= 60 {
            ("Good posture", "yellow")
        } else if score >= 40 {
            ("Poor posture", "orange")
        } else {
            ("Bad posture", "red")
        };

        PostureStatus {
            score,
            status: status.to_string(),
            color: color.to_string(),
            calibrated,
            person_detected: score > 0 || !calibrated,
            calibration_collected: self.calibration.collected(),
            calibration_required: self.config.calibration_frames,
        }
    }
}

/// Weighted blend of all sub-scores, truncated to an integer.
fn final_score(baseline: &Baseline, metrics: &PostureMetrics) -> u8 {
    let (torso_dev, head_dev) = baseline.deviations(metrics);

    let blended = TORSO.score(torso_dev) * WEIGHTS.torso
        + HEAD.score(head_dev) * WEIGHTS.head
        + NECK.score(metrics.head_forward_ratio) * WEIGHTS.neck
        + VISIBILITY.score(metrics.face_visibility) * WEIGHTS.visibility
        + SYMMETRY.score(metrics.shoulder_tilt_ratio) * WEIGHTS.symmetry;

    // Absorb float error before truncation so 99.999999... stays 100.
    let settled = (blended * 1e6).round() / 1e6;
    settled.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::landmarks::Keypoint;

    /// Upright frame: shoulder width 0.2, shoulder-hip ratio 2.0,
    /// head-shoulder ratio 1.0, no forward lean, level shoulders.
    fn upright() -> LandmarkFrame {
        frame_with(0.9, 0.3, 0.5, 1.0)
    }

    fn frame_with(hip_y: f64, ear_y: f64, ear_x: f64, visibility: f64) -> LandmarkFrame {
        LandmarkFrame::new()
            .with(Landmark::Nose, Keypoint::new(ear_x, ear_y + 0.02, visibility))
            .with(Landmark::LeftEar, Keypoint::new(ear_x - 0.05, ear_y, visibility))
            .with(Landmark::RightEar, Keypoint::new(ear_x + 0.05, ear_y, visibility))
            .with(Landmark::LeftShoulder, Keypoint::new(0.4, 0.5, 1.0))
            .with(Landmark::RightShoulder, Keypoint::new(0.6, 0.5, 1.0))
            .with(Landmark::LeftHip, Keypoint::new(0.42, hip_y, 1.0))
            .with(Landmark::RightHip, Keypoint::new(0.58, hip_y, 1.0))
    }

    fn calibrated_engine() -> PostureScoreEngine {
        let mut engine = PostureScoreEngine::default();
        let now = Utc::now();
        for _ in 0..CALIBRATION_FRAMES {
            engine.score_at(&upright(), now);
        }
        engine
    }

    #[test]
    fn test_metrics_are_distance_invariant() {
        let near = PostureMetrics::from_frame(&upright()).unwrap();

        // Same pose at half the size, shifted.
        let far = LandmarkFrame::new()
            .with(Landmark::Nose, Keypoint::new(0.5, 0.51, 1.0))
            .with(Landmark::LeftEar, Keypoint::new(0.475, 0.5, 1.0))
            .with(Landmark::RightEar, Keypoint::new(0.525, 0.5, 1.0))
            .with(Landmark::LeftShoulder, Keypoint::new(0.45, 0.6, 1.0))
            .with(Landmark::RightShoulder, Keypoint::new(0.55, 0.6, 1.0))
            .with(Landmark::LeftHip, Keypoint::new(0.46, 0.8, 1.0))
            .with(Landmark::RightHip, Keypoint::new(0.54, 0.8, 1.0));
        let far = PostureMetrics::from_frame(&far).unwrap();

        assert!((near.shoulder_hip_ratio - far.shoulder_hip_ratio).abs() < 1e-9);
        assert!((near.head_shoulder_ratio - far.head_shoulder_ratio).abs() < 1e-9);
    }

    #[test]
    fn test_calibrating_returns_neutral_score() {
        let mut engine = PostureScoreEngine::default();
        let outcome = engine.score_at(&upright(), Utc::now());

        assert_eq!(
            outcome,
            PostureOutcome::Calibrating {
                collected: 1,
                required: CALIBRATION_FRAMES
            }
        );
        assert_eq!(outcome.score(), CALIBRATING_SCORE);
        assert!(!engine.is_calibrated());
    }

    #[test]
    fn test_calibration_completes_with_median_baseline() {
        let mut engine = PostureScoreEngine::default();
        let now = Utc::now();

        // Hip heights spread so the median is well defined.
        for i in 0..CALIBRATION_FRAMES {
            let hip_y = 0.8 + (i as f64) * 0.002;
            engine.score_at(&frame_with(hip_y, 0.3, 0.5, 1.0), now);
        }

        let baseline = engine.calibration().baseline().expect("calibrated");
        let samples: Vec<f64> = (0..CALIBRATION_FRAMES)
            .map(|i| (0.3 + (i as f64) * 0.002) / 0.2)
            .collect();
        let expected = (samples[44] + samples[45]) / 2.0;
        assert!((baseline.shoulder_hip - expected).abs() < 1e-9);
        assert!((baseline.head_shoulder - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_baseline_frozen_after_calibration() {
        let mut engine = calibrated_engine();
        let before = engine.calibration().baseline();

        for _ in 0..200 {
            engine.score_at(&frame_with(0.7, 0.45, 0.5, 1.0), Utc::now());
        }

        assert_eq!(engine.calibration().baseline(), before);
    }

    #[test]
    fn test_upright_frame_scores_full_marks() {
        let mut engine = calibrated_engine();
        let outcome = engine.score_at(&upright(), Utc::now());

        assert_eq!(
            outcome,
            PostureOutcome::Scored {
                raw: 100,
                smoothed: 100
            }
        );
    }

    #[test]
    fn test_slouch_lowers_score() {
        let mut engine = calibrated_engine();
        // Torso compressed by 25%, head dropped by 30%.
        let outcome = engine.score_at(&frame_with(0.8, 0.36, 0.5, 1.0), Utc::now());

        match outcome {
            PostureOutcome::Scored { raw, .. } => {
                // torso 35, head 10, neck 100, visibility 100, symmetry 100
                assert_eq!(raw, 54);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_smoothing_window_mean() {
        let mut engine = calibrated_engine();
        let now = Utc::now();

        engine.score_at(&upright(), now);
        let outcome = engine.score_at(&frame_with(0.8, 0.36, 0.5, 1.0), now);
        assert_eq!(outcome.score(), (100 + 54) / 2);

        for _ in 0..10 {
            engine.score_at(&upright(), now);
        }
        assert_eq!(engine.history().len(), SMOOTHING_WINDOW);
        assert_eq!(engine.current_score(), 100);
    }

    #[test]
    fn test_degenerate_shoulders_rejected_without_side_effects() {
        let mut engine = PostureScoreEngine::default();
        let frame = upright()
            .with(Landmark::LeftShoulder, Keypoint::new(0.5, 0.5, 1.0))
            .with(Landmark::RightShoulder, Keypoint::new(0.52, 0.5, 1.0));

        let outcome = engine.score_at(&frame, Utc::now());
        assert_eq!(outcome, PostureOutcome::Rejected);
        assert_eq!(outcome.score(), 0);
        assert_eq!(engine.calibration().collected(), 0);
        assert!(engine.last_frame_at().is_none());
    }

    #[test]
    fn test_missing_landmark_falls_back() {
        let mut engine = calibrated_engine();
        engine.score_at(&upright(), Utc::now());
        let history_len = engine.history().len();

        let mut partial = LandmarkFrame::new();
        partial.insert(Landmark::Nose, Keypoint::new(0.5, 0.3, 1.0));
        let outcome = engine.score_at(&partial, Utc::now());

        assert_eq!(outcome, PostureOutcome::Fallback);
        assert_eq!(outcome.score(), FALLBACK_SCORE);
        assert_eq!(engine.history().len(), history_len);
        assert!(engine.is_calibrated());
    }

    #[test]
    fn test_zero_baseline_is_neutral() {
        let baseline = Baseline {
            shoulder_hip: 0.0,
            head_shoulder: 0.0,
        };
        let metrics = PostureMetrics::from_frame(&upright()).unwrap();
        assert_eq!(baseline.deviations(&metrics), (0.0, 0.0));
    }

    #[test]
    fn test_published_score_overrides() {
        let mut engine = PostureScoreEngine::default();
        let t0 = Utc::now();

        engine.score_at(&upright(), t0);
        assert_eq!(engine.published_score_at(t0), 0, "calibrating reads as 0");

        for _ in 1..CALIBRATION_FRAMES {
            engine.score_at(&upright(), t0);
        }
        engine.score_at(&upright(), t0);
        assert_eq!(engine.published_score_at(t0 + Duration::seconds(4)), 100);
        assert_eq!(engine.published_score_at(t0 + Duration::seconds(6)), 0);
        // The stale read does not touch history.
        assert_eq!(engine.current_score(), 100);
    }

    #[test]
    fn test_reset_calibration() {
        let mut engine = calibrated_engine();
        engine.score_at(&upright(), Utc::now());

        engine.reset_calibration();

        assert!(!engine.is_calibrated());
        assert!(engine.history().is_empty());
        assert_eq!(engine.calibration().collected(), 0);
    }

    #[test]
    fn test_status_bands() {
        let mut engine = PostureScoreEngine::default();
        let now = Utc::now();
        assert_eq!(engine.status_at(now).status, "Calibrating...");
        assert!(engine.status_at(now).person_detected);

        for _ in 0..=CALIBRATION_FRAMES {
            engine.score_at(&upright(), now);
        }
        let status = engine.status_at(now);
        assert_eq!(status.status, "Excellent posture");
        assert_eq!(status.color, "green");

        let later = engine.status_at(now + Duration::seconds(30));
        assert_eq!(later.status, "No person detected");
        assert!(!later.person_detected);
    }

    #[test]
    fn test_score_history_bounds() {
        let mut history = ScoreHistory::new(5);
        assert_eq!(history.mean(), 0);
        for s in [10, 20, 30, 40, 50, 60, 70] {
            history.push(s);
            assert!(history.len() <= 5);
        }
        assert_eq!(history.mean(), 50);
        assert_eq!(history.push(1), (40 + 50 + 60 + 70 + 1) / 5);
    }
}
