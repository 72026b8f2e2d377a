//! End-to-end tests across the engines and the state store

use chrono::{Duration, Utc};
use devcare_agent::core::breaks::{BreakScheduler, BreakStatistics};
use devcare_agent::core::landmarks::{Keypoint, Landmark, LandmarkFrame};
use devcare_agent::core::posture::{PostureOutcome, PostureScoreEngine, CALIBRATION_FRAMES};
use devcare_agent::core::state::StateStore;
use devcare_agent::core::stress::{StressAggregator, StressLevel};
use devcare_agent::core::typing::{TypingMetrics, TypingStressEngine};
use pretty_assertions::assert_eq;

/// Shoulder width 0.2, hips 0.4 below shoulders, ears 0.2 above them:
/// shoulder-hip ratio 2.0 and head-shoulder ratio 1.0.
fn upright_frame() -> LandmarkFrame {
    LandmarkFrame::new()
        .with(Landmark::Nose, Keypoint::new(0.5, 0.32, 1.0))
        .with(Landmark::LeftEar, Keypoint::new(0.45, 0.3, 1.0))
        .with(Landmark::RightEar, Keypoint::new(0.55, 0.3, 1.0))
        .with(Landmark::LeftShoulder, Keypoint::new(0.4, 0.5, 1.0))
        .with(Landmark::RightShoulder, Keypoint::new(0.6, 0.5, 1.0))
        .with(Landmark::LeftHip, Keypoint::new(0.42, 0.9, 1.0))
        .with(Landmark::RightHip, Keypoint::new(0.58, 0.9, 1.0))
}

#[test]
fn test_calibration_then_upright_frame_scores_100() {
    let mut engine = PostureScoreEngine::default();
    let now = Utc::now();

    for _ in 0..CALIBRATION_FRAMES {
        engine.score_at(&upright_frame(), now);
    }

    assert!(engine.is_calibrated());
    let baseline = engine.calibration().baseline().unwrap();
    assert!((baseline.shoulder_hip - 2.0).abs() < 1e-9);
    assert!((baseline.head_shoulder - 1.0).abs() < 1e-9);

    let outcome = engine.score_at(&upright_frame(), now);
    assert_eq!(outcome.score(), 100);
    assert!(matches!(outcome, PostureOutcome::Scored { raw: 100, .. }));
    assert_eq!(engine.published_score_at(now), 100);
}

#[test]
fn test_fast_typing_is_high_stress() {
    let start = Utc::now();
    let mut engine = TypingStressEngine::starting_at(start);

    for i in 0..500 {
        engine.on_key_at(false, start + Duration::microseconds(i * 120_000));
    }

    let metrics = engine.metrics_at(start + Duration::seconds(60));
    assert!(
        (495..=500).contains(&metrics.typing_speed),
        "speed {}",
        metrics.typing_speed
    );
    assert_eq!(metrics.backspace_ratio, 0.0);
    assert_eq!(metrics.stress_level, StressLevel::High);
}

#[test]
fn test_break_suggestion_threshold() {
    let now = Utc::now();

    let scheduler = BreakScheduler::starting_at(now - Duration::minutes(44));
    assert!(!scheduler.should_suggest_break_at(now));

    let mut scheduler = BreakScheduler::starting_at(now - Duration::minutes(46));
    assert!(scheduler.should_suggest_break_at(now));

    let before = scheduler.breaks_taken();
    scheduler.take_break_at(now);
    assert!(!scheduler.should_suggest_break_at(now));
    assert_eq!(scheduler.breaks_taken(), before + 1);
    assert_eq!(scheduler.time_since_break_at(now), 0);
}

#[test]
fn test_indicator_count_sets_stress_level() {
    let mut aggregator = StressAggregator::new();

    // Fast typing, heavy corrections and a high typing classification.
    let three = TypingMetrics {
        total_keystrokes: 100,
        typing_speed: 450,
        backspace_ratio: 0.4,
        stress_level: StressLevel::High,
        ..TypingMetrics::default()
    };
    assert_eq!(aggregator.evaluate(&three, None), StressLevel::High);

    let one = TypingMetrics {
        total_keystrokes: 100,
        typing_speed: 100,
        backspace_ratio: 0.05,
        ..TypingMetrics::default()
    };
    assert_eq!(aggregator.evaluate(&one, Some(30)), StressLevel::Medium);

    assert_eq!(aggregator.evaluate(&one, Some(90)), StressLevel::Low);
}

#[test]
fn test_empty_break_statistics_are_zero() {
    let scheduler = BreakScheduler::new();
    assert_eq!(scheduler.statistics(), BreakStatistics::default());
    assert_eq!(scheduler.statistics().total_breaks, 0);
    assert_eq!(scheduler.statistics().average_interval, 0.0);
}

#[test]
fn test_publish_combines_all_engines() {
    let start = Utc::now();
    let store = StateStore::new(
        PostureScoreEngine::default(),
        TypingStressEngine::starting_at(start),
        BreakScheduler::starting_at(start),
    );

    {
        let posture = store.posture_engine();
        let mut posture = posture.write().unwrap();
        for _ in 0..=CALIBRATION_FRAMES {
            posture.score_at(&upright_frame(), start + Duration::seconds(60));
        }
    }
    {
        let typing = store.typing_engine();
        let mut typing = typing.lock().unwrap();
        for i in 0..500 {
            typing.on_key_at(false, start + Duration::microseconds(i * 120_000));
        }
    }

    let snapshot = store.publish_at(start + Duration::seconds(62));
    assert_eq!(snapshot.posture, 100);
    assert_eq!(snapshot.status, "Running");
    assert_eq!(snapshot.time, "1 min");
    // The snapshot carries the typing engine's own classification.
    assert_eq!(snapshot.stress, StressLevel::High);
    assert!(snapshot.typing_speed > 400);
    assert!(!snapshot.should_break);

    // Posture goes stale without frames.
    let later = store.publish_at(start + Duration::seconds(120));
    assert_eq!(later.posture, 0);
    assert_eq!(later.status, "Waiting for signal");
}

#[test]
fn test_concurrent_readers_see_complete_snapshots() {
    let store = std::sync::Arc::new(StateStore::default());
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = std::sync::Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..200 {
                    let snapshot = store.snapshot();
                    assert!(!snapshot.status.is_empty());
                    assert!(!snapshot.time.is_empty());
                }
            })
        })
        .collect();

    for _ in 0..200 {
        store.publish();
    }
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(store.snapshot().status, "Waiting for signal");
}
