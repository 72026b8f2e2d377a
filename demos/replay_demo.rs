//! Replay of a synthetic work session through the DevCare engines.
//!
//! This demo shows how to:
//! 1. Calibrate the posture engine on upright frames
//! 2. Feed a gradual slouch and watch the score fall
//! 3. Feed a burst of error-prone typing
//! 4. Publish snapshots and read the insights
//!
//! Run with: cargo run --example replay_demo
//!
//! Time is simulated, so the whole session replays instantly.

use chrono::{Duration, Utc};
use devcare_agent::{
    core::{
        landmarks::{Keypoint, Landmark, LandmarkFrame},
        posture::CALIBRATION_FRAMES,
        BreakScheduler, PostureScoreEngine, StateStore, TypingStressEngine,
    },
    PRIVACY_NOTICE,
};
use std::sync::PoisonError;

/// A seated subject whose hips sit `torso` below the shoulders and whose
/// ears sit `neck` above them, leaning `lean` forward.
fn frame(torso: f64, neck: f64, lean: f64) -> LandmarkFrame {
    let shoulder_y = 0.5;
    let ear_y = shoulder_y - neck;
    LandmarkFrame::new()
        .with(Landmark::Nose, Keypoint::new(0.5 + lean, ear_y + 0.02, 0.95))
        .with(Landmark::LeftEar, Keypoint::new(0.45 + lean, ear_y, 0.9))
        .with(Landmark::RightEar, Keypoint::new(0.55 + lean, ear_y, 0.9))
        .with(Landmark::LeftShoulder, Keypoint::new(0.4, shoulder_y, 1.0))
        .with(Landmark::RightShoulder, Keypoint::new(0.6, shoulder_y, 1.0))
        .with(Landmark::LeftHip, Keypoint::new(0.42, shoulder_y + torso, 1.0))
        .with(Landmark::RightHip, Keypoint::new(0.58, shoulder_y + torso, 1.0))
}

fn main() {
    println!("DevCare Agent - Replay Demo");
    println!("===========================");
    println!("{PRIVACY_NOTICE}");

    let start = Utc::now();
    let store = StateStore::new(
        PostureScoreEngine::default(),
        TypingStressEngine::starting_at(start),
        BreakScheduler::starting_at(start),
    );
    let posture = store.posture_engine();
    let typing = store.typing_engine();

    println!("Calibrating on {CALIBRATION_FRAMES} upright frames...");
    {
        let mut engine = posture.write().unwrap_or_else(PoisonError::into_inner);
        for i in 0..CALIBRATION_FRAMES {
            engine.score_at(&frame(0.4, 0.2, 0.0), start + Duration::milliseconds(i as i64 * 33));
        }
    }

    println!();
    println!("{:>6}  {:>7}  {:>6}  {:>6}  {:<20}", "minute", "posture", "speed", "stress", "status");

    for minute in 1..=50i64 {
        let now = start + Duration::minutes(minute);

        // Slouch sets in after twenty minutes.
        let slouch = ((minute - 20).max(0) as f64 / 30.0).min(1.0);
        {
            let mut engine = posture.write().unwrap_or_else(PoisonError::into_inner);
            for i in 0..5 {
                let at = now - Duration::milliseconds(200 * (5 - i));
                engine.score_at(&frame(0.4 - 0.12 * slouch, 0.2 - 0.07 * slouch, 0.06 * slouch), at);
            }
        }

        // Frantic, error-prone typing from minute 35.
        {
            let mut engine = typing.lock().unwrap_or_else(PoisonError::into_inner);
            let (keys, backspace_every) = if minute >= 35 { (450, 3) } else { (180, 20) };
            for k in 0..keys {
                let at = now - Duration::seconds(60) + Duration::milliseconds(k * 60_000 / keys);
                engine.on_key_at(k % backspace_every == 0, at);
            }
        }

        if minute % 5 == 0 {
            let snapshot = store.publish_at(now);
            println!(
                "{:>6}  {:>7}  {:>6}  {:>6}  {:<20}",
                snapshot.time, snapshot.posture, snapshot.typing_speed, snapshot.stress, snapshot.status
            );
            if snapshot.should_break {
                println!("        -> break suggested, taking one");
                store.record_break_at(now);
            }
        }
    }

    let insights = store.insights_at(start + Duration::minutes(50));
    println!();
    println!("Posture: {} ({})", insights.posture.status, insights.posture.color);
    println!("Stress trend: {:?}", insights.stress_trend);
    println!("Recommendation: {}", insights.recommendation);
    println!("Breaks: {:?}", insights.break_statistics);
}
