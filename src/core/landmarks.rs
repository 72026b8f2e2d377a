//! Body landmark frames as delivered by an external pose model.
//!
//! Coordinates are normalized image coordinates (0-1 on both axes, y grows
//! downwards). Each point carries the model's visibility estimate.

use crate::error::FrameError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Named body keypoints used by posture scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Landmark {
    Nose,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftHip,
    RightHip,
}

impl Landmark {
    /// All landmarks, in BlazePose index order.
    pub const ALL: [Landmark; 7] = [
        Landmark::Nose,
        Landmark::LeftEar,
        Landmark::RightEar,
        Landmark::LeftShoulder,
        Landmark::RightShoulder,
        Landmark::LeftHip,
        Landmark::RightHip,
    ];

    /// Index of this landmark in the 33-point BlazePose (MediaPipe) layout.
    pub fn mediapipe_index(self) -> usize {
        match self {
            Landmark::Nose => 0,
            Landmark::LeftEar => 7,
            Landmark::RightEar => 8,
            Landmark::LeftShoulder => 11,
            Landmark::RightShoulder => 12,
            Landmark::LeftHip => 23,
            Landmark::RightHip => 24,
        }
    }
}

/// A single 3-D keypoint with visibility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    /// Model confidence that the point is visible (0-1)
    #[serde(default = "full_visibility")]
    pub visibility: f64,
}

fn full_visibility() -> f64 {
    1.0
}

impl Keypoint {
    pub fn new(x: f64, y: f64, visibility: f64) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility,
        }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.visibility.is_finite()
    }
}

/// One detection cycle's worth of keypoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkFrame {
    points: HashMap<Landmark, Keypoint>,
}

impl LandmarkFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with(mut self, landmark: Landmark, point: Keypoint) -> Self {
        self.points.insert(landmark, point);
        self
    }

    pub fn insert(&mut self, landmark: Landmark, point: Keypoint) {
        self.points.insert(landmark, point);
    }

    /// Build a frame from a full BlazePose landmark list.
    ///
    /// Points beyond the end of `landmarks` are simply absent, so a short
    /// list yields a frame that scoring will reject.
    pub fn from_mediapipe(landmarks: &[Keypoint]) -> Self {
        let points = Landmark::ALL
            .iter()
            .filter_map(|&l| landmarks.get(l.mediapipe_index()).map(|p| (l, *p)))
            .collect();
        Self { points }
    }

    pub fn get(&self, landmark: Landmark) -> Option<&Keypoint> {
        self.points.get(&landmark)
    }

    /// Fetch a landmark that scoring cannot do without.
    pub fn require(&self, landmark: Landmark) -> Result<Keypoint, FrameError> {
        let point = self
            .points
            .get(&landmark)
            .copied()
            .ok_or(FrameError::MissingLandmark(landmark))?;
        if !point.is_finite() {
            return Err(FrameError::NonFiniteCoordinate(landmark));
        }
        Ok(point)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_mediapipe_picks_named_indices() {
        let mut raw = vec![Keypoint::new(0.0, 0.0, 0.0); 33];
        raw[11] = Keypoint::new(0.4, 0.5, 0.9);
        raw[24] = Keypoint::new(0.6, 0.9, 0.8);

        let frame = LandmarkFrame::from_mediapipe(&raw);
        assert_eq!(frame.len(), 7);
        assert_eq!(frame.get(Landmark::LeftShoulder).unwrap().x, 0.4);
        assert_eq!(frame.get(Landmark::RightHip).unwrap().y, 0.9);
    }

    #[test]
    fn test_from_mediapipe_short_list() {
        let raw = vec![Keypoint::new(0.5, 0.5, 1.0); 12];
        let frame = LandmarkFrame::from_mediapipe(&raw);

        assert!(frame.get(Landmark::LeftEar).is_some());
        assert!(frame.get(Landmark::LeftHip).is_none());
        assert_eq!(
            frame.require(Landmark::LeftHip),
            Err(FrameError::MissingLandmark(Landmark::LeftHip))
        );
    }

    #[test]
    fn test_require_rejects_nan() {
        let frame = LandmarkFrame::new().with(Landmark::Nose, Keypoint::new(f64::NAN, 0.1, 1.0));
        assert_eq!(
            frame.require(Landmark::Nose),
            Err(FrameError::NonFiniteCoordinate(Landmark::Nose))
        );
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{"nose": {"x": 0.5, "y": 0.2}, "left_ear": {"x": 0.45, "y": 0.25, "visibility": 0.7}}"#;
        let frame: LandmarkFrame = serde_json::from_str(json).unwrap();

        assert_eq!(frame.len(), 2);
        assert_eq!(frame.get(Landmark::Nose).unwrap().visibility, 1.0);
        assert_eq!(frame.get(Landmark::LeftEar).unwrap().visibility, 0.7);
    }
}
