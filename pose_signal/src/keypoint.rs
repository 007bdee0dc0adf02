//! Keypoint vocabulary and the fixed-size [`Pose`] container.
//!
//! A pose always holds all 17 landmarks. A landmark the model could not see
//! is present with `score ≈ 0`, never missing.

use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::PoseError;

/// Number of landmarks in a full pose.
pub const KEYPOINT_COUNT: usize = 17;

/// Confidence a keypoint must exceed to count as detected.
pub const MIN_CONFIDENCE: f32 = 0.05;

// ════════════════════════════════════════════════════════════════════════════
// KeypointName
// ════════════════════════════════════════════════════════════════════════════

/// The closed landmark vocabulary, in the order the pose model emits it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeypointName {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl KeypointName {
    pub const ALL: [KeypointName; KEYPOINT_COUNT] = [
        KeypointName::Nose,
        KeypointName::LeftEye,
        KeypointName::RightEye,
        KeypointName::LeftEar,
        KeypointName::RightEar,
        KeypointName::LeftShoulder,
        KeypointName::RightShoulder,
        KeypointName::LeftElbow,
        KeypointName::RightElbow,
        KeypointName::LeftWrist,
        KeypointName::RightWrist,
        KeypointName::LeftHip,
        KeypointName::RightHip,
        KeypointName::LeftKnee,
        KeypointName::RightKnee,
        KeypointName::LeftAnkle,
        KeypointName::RightAnkle,
    ];

    /// Slot index inside a [`Pose`].
    pub fn index(self) -> usize { self as usize }

    pub fn as_str(self) -> &'static str {
        match self {
            KeypointName::Nose          => "nose",
            KeypointName::LeftEye       => "left_eye",
            KeypointName::RightEye      => "right_eye",
            KeypointName::LeftEar       => "left_ear",
            KeypointName::RightEar      => "right_ear",
            KeypointName::LeftShoulder  => "left_shoulder",
            KeypointName::RightShoulder => "right_shoulder",
            KeypointName::LeftElbow     => "left_elbow",
            KeypointName::RightElbow    => "right_elbow",
            KeypointName::LeftWrist     => "left_wrist",
            KeypointName::RightWrist    => "right_wrist",
            KeypointName::LeftHip       => "left_hip",
            KeypointName::RightHip      => "right_hip",
            KeypointName::LeftKnee      => "left_knee",
            KeypointName::RightKnee     => "right_knee",
            KeypointName::LeftAnkle     => "left_ankle",
            KeypointName::RightAnkle    => "right_ankle",
        }
    }
}

impl fmt::Display for KeypointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeypointName {
    type Err = PoseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeypointName::ALL
            .iter()
            .copied()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| PoseError::UnknownKeypoint(s.to_string()))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Keypoint
// ════════════════════════════════════════════════════════════════════════════

/// One landmark estimate. `x`/`y` are frame pixels, `score` is in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub name:  KeypointName,
    pub x:     f32,
    pub y:     f32,
    pub score: f32,
}

impl Keypoint {
    pub fn new(name: KeypointName, x: f32, y: f32, score: f32) -> Self {
        Keypoint { name, x, y, score }
    }

    /// A zero-confidence placeholder at the origin.
    pub fn undetected(name: KeypointName) -> Self {
        Keypoint { name, x: 0.0, y: 0.0, score: 0.0 }
    }

    pub fn is_detected(&self) -> bool { self.score > MIN_CONFIDENCE }
}

/// A keypoint as it arrives from the pose model, with a free-form name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawKeypoint {
    pub name:  String,
    pub x:     f32,
    pub y:     f32,
    pub score: f32,
}

impl RawKeypoint {
    pub fn new(name: &str, x: f32, y: f32, score: f32) -> Self {
        RawKeypoint { name: name.to_string(), x, y, score }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Pose
// ════════════════════════════════════════════════════════════════════════════

/// A full pose: exactly one keypoint per [`KeypointName`], in vocabulary order.
#[derive(Clone, Debug, PartialEq)]
pub struct Pose {
    points: [Keypoint; KEYPOINT_COUNT],
}

impl Pose {
    /// A pose where nothing was detected.
    pub fn empty() -> Self {
        Pose { points: KeypointName::ALL.map(Keypoint::undetected) }
    }

    /// Build a pose from an arbitrary model output.
    ///
    /// Each slot is filled by name first, then by an unnamed entry at the
    /// same position, then with an undetected placeholder. A named entry
    /// only ever lands in its own slot; an empty list yields [`Pose::empty`].
    pub fn from_raw(raw: &[RawKeypoint]) -> Self {
        let mut by_name: [Option<&RawKeypoint>; KEYPOINT_COUNT] = [None; KEYPOINT_COUNT];
        let mut unnamed: [Option<&RawKeypoint>; KEYPOINT_COUNT] = [None; KEYPOINT_COUNT];
        for (i, kp) in raw.iter().enumerate() {
            match kp.name.parse::<KeypointName>() {
                Ok(name) => {
                    by_name[name.index()].get_or_insert(kp);
                }
                Err(e) => {
                    log::trace!("placing keypoint by position: {}", e);
                    if let Some(slot) = unnamed.get_mut(i) {
                        *slot = Some(kp);
                    }
                }
            }
        }

        let points = KeypointName::ALL.map(|name| {
            match by_name[name.index()].or(unnamed[name.index()]) {
                Some(kp) => Keypoint::new(name, kp.x, kp.y, sanitize_score(kp.score)),
                None     => Keypoint::undetected(name),
            }
        });
        Pose { points }
    }

    pub fn get(&self, name: KeypointName) -> &Keypoint { &self.points[name.index()] }

    /// Look a keypoint up by its wire name; `None` for names outside the
    /// vocabulary.
    pub fn find(&self, name: &str) -> Option<&Keypoint> {
        name.parse::<KeypointName>().ok().map(|n| self.get(n))
    }

    pub fn set(&mut self, keypoint: Keypoint) {
        self.points[keypoint.name.index()] = keypoint;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Keypoint> { self.points.iter() }

    /// True when any keypoint is confidently detected.
    pub fn has_pose(&self) -> bool { self.points.iter().any(Keypoint::is_detected) }
}

impl Default for Pose {
    fn default() -> Self { Pose::empty() }
}

impl Index<KeypointName> for Pose {
    type Output = Keypoint;
    fn index(&self, name: KeypointName) -> &Keypoint { self.get(name) }
}

/// NaN or out-of-range confidences collapse into `[0, 1]`.
fn sanitize_score(score: f32) -> f32 {
    if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
