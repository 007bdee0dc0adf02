//! Pose preprocessing: landmark selection, normalization, temporal
//! smoothing and the wrist filters.

use serde::Serialize;

use crate::filter::{FilterParams, KeypointFilter};
use crate::keypoint::{Keypoint, KeypointName, Pose, MIN_CONFIDENCE};

/// Blend weight applied to the new pose in [`smooth_pose`].
pub const SMOOTHING_WEIGHT: f32 = 0.5;

// ════════════════════════════════════════════════════════════════════════════
// Landmark selection
// ════════════════════════════════════════════════════════════════════════════

/// Left wrist if detected, else right wrist if detected, else the (weak)
/// left wrist.
pub fn primary_wrist(pose: &Pose) -> &Keypoint {
    prefer(pose, KeypointName::LeftWrist, KeypointName::RightWrist)
}

/// Same priority rule as [`primary_wrist`], for shoulders.
pub fn primary_shoulder(pose: &Pose) -> &Keypoint {
    prefer(pose, KeypointName::LeftShoulder, KeypointName::RightShoulder)
}

fn prefer(pose: &Pose, first: KeypointName, second: KeypointName) -> &Keypoint {
    let a = pose.get(first);
    if a.is_detected() {
        return a;
    }
    let b = pose.get(second);
    if b.is_detected() { b } else { a }
}

/// Pixel Y → fraction of frame height (0 = top). A degenerate frame height
/// maps everything to 0.
pub fn normalize_y(raw_y: f32, frame_height: f32) -> f32 {
    if frame_height > 0.0 { raw_y / frame_height } else { 0.0 }
}

// ════════════════════════════════════════════════════════════════════════════
// Temporal smoothing
// ════════════════════════════════════════════════════════════════════════════

/// Blend `raw` toward `previous` keypoint by keypoint.
///
/// A keypoint whose new confidence is at or below [`MIN_CONFIDENCE`] keeps
/// its previous coordinates instead of snapping to whatever the model put
/// there; its score still follows the raw score so detection flags stay
/// honest.
pub fn smooth_pose(previous: Option<&Pose>, raw: &Pose, weight: f32) -> Pose {
    let Some(prev) = previous else {
        return raw.clone();
    };
    let w = weight.clamp(0.0, 1.0);

    let mut out = raw.clone();
    for kp in raw.iter() {
        let old = prev.get(kp.name);
        let blended = if kp.score <= MIN_CONFIDENCE {
            Keypoint { x: old.x, y: old.y, ..*kp }
        } else {
            Keypoint {
                x: old.x + w * (kp.x - old.x),
                y: old.y + w * (kp.y - old.y),
                ..*kp
            }
        };
        out.set(blended);
    }
    out
}

/// Carries the previous smoothed pose between frames.
#[derive(Clone, Debug)]
pub struct PoseSmoother {
    previous: Option<Pose>,
    weight:   f32,
}

impl PoseSmoother {
    pub fn new(weight: f32) -> Self {
        PoseSmoother { previous: None, weight }
    }

    pub fn push(&mut self, raw: &Pose) -> &Pose {
        let next = smooth_pose(self.previous.as_ref(), raw, self.weight);
        self.previous.insert(next)
    }

    pub fn latest(&self) -> Option<&Pose> { self.previous.as_ref() }

    pub fn reset(&mut self) { self.previous = None; }
}

impl Default for PoseSmoother {
    fn default() -> Self { PoseSmoother::new(SMOOTHING_WEIGHT) }
}

// ════════════════════════════════════════════════════════════════════════════
// PoseSignals + WristTracker
// ════════════════════════════════════════════════════════════════════════════

/// Derived per-frame signals consumed by calibration and the classifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PoseSignals {
    /// Any keypoint above [`MIN_CONFIDENCE`].
    pub has_pose:         bool,
    /// Primary wrist above [`MIN_CONFIDENCE`].
    pub has_wrist:        bool,
    pub wrist_score:      f32,
    /// Filtered wrist X, in frame pixels.
    pub wrist_x:          f32,
    /// Wrist Y of this frame, normalized. Calibration samples and gesture
    /// thresholds both live on this signal. A dropped wrist holds the
    /// smoothed position.
    pub wrist_y:          f32,
    /// Filtered wrist Y, normalized. Display only: it lags a fast raise by
    /// more than the jump window.
    pub filtered_wrist_y: f32,
    /// Primary shoulder Y, normalized.
    pub shoulder_y:       f32,
}

/// Owns the two wrist filters. They are created on the first frame with a
/// detected wrist and live until the tracker is dropped.
#[derive(Clone, Debug)]
pub struct WristTracker {
    params: FilterParams<f32>,
    x:      Option<KeypointFilter<f32>>,
    y:      Option<KeypointFilter<f32>>,
}

impl WristTracker {
    pub fn new(params: FilterParams<f32>) -> Self {
        WristTracker { params, x: None, y: None }
    }

    /// True once the filters exist.
    pub fn is_primed(&self) -> bool { self.x.is_some() && self.y.is_some() }

    /// Derive the signals for one frame from the pose as delivered and its
    /// smoothed counterpart.
    ///
    /// The filters run on the smoothed wrist. Frames without a detected
    /// wrist leave them untouched and report the last filtered position.
    pub fn observe(&mut self, raw: &Pose, smoothed: &Pose, frame_height: f32) -> PoseSignals {
        let wrist    = *primary_wrist(smoothed);
        let shoulder = *primary_shoulder(smoothed);
        let has_wrist = wrist.is_detected();

        let (fx, fy) = if has_wrist {
            let params = self.params;
            let xf = self.x.get_or_insert_with(|| KeypointFilter::new(wrist.x, params));
            let fx = xf.update(wrist.x);
            let yf = self.y.get_or_insert_with(|| KeypointFilter::new(wrist.y, params));
            let fy = yf.update(wrist.y);
            (fx, fy)
        } else {
            match (&self.x, &self.y) {
                (Some(xf), Some(yf)) => (xf.estimate(), yf.estimate()),
                _ => (wrist.x, wrist.y),
            }
        };

        let measured = raw.get(wrist.name);
        let wrist_y = if measured.is_detected() { measured.y } else { wrist.y };

        PoseSignals {
            has_pose:         smoothed.has_pose(),
            has_wrist,
            wrist_score:      wrist.score,
            wrist_x:          fx,
            wrist_y:          normalize_y(wrist_y, frame_height),
            filtered_wrist_y: normalize_y(fy, frame_height),
            shoulder_y:       normalize_y(shoulder.y, frame_height),
        }
    }
}

impl Default for WristTracker {
    fn default() -> Self { WristTracker::new(FilterParams::WRIST) }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pose_with(points: &[(KeypointName, f32, f32, f32)]) -> Pose {
        let mut pose = Pose::empty();
        for &(name, x, y, score) in points {
            pose.set(Keypoint::new(name, x, y, score));
        }
        pose
    }

    #[test]
    fn wrist_prefers_left_then_right() {
        let both = pose_with(&[
            (KeypointName::LeftWrist,  1.0, 1.0, 0.9),
            (KeypointName::RightWrist, 2.0, 2.0, 0.9),
        ]);
        assert_eq!(primary_wrist(&both).name, KeypointName::LeftWrist);

        let right_only = pose_with(&[(KeypointName::RightWrist, 2.0, 2.0, 0.9)]);
        assert_eq!(primary_wrist(&right_only).name, KeypointName::RightWrist);

        let none = Pose::empty();
        assert_eq!(primary_wrist(&none).name, KeypointName::LeftWrist);
    }

    #[test]
    fn normalize_handles_zero_height() {
        assert_relative_eq!(normalize_y(180.0, 360.0), 0.5);
        assert_eq!(normalize_y(180.0, 0.0), 0.0);
    }

    #[test]
    fn smoothing_blends_confident_points() {
        let prev = pose_with(&[(KeypointName::Nose, 0.0, 0.0, 0.9)]);
        let raw  = pose_with(&[(KeypointName::Nose, 10.0, 20.0, 0.9)]);
        let out = smooth_pose(Some(&prev), &raw, 0.5);
        assert_relative_eq!(out[KeypointName::Nose].x, 5.0);
        assert_relative_eq!(out[KeypointName::Nose].y, 10.0);
    }

    #[test]
    fn smoothing_holds_previous_on_dropout() {
        let prev = pose_with(&[(KeypointName::LeftWrist, 100.0, 200.0, 0.9)]);
        let raw  = pose_with(&[(KeypointName::LeftWrist, 0.0, 0.0, 0.01)]);
        let out = smooth_pose(Some(&prev), &raw, 0.5);
        let w = out[KeypointName::LeftWrist];
        assert_eq!((w.x, w.y), (100.0, 200.0));
        assert_eq!(w.score, 0.01);
    }

    #[test]
    fn smoother_passes_first_pose_through() {
        let mut s = PoseSmoother::default();
        let raw = pose_with(&[(KeypointName::Nose, 3.0, 4.0, 0.8)]);
        assert_eq!(s.push(&raw), &raw);
    }

    #[test]
    fn tracker_primes_on_first_detected_wrist() {
        let mut t = WristTracker::default();
        let sig = t.observe(&Pose::empty(), &Pose::empty(), 360.0);
        assert!(!t.is_primed());
        assert!(!sig.has_pose && !sig.has_wrist);

        let pose = pose_with(&[
            (KeypointName::LeftWrist,    320.0, 324.0, 0.9),
            (KeypointName::LeftShoulder, 300.0, 162.0, 0.9),
        ]);
        let sig = t.observe(&pose, &pose, 360.0);
        assert!(t.is_primed());
        assert!(sig.has_pose && sig.has_wrist);
        // Filter starts at the first measurement, so a steady wrist reads exactly.
        assert_relative_eq!(sig.wrist_y, 0.9, epsilon = 1e-6);
        assert_relative_eq!(sig.filtered_wrist_y, 0.9, epsilon = 1e-6);
        assert_relative_eq!(sig.shoulder_y, 0.45, epsilon = 1e-6);
    }

    #[test]
    fn tracker_holds_estimate_without_wrist() {
        let mut t = WristTracker::default();
        let pose = pose_with(&[(KeypointName::LeftWrist, 50.0, 180.0, 0.9)]);
        t.observe(&pose, &pose, 360.0);

        let mut smoother = PoseSmoother::default();
        smoother.push(&pose);
        let lost = pose_with(&[
            (KeypointName::Nose,      0.0, 0.0, 0.9),
            (KeypointName::LeftWrist, 9.0, 9.0, 0.01),
        ]);
        let held = smoother.push(&lost).clone();
        let sig = t.observe(&lost, &held, 360.0);
        assert!(sig.has_pose);
        assert!(!sig.has_wrist);
        assert_relative_eq!(sig.wrist_x, 50.0);
        assert_relative_eq!(sig.wrist_y, 0.5);
        assert_relative_eq!(sig.filtered_wrist_y, 0.5);
    }

    #[test]
    fn gesture_signal_follows_a_fast_raise_in_one_frame() {
        let mut t = WristTracker::default();
        let mut smoother = PoseSmoother::default();
        let rest = pose_with(&[(KeypointName::LeftWrist, 50.0, 324.0, 0.9)]);
        for _ in 0..10 {
            let smoothed = smoother.push(&rest).clone();
            t.observe(&rest, &smoothed, 360.0);
        }

        let up = pose_with(&[(KeypointName::LeftWrist, 50.0, 72.0, 0.9)]);
        let smoothed = smoother.push(&up).clone();
        let sig = t.observe(&up, &smoothed, 360.0);
        assert_relative_eq!(sig.wrist_y, 0.2, epsilon = 1e-6);
        // the filtered value is still most of the way down
        assert!(sig.filtered_wrist_y > 0.5, "filtered {}", sig.filtered_wrist_y);
    }
}
