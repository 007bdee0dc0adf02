//! Idle/jump threshold pair and the calibration statistics behind it.

use serde::{Deserialize, Serialize};

/// Normalized-Y boundaries (0 = top of frame). A wrist *below*
/// `idle_threshold` on screen (larger Y) is resting; at or *above*
/// `jump_threshold` (smaller Y) it is raised.
///
/// Always `jump_threshold < idle_threshold`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseThresholds {
    pub idle_threshold: f32,
    pub jump_threshold: f32,
}

impl PoseThresholds {
    /// Used when the player skips calibration.
    pub const DEFAULT: PoseThresholds = PoseThresholds {
        idle_threshold: 0.75,
        jump_threshold: 0.35,
    };

    pub fn new(idle_threshold: f32, jump_threshold: f32) -> Self {
        PoseThresholds { idle_threshold, jump_threshold }
    }

    /// Thresholds derived from the shoulder line when none are calibrated.
    pub fn shoulder_relative(shoulder_y: f32, idle_offset: f32, jump_offset: f32) -> Self {
        PoseThresholds {
            idle_threshold: shoulder_y + idle_offset,
            jump_threshold: shoulder_y + jump_offset,
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.jump_threshold < self.idle_threshold
    }
}

impl Default for PoseThresholds {
    fn default() -> Self { PoseThresholds::DEFAULT }
}

/// Population mean / standard deviation of the two calibration phases.
/// Diagnostic only; gameplay reads [`PoseThresholds`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationStats {
    pub low_mean:  f32,
    pub low_std:   f32,
    pub high_mean: f32,
    pub high_std:  f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_ordered() {
        assert!(PoseThresholds::DEFAULT.is_ordered());
    }

    #[test]
    fn shoulder_relative_offsets() {
        let t = PoseThresholds::shoulder_relative(0.5, 0.1, -0.05);
        assert!((t.idle_threshold - 0.6).abs() < 1e-6);
        assert!((t.jump_threshold - 0.45).abs() < 1e-6);
        assert!(t.is_ordered());
    }
}
