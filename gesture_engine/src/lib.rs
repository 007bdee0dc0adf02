//! # gesture_engine
//!
//! Turns the continuous wrist signal from [`pose_signal`] into discrete game
//! commands.
//!
//! ## Gesture → Command mapping
//!
//! | Motion | Condition | Gesture |
//! |---|---|---|
//! | Fast raise | wrist leaves rest zone and reaches the jump line within 300 ms | `Jump` |
//! | Horizontal wave | 3 direction changes at > 200 px/s with the arm low | `Flap` |
//! | Anything else / no pose | — | `Idle` |
//!
//! Thresholds come from a per-user [`CalibrationEngine`] run (arm low, then
//! arm high, 30 samples each) or fall back to shoulder-relative defaults.

pub mod thresholds;
pub mod classifier;
pub mod calibration;

pub use thresholds::{CalibrationStats, PoseThresholds};
pub use classifier::{
    gesture_confidence, update_gesture, Gesture, GestureClassifier, GestureInput,
    GestureMode, GestureState, GestureTuning, GestureUpdate,
};
pub use calibration::{
    default_result, derive_thresholds, derive_timeout_thresholds, summarize_samples,
    summarize_timeout, CalibrationEngine,
    CalibrationEvent, CalibrationOutcome, CalibrationPhase, CalibrationProgress,
    CalibrationResult, OutcomeOrigin, CALIBRATION_TIMEOUT_MS, CAPTURE_FRAMES,
    SAMPLE_INTERVAL_MS,
};
