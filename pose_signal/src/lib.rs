//! # pose_signal
//!
//! The leaf of the motion pipeline: turns raw 2-D keypoint estimates from an
//! external pose model into the handful of stable, semantically named
//! signals the gesture layer consumes.
//!
//! ## Pipeline position
//!
//! ```text
//! raw keypoints ──► Pose::from_raw ──► PoseSmoother ──► WristTracker ──► PoseSignals
//!  (name,x,y,score)   fixed 17 slots     blend w/ prev    1-D filters X/Y    normalized
//! ```
//!
//! * [`Keypoint`] / [`KeypointName`]: closed 17-landmark vocabulary.
//! * [`KeypointFilter`]: per-axis recursive estimator.
//! * [`smooth_pose`]: temporal smoothing across consecutive full poses.
//! * [`WristTracker`]: owns the lazily created wrist filters and derives
//!   [`PoseSignals`].

pub mod keypoint;
pub mod filter;
pub mod preprocess;

pub use keypoint::{Keypoint, KeypointName, Pose, RawKeypoint, KEYPOINT_COUNT, MIN_CONFIDENCE};
pub use filter::{FilterParams, KeypointFilter};
pub use preprocess::{
    normalize_y, primary_shoulder, primary_wrist, smooth_pose,
    PoseSignals, PoseSmoother, WristTracker, SMOOTHING_WEIGHT,
};

use thiserror::Error;

/// Errors raised while interpreting pose data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoseError {
    /// A keypoint name outside the 17-landmark vocabulary.
    #[error("unknown keypoint name: {0:?}")]
    UnknownKeypoint(String),
}
