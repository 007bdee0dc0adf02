//! Runner configuration: built-in defaults, optionally overlaid by a JSON
//! file, then by command-line flags.

use std::fs;
use std::path::{Path, PathBuf};

use gesture_engine::GestureTuning;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config {path}: {source}")]
    Parse {
        path:   PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Where poses come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoseSourceKind {
    /// Keyboard-driven synthetic skeleton.
    Simulated,
    /// No pose source; the game falls back to keyboard input.
    None,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub window_width:          usize,
    pub window_height:         usize,
    /// Logical stage width; obstacles spawn just past it.
    pub stage_width:           f32,
    /// Seed for obstacle kinds, particles and screen shake.
    pub seed:                  u64,
    /// JSON progress file. `None` keeps progress in memory only.
    pub store_path:            Option<PathBuf>,
    /// Start with keyboard control instead of gestures.
    pub manual_input:          bool,
    pub pose_source:           PoseSourceKind,
    /// Camera frame size the simulated skeleton is laid out in.
    pub frame_width:           f32,
    pub frame_height:          f32,
    pub sim_frame_interval_ms: u64,
    pub gesture:               GestureTuning,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            window_width:          900,
            window_height:         420,
            stage_width:           900.0,
            seed:                  0x5EED,
            store_path:            Some(PathBuf::from("flap_runner_progress.json")),
            manual_input:          false,
            pose_source:           PoseSourceKind::Simulated,
            frame_width:           640.0,
            frame_height:          360.0,
            sim_frame_interval_ms: 33,
            gesture:               GestureTuning::default(),
        }
    }
}

impl RunnerConfig {
    /// Read a (possibly partial) JSON config; missing keys keep defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let cfg: RunnerConfig = serde_json::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid { field, reason: reason.into() }
        }
        if self.window_width < 320 || self.window_height < 200 {
            return Err(invalid("window_width/window_height", "window must be at least 320×200"));
        }
        if !(self.stage_width.is_finite() && self.stage_width > 0.0) {
            return Err(invalid("stage_width", "must be a positive number"));
        }
        if !(self.frame_height.is_finite() && self.frame_height > 0.0)
            || !(self.frame_width.is_finite() && self.frame_width > 0.0)
        {
            return Err(invalid("frame_width/frame_height", "must be positive"));
        }
        if self.sim_frame_interval_ms == 0 {
            return Err(invalid("sim_frame_interval_ms", "must be at least 1"));
        }
        let g = &self.gesture;
        if g.flap_reversals == 0 {
            return Err(invalid("gesture.flap_reversals", "must be at least 1"));
        }
        if !(g.jump_window_ms > 0.0 && g.flap_decay_ms > 0.0 && g.min_dt_s > 0.0) {
            return Err(invalid("gesture", "windows and dt floor must be positive"));
        }
        if g.jump_offset >= g.idle_offset {
            return Err(invalid("gesture.jump_offset", "must sit above (be less than) idle_offset"));
        }
        Ok(())
    }
}
