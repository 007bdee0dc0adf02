//! # flap_runner
//!
//! Motion-controlled side-scrolling runner. A pose source on its own thread
//! feeds keypoints to a single-threaded frame loop that calibrates the
//! player, classifies gestures and steps the runner simulation.
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Motion | Action |
//! |---|---|---|
//! | Jump | Fast raise of the wrist from rest to above the jump line | Runner jumps (grounded only); 3 quick jumps give ×1.5 combo |
//! | Flap | Three fast horizontal direction changes with the arm low | Screen shake + particle burst |
//!
//! ## Session phases
//!
//! `Calibrating` → `Running` ⇄ `Paused(CameraLost | UnexpectedError)`, and
//! `Running` → `GameOver` 520 ms after the first collision.
//!
//! ## Keyboard
//!
//! | Key | Action |
//! |---|---|
//! | `M` | Toggle keyboard / gesture input |
//! | `Space` | Jump (keyboard input) |
//! | `F` | Flap (keyboard input) |
//! | `J` (hold) | Simulated arm raised |
//! | `W` (hold) | Simulated arm waving |
//! | `X` (hold) | Simulated wrist hidden |
//! | `Z` | Stall the simulated pose source |
//! | `P` / `Enter` | Resume |
//! | `R` | Replay |
//! | `C` | Recalibrate |
//! | `S` | Skip calibration (use defaults) |
//! | `Q` / `Esc` | Quit |

pub mod config;
pub mod store;
pub mod source;
pub mod session;
pub mod visualizer;
pub mod app;

pub use config::{ConfigError, PoseSourceKind, RunnerConfig};
pub use session::{GameSession, PauseReason, SessionPhase, Snapshot, TickFault, TickReport};
pub use source::{PoseMessage, PoseSample};
pub use store::{JsonFileStore, MemoryStore, ScoreStore, StoreError, StoredState};
