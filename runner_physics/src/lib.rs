//! # runner_physics
//!
//! Deterministic simulation pieces of the side-scrolling runner. Nothing
//! here reads a clock or owns a thread; the frame loop passes `dt` in
//! seconds and timestamps in milliseconds.
//!
//! ```text
//!   gesture ─▶ JumpState::apply_impulse ─▶ integrate_jump ─▶ Rect::player
//!                                                               │
//!   SpawnTimer ─▶ ObstacleField::spawn ─▶ ObstacleField::advance ◀┘
//!                                               │ passed / hit
//!                                        ComboTracker, ScoreBoard
//! ```
//!
//! Obstacles and particles live in fixed [`SlotPool`]s; randomness comes in
//! through a caller-owned `rand::Rng` so a seeded generator replays a run
//! exactly.

pub mod physics;
pub mod pool;
pub mod obstacle;
pub mod particle;
pub mod difficulty;
pub mod scoring;

pub use physics::{
    aabb_intersect, integrate_jump, JumpState, Rect, GRAVITY, JUMP_IMPULSE, PLAYER_SIZE,
    PLAYER_X, WORLD_SPEED,
};
pub use pool::{Slot, SlotPool};
pub use obstacle::{Obstacle, ObstacleField, ObstacleKind, ObstacleStep, OBSTACLE_POOL};
pub use particle::{Particle, ParticleField, EMIT_ORIGIN, FLAP_BURST, JUMP_BURST, PARTICLE_POOL};
pub use difficulty::{spawn_interval, SpawnTimer};
pub use scoring::{ComboTracker, ScoreBoard, Shake};
