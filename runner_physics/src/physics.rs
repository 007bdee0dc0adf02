//! Vertical jump integration and the rectangle overlap test.
//!
//! Heights are measured up from the ground (y = 0), in stage pixels.

use serde::{Deserialize, Serialize};

pub const GRAVITY:      f32 = 2000.0;
pub const JUMP_IMPULSE: f32 = 800.0;
/// Runner's fixed horizontal position on the stage.
pub const PLAYER_X:     f32 = 120.0;
pub const PLAYER_SIZE:  f32 = 56.0;
/// World scroll speed, px/s.
pub const WORLD_SPEED:  f32 = 260.0;

// ════════════════════════════════════════════════════════════════════════════
// JumpState
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct JumpState {
    /// Height above ground, never negative.
    pub y:        f32,
    pub vy:       f32,
    pub grounded: bool,
}

impl JumpState {
    pub const GROUNDED: JumpState = JumpState { y: 0.0, vy: 0.0, grounded: true };

    /// Launch the body. Refused (returns false) while airborne.
    pub fn apply_impulse(&mut self, impulse: f32) -> bool {
        if !self.grounded {
            return false;
        }
        self.vy = impulse;
        self.grounded = false;
        true
    }

    pub fn is_finite(&self) -> bool { self.y.is_finite() && self.vy.is_finite() }
}

impl Default for JumpState {
    fn default() -> Self { JumpState::GROUNDED }
}

/// Advance the body by `dt` seconds. A grounded body at rest, or a zero
/// step, returns the state unchanged; anything else falls and is clamped to
/// the ground on contact.
pub fn integrate_jump(state: JumpState, dt: f32, gravity: f32) -> JumpState {
    if (state.grounded && state.vy <= 0.0) || dt <= 0.0 {
        return state;
    }
    let vy = state.vy - gravity * dt;
    let y = state.y + vy * dt;
    if y <= 0.0 {
        return JumpState::GROUNDED;
    }
    JumpState { y, vy, grounded: false }
}

// ════════════════════════════════════════════════════════════════════════════
// Rect / AABB
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x:      f32,
    pub y:      f32,
    pub width:  f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Rect { x, y, width, height }
    }

    /// The runner's box at height `y`.
    pub fn player(y: f32) -> Self {
        Rect::new(PLAYER_X, y, PLAYER_SIZE, PLAYER_SIZE)
    }
}

/// Overlap on both axes. Shared edges do not count.
pub fn aabb_intersect(a: &Rect, b: &Rect) -> bool {
    a.x < b.x + b.width
        && a.x + a.width > b.x
        && a.y < b.y + b.height
        && a.y + a.height > b.y
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn grounded_body_stays_put() {
        assert_eq!(integrate_jump(JumpState::GROUNDED, 0.016, GRAVITY), JumpState::GROUNDED);
    }

    #[test]
    fn jump_lands_within_flight_time() {
        let dt = 1.0 / 60.0;
        let mut s = JumpState::GROUNDED;
        assert!(s.apply_impulse(JUMP_IMPULSE));
        assert_eq!(s.vy, JUMP_IMPULSE);
        assert!(!s.grounded);

        let mut elapsed = 0.0;
        let mut apex = 0.0_f32;
        while !s.grounded {
            s = integrate_jump(s, dt, GRAVITY);
            elapsed += dt;
            apex = apex.max(s.y);
            assert!(elapsed < 2.0, "never landed");
        }
        assert_eq!(s.vy, 0.0);
        assert_eq!(s.y, 0.0);
        assert!(elapsed <= 2.0 * JUMP_IMPULSE / GRAVITY + 1e-4, "landed after {elapsed}");
        // v²/2g = 160, minus the Euler step loss
        assert!(apex > 140.0 && apex < 160.0, "apex {apex}");
    }

    #[test]
    fn zero_step_keeps_fresh_impulse() {
        let mut s = JumpState::GROUNDED;
        s.apply_impulse(JUMP_IMPULSE);
        assert_eq!(integrate_jump(s, 0.0, GRAVITY), s);
    }

    #[test]
    fn no_double_jump() {
        let mut s = JumpState::GROUNDED;
        assert!(s.apply_impulse(JUMP_IMPULSE));
        s = integrate_jump(s, 0.05, GRAVITY);
        let vy = s.vy;
        assert!(!s.apply_impulse(JUMP_IMPULSE));
        assert_relative_eq!(s.vy, vy);
    }

    #[test]
    fn touching_edges_do_not_collide() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(!aabb_intersect(&a, &Rect::new(10.0, 0.0, 10.0, 10.0)));
        assert!(!aabb_intersect(&a, &Rect::new(0.0, 10.0, 10.0, 10.0)));
        assert!(aabb_intersect(&a, &Rect::new(9.0, 9.0, 10.0, 10.0)));
    }

    #[test]
    fn low_obstacle_clears_a_standing_player() {
        let standing = Rect::player(0.0);
        let low = Rect::new(PLAYER_X, PLAYER_SIZE + 26.0, 48.0, 24.0);
        assert!(!aabb_intersect(&standing, &low));
        assert!(aabb_intersect(&Rect::player(60.0), &low));
    }

    proptest! {
        #[test]
        fn height_never_negative(
            dts in proptest::collection::vec(1e-4_f32..0.1, 1..200),
            impulse_at in proptest::collection::vec(any::<bool>(), 200),
        ) {
            let mut s = JumpState::GROUNDED;
            for (i, dt) in dts.iter().enumerate() {
                if impulse_at[i] {
                    s.apply_impulse(JUMP_IMPULSE);
                }
                s = integrate_jump(s, *dt, GRAVITY);
                prop_assert!(s.y >= 0.0);
                prop_assert_eq!(s.grounded, s.y <= 0.0 && s.vy <= 0.0);
            }
        }
    }
}
