//! Combo streaks, score, distance and screen shake.

use serde::Serialize;

/// Jumps closer together than this keep a streak alive.
pub const STREAK_WINDOW_MS: f64 = 1500.0;
pub const STREAK_LENGTH:    u32 = 3;
pub const STREAK_COMBO:     f32 = 1.5;
/// World pixels per distance unit.
pub const DISTANCE_UNIT:    f32 = 80.0;
pub const SHAKE_DURATION_S: f32 = 0.25;
pub const SHAKE_AMPLITUDE:  f32 = 4.0;

// ════════════════════════════════════════════════════════════════════════════
// ComboTracker
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ComboTracker {
    streak:       u32,
    combo:        f32,
    last_jump_ms: Option<f64>,
}

impl ComboTracker {
    pub fn new() -> Self {
        ComboTracker { streak: 0, combo: 1.0, last_jump_ms: None }
    }

    /// Count an applied jump and return the new multiplier.
    pub fn record_jump(&mut self, now_ms: f64) -> f32 {
        self.last_jump_ms = Some(now_ms);
        self.streak += 1;
        self.combo = if self.streak >= STREAK_LENGTH { STREAK_COMBO } else { 1.0 };
        self.combo
    }

    /// Drop the streak once the last jump is too old.
    pub fn decay(&mut self, now_ms: f64) {
        if self.last_jump_ms.map_or(true, |t| now_ms - t > STREAK_WINDOW_MS) {
            self.streak = 0;
            self.combo = 1.0;
        }
    }

    pub fn combo(&self) -> f32 { self.combo }
    pub fn streak(&self) -> u32 { self.streak }
    pub fn reset(&mut self) { *self = ComboTracker::new(); }
}

impl Default for ComboTracker {
    fn default() -> Self { ComboTracker::new() }
}

// ════════════════════════════════════════════════════════════════════════════
// ScoreBoard
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ScoreBoard {
    pub score:      f32,
    pub high_score: u32,
    pub distance:   u32,
}

impl ScoreBoard {
    pub fn new(high_score: u32) -> Self {
        ScoreBoard { score: 0.0, high_score, distance: 0 }
    }

    /// Add `points`. Returns the new (floored) high score when it was beaten.
    pub fn award(&mut self, points: f32) -> Option<u32> {
        self.score += points;
        let floored = self.score.floor() as u32;
        if floored > self.high_score {
            self.high_score = floored;
            return Some(floored);
        }
        None
    }

    pub fn set_distance(&mut self, world_x: f32) {
        self.distance = (world_x / DISTANCE_UNIT).floor().max(0.0) as u32;
    }

    /// New run; the high score survives.
    pub fn reset(&mut self) {
        *self = ScoreBoard::new(self.high_score);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Shake
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Shake {
    timer: f32,
}

impl Shake {
    pub fn trigger(&mut self) { self.timer = SHAKE_DURATION_S; }

    /// Advance and return the current magnitude in pixels.
    pub fn tick(&mut self, dt: f32) -> f32 {
        if self.timer <= 0.0 {
            return 0.0;
        }
        self.timer -= dt;
        (SHAKE_AMPLITUDE * self.timer / SHAKE_DURATION_S).max(0.0)
    }

    pub fn is_active(&self) -> bool { self.timer > 0.0 }
    pub fn reset(&mut self) { self.timer = 0.0; }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn third_quick_jump_raises_combo() {
        let mut c = ComboTracker::new();
        assert_eq!(c.record_jump(0.0), 1.0);
        assert_eq!(c.record_jump(1000.0), 1.0);
        assert_eq!(c.record_jump(2000.0), STREAK_COMBO);
        c.decay(3000.0);
        assert_eq!(c.combo(), STREAK_COMBO);
        c.decay(3501.0);
        assert_eq!((c.streak(), c.combo()), (0, 1.0));
    }

    #[test]
    fn high_score_is_floored() {
        let mut b = ScoreBoard::new(2);
        assert_eq!(b.award(1.5), None);
        assert_eq!(b.award(1.5), Some(3));
        assert_relative_eq!(b.score, 3.0);
        b.reset();
        assert_eq!((b.score, b.high_score), (0.0, 3));
    }

    #[test]
    fn distance_units() {
        let mut b = ScoreBoard::default();
        b.set_distance(799.0);
        assert_eq!(b.distance, 9);
    }

    #[test]
    fn shake_fades_out() {
        let mut s = Shake::default();
        assert_eq!(s.tick(0.1), 0.0);
        s.trigger();
        assert_relative_eq!(s.tick(0.125), 2.0);
        s.tick(0.2);
        assert!(!s.is_active());
        assert_eq!(s.tick(0.1), 0.0);
    }
}
