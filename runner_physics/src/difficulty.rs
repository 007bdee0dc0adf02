//! Spawn pacing. Obstacles come faster the further the run goes.

pub const FIRST_SPAWN_S:      f32 = 1.5;
pub const MIN_SPAWN_INTERVAL: f32 = 0.6;
/// Distance scale of the exponential decay, px.
pub const DIFFICULTY_SCALE:   f32 = 2500.0;

/// Seconds until the next spawn after `world_x` pixels of travel.
pub fn spawn_interval(world_x: f32) -> f32 {
    (1.6 * (-world_x / DIFFICULTY_SCALE).exp() + 0.4).max(MIN_SPAWN_INTERVAL)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnTimer {
    remaining: f32,
}

impl SpawnTimer {
    pub fn new() -> Self { SpawnTimer { remaining: FIRST_SPAWN_S } }

    /// Count down; true when a spawn is due, after which the timer rearms
    /// with the interval for `world_x`.
    pub fn tick(&mut self, dt: f32, world_x: f32) -> bool {
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.remaining = spawn_interval(world_x);
            return true;
        }
        false
    }

    pub fn remaining(&self) -> f32 { self.remaining }
    pub fn reset(&mut self) { *self = SpawnTimer::new(); }
}

impl Default for SpawnTimer {
    fn default() -> Self { SpawnTimer::new() }
}
