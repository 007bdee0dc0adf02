//! Cosmetic particle bursts. A particle is live while `life > 0`.

use rand::Rng;
use serde::Serialize;

use crate::physics::PLAYER_X;
use crate::pool::{Slot, SlotPool};

pub const PARTICLE_POOL:  usize = 30;
pub const JUMP_BURST:     usize = 12;
pub const FLAP_BURST:     usize = 8;
/// Downward pull on particles, px/s².
pub const PARTICLE_DRAG:  f32 = 220.0;

/// Where bursts originate, relative to the ground line.
pub const EMIT_ORIGIN: (f32, f32) = (PLAYER_X + 20.0, 80.0);

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Particle {
    pub x:    f32,
    pub y:    f32,
    pub vx:   f32,
    pub vy:   f32,
    /// Seconds left.
    pub life: f32,
}

impl Slot for Particle {
    fn is_active(&self) -> bool { self.life > 0.0 }
    fn deactivate(&mut self) { self.life = 0.0; }
}

#[derive(Clone, Debug)]
pub struct ParticleField {
    pool: SlotPool<Particle>,
}

impl ParticleField {
    pub fn new() -> Self {
        ParticleField { pool: SlotPool::new(PARTICLE_POOL, |_| Particle::default()) }
    }

    /// Emit up to `burst` particles at `origin`. Returns how many fit.
    pub fn emit<R: Rng>(&mut self, origin: (f32, f32), burst: usize, rng: &mut R) -> usize {
        let mut emitted = 0;
        while emitted < burst {
            let p = Particle {
                x:    origin.0,
                y:    origin.1,
                vx:   (rng.gen::<f32>() - 0.5) * 140.0,
                vy:   80.0 + rng.gen::<f32>() * 120.0,
                life: 0.6 + rng.gen::<f32>() * 0.4,
            };
            if self.pool.allocate(p).is_none() {
                break;
            }
            emitted += 1;
        }
        emitted
    }

    pub fn advance(&mut self, dt: f32) {
        for p in self.pool.iter_active_mut() {
            p.life -= dt;
            p.x += p.vx * dt;
            p.y += p.vy * dt;
            p.vy -= PARTICLE_DRAG * dt;
        }
    }

    pub fn reset(&mut self) { self.pool.reset(); }

    pub fn live(&self) -> impl Iterator<Item = &Particle> { self.pool.iter_active() }
    pub fn live_count(&self) -> usize { self.pool.active_count() }
}

impl Default for ParticleField {
    fn default() -> Self { ParticleField::new() }
}
