//! Pooled obstacles: spawn, scroll, cull, score and collide.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::physics::{aabb_intersect, Rect, PLAYER_SIZE, PLAYER_X};
use crate::pool::{Slot, SlotPool};

pub const OBSTACLE_POOL:   usize = 12;
pub const OBSTACLE_WIDTH:  f32 = 48.0;
/// Obstacles enter this far past the right edge of the stage.
pub const SPAWN_MARGIN:    f32 = 120.0;
/// Left edge past which an obstacle is recycled.
pub const CULL_X:          f32 = -80.0;
/// An obstacle left of this line has been passed.
pub const SCORE_LINE_X:    f32 = PLAYER_X - 10.0;
/// Draw above which the obstacle is a tall one.
pub const HIGH_ROLL:       f32 = 0.55;

const HIGH_HEIGHT: f32 = 84.0;
const LOW_HEIGHT:  f32 = 24.0;
const LOW_Y:       f32 = PLAYER_SIZE + 26.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleKind {
    /// Floating bar at head height.
    Low,
    /// Tall block standing on the ground.
    High,
}

impl ObstacleKind {
    fn extent(self) -> (f32, f32) {
        match self {
            ObstacleKind::High => (0.0, HIGH_HEIGHT),
            ObstacleKind::Low  => (LOW_Y, LOW_HEIGHT),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Obstacle {
    pub id:     usize,
    pub kind:   ObstacleKind,
    pub x:      f32,
    pub y:      f32,
    pub height: f32,
    pub active: bool,
    pub scored: bool,
}

impl Obstacle {
    fn idle(id: usize, x: f32) -> Self {
        Obstacle {
            id,
            kind: ObstacleKind::Low,
            x,
            y: LOW_Y,
            height: LOW_HEIGHT,
            active: false,
            scored: false,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, OBSTACLE_WIDTH, self.height)
    }
}

impl Slot for Obstacle {
    fn is_active(&self) -> bool { self.active }
    fn deactivate(&mut self) {
        self.active = false;
        self.scored = false;
    }
}

/// What one [`ObstacleField::advance`] pass observed.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ObstacleStep {
    /// Obstacles that crossed the score line this pass.
    pub passed: u32,
    pub hit:    bool,
}

#[derive(Clone, Debug)]
pub struct ObstacleField {
    pool:        SlotPool<Obstacle>,
    stage_width: f32,
}

impl ObstacleField {
    pub fn new(stage_width: f32) -> Self {
        let start = stage_width + SPAWN_MARGIN;
        ObstacleField {
            pool: SlotPool::new(OBSTACLE_POOL, |i| Obstacle::idle(i, start)),
            stage_width,
        }
    }

    pub fn spawn_x(&self) -> f32 { self.stage_width + SPAWN_MARGIN }

    /// Bring one obstacle on stage. `None` if every slot is busy.
    pub fn spawn<R: Rng>(&mut self, rng: &mut R) -> Option<ObstacleKind> {
        let kind = if rng.gen::<f32>() > HIGH_ROLL { ObstacleKind::High } else { ObstacleKind::Low };
        self.spawn_kind(kind).map(|_| kind)
    }

    pub fn spawn_kind(&mut self, kind: ObstacleKind) -> Option<usize> {
        let id = self.pool.slots().iter().position(|s| !s.active)?;
        let (y, height) = kind.extent();
        let x = self.spawn_x();
        self.pool.allocate(Obstacle { id, kind, x, y, height, active: true, scored: false })
    }

    /// Scroll every active obstacle left by `dx`, recycle those past
    /// [`CULL_X`], mark newly passed ones and test each against `player`.
    pub fn advance(&mut self, dx: f32, player: &Rect) -> ObstacleStep {
        let mut step = ObstacleStep::default();
        for index in 0..self.pool.capacity() {
            let Some(item) = self.pool.get_mut(index) else { break };
            if !item.active {
                continue;
            }
            item.x -= dx;
            if item.x < CULL_X {
                self.pool.release(index);
                continue;
            }
            if !item.scored && item.x < SCORE_LINE_X {
                item.scored = true;
                step.passed += 1;
            }
            if aabb_intersect(player, &item.rect()) {
                step.hit = true;
            }
        }
        step
    }

    pub fn reset(&mut self) {
        let start = self.spawn_x();
        self.pool = SlotPool::new(OBSTACLE_POOL, |i| Obstacle::idle(i, start));
    }

    pub fn active(&self) -> impl Iterator<Item = &Obstacle> { self.pool.iter_active() }
    pub fn active_count(&self) -> usize { self.pool.active_count() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const FAR_AWAY: Rect = Rect { x: -1000.0, y: 0.0, width: 1.0, height: 1.0 };

    #[test]
    fn spawn_places_obstacle_off_stage() {
        let mut f = ObstacleField::new(900.0);
        f.spawn_kind(ObstacleKind::High);
        let o = f.active().next().copied().unwrap();
        assert_eq!(o.x, 1020.0);
        assert_eq!((o.y, o.height), (0.0, 84.0));
        f.spawn_kind(ObstacleKind::Low);
        let low = f.active().nth(1).copied().unwrap();
        assert_eq!((low.y, low.height), (82.0, 24.0));
    }

    #[test]
    fn pool_caps_live_obstacles() {
        let mut f = ObstacleField::new(900.0);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..OBSTACLE_POOL {
            assert!(f.spawn(&mut rng).is_some());
        }
        assert!(f.spawn(&mut rng).is_none());
    }

    #[test]
    fn obstacle_scores_once_then_culls() {
        let mut f = ObstacleField::new(900.0);
        f.spawn_kind(ObstacleKind::Low);
        // 1020 → 109, just past the score line
        let step = f.advance(911.0, &FAR_AWAY);
        assert_eq!(step.passed, 1);
        assert_eq!(f.advance(1.0, &FAR_AWAY).passed, 0);
        f.advance(200.0, &FAR_AWAY);
        assert_eq!(f.active_count(), 0);
        // freed slot is reused
        assert_eq!(f.spawn_kind(ObstacleKind::High), Some(0));
    }

    #[test]
    fn tall_obstacle_hits_grounded_player() {
        let mut f = ObstacleField::new(900.0);
        f.spawn_kind(ObstacleKind::High);
        let step = f.advance(1020.0 - PLAYER_X, &Rect::player(0.0));
        assert!(step.hit);
    }

    #[test]
    fn same_seed_same_sequence() {
        let kinds = |seed| {
            let mut f = ObstacleField::new(900.0);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            (0..OBSTACLE_POOL).filter_map(|_| f.spawn(&mut rng)).collect::<Vec<_>>()
        };
        assert_eq!(kinds(42), kinds(42));
    }
}
