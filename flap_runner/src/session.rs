//! Per-session frame pipeline.
//!
//! `GameSession` owns every piece of mutable game state and advances it once
//! per display frame:
//!
//! ```text
//!   tick(dt, now)
//!     ├─ Calibrating : timeout check, offer one wrist sample
//!     ├─ Paused / GameOver : nothing
//!     └─ Running :
//!          game-over deadline → liveness → slow motion → scroll
//!          → gesture (keyboard intent or classifier) → impulse / burst / combo
//!          → integrate → shake → spawn → obstacles (score, collide) → particles
//! ```
//!
//! Poses arrive separately through [`GameSession::ingest_pose`]; a tick only
//! ever reads the newest one already delivered. A fault inside a running tick
//! pauses the session instead of propagating.

use gesture_engine::{
    default_result, CalibrationEngine, CalibrationEvent, CalibrationOutcome, CalibrationPhase,
    CalibrationProgress, Gesture, GestureClassifier, GestureInput, GestureMode, OutcomeOrigin,
    PoseThresholds,
};
use pose_signal::{Pose, PoseSignals, PoseSmoother, WristTracker};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use runner_physics::{
    integrate_jump, ComboTracker, JumpState, Obstacle, ObstacleField, ObstacleKind, Particle,
    ParticleField, Rect, ScoreBoard, Shake, SpawnTimer, EMIT_ORIGIN, FLAP_BURST, GRAVITY,
    JUMP_BURST, JUMP_IMPULSE, WORLD_SPEED,
};
use serde::Serialize;
use thiserror::Error;

use crate::config::RunnerConfig;
use crate::source::PoseSample;
use crate::store::ScoreStore;

/// No usable pose for this long pauses gameplay.
pub const POSE_STALE_MS:      f64 = 2000.0;
pub const SLOW_MO_FACTOR:     f32 = 0.35;
pub const SLOW_MO_MS:         f64 = 500.0;
pub const GAME_OVER_DELAY_MS: f64 = 520.0;
/// Longest step simulated in one tick, seconds.
pub const MAX_TICK_S:         f32 = 0.1;

const FAULT_NOTICE:   &str = "Something went wrong. Please try again.";
const TIMEOUT_NOTICE: &str = "Calibration timed out. Using fallback thresholds.";

// ════════════════════════════════════════════════════════════════════════════
// Phase / report types
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PauseReason {
    CameraLost,
    UnexpectedError,
}

impl PauseReason {
    pub fn label(&self) -> &'static str {
        match self {
            PauseReason::CameraLost      => "Camera lost",
            PauseReason::UnexpectedError => "Unexpected error",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    Calibrating,
    /// Includes the short dying stretch between a hit and game over.
    Running,
    Paused(PauseReason),
    GameOver,
}

/// Something inside a running tick went wrong.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum TickFault {
    #[error("frame delta {0} is not a finite, non-negative number")]
    BadDelta(f32),
    #[error("frame timestamp {0} is not finite")]
    BadTimestamp(f64),
    #[error("{0} became non-finite")]
    NonFinite(&'static str),
}

/// What one tick did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// The world advanced this tick.
    pub simulated:    bool,
    pub gesture:      Option<Gesture>,
    /// Vertical velocity given to the runner by a jump this tick.
    pub jump_impulse: Option<f32>,
    pub landed:       bool,
    pub spawned:      Option<ObstacleKind>,
    /// Obstacles scored this tick.
    pub passed:       u32,
    /// First collision of this life.
    pub hit:          bool,
    pub game_over:    bool,
    pub paused:       Option<PauseReason>,
    pub calibration:  Option<CalibrationEvent>,
    pub fault:        Option<TickFault>,
}

/// Read-only view for the renderer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub phase:           SessionPhase,
    pub player:          JumpState,
    pub score:           ScoreBoard,
    pub combo:           f32,
    pub world_x:         f32,
    pub shake_x:         f32,
    pub slow_motion:     bool,
    /// Between the hit and game over.
    pub hit_flash:       bool,
    pub manual_input:    bool,
    /// Last non-idle gesture and when it fired.
    pub last_gesture:    Gesture,
    pub last_gesture_ms: Option<f64>,
    pub gesture_mode:    GestureMode,
    pub confidence:      f32,
    pub signals:         PoseSignals,
    pub thresholds:      Option<PoseThresholds>,
    pub calibration:     Option<CalibrationProgress>,
}

// ════════════════════════════════════════════════════════════════════════════
// GameSession
// ════════════════════════════════════════════════════════════════════════════

pub struct GameSession {
    phase:            SessionPhase,
    store:            Box<dyn ScoreStore>,

    // ── input ────────────────────────────────────────────────────────────
    smoother:         PoseSmoother,
    tracker:          WristTracker,
    signals:          PoseSignals,
    source_ready:     bool,
    last_pose_ms:     Option<f64>,
    manual:           bool,
    pending_intent:   Option<Gesture>,

    // ── calibration / classification ─────────────────────────────────────
    thresholds:       Option<PoseThresholds>,
    calibration:      Option<CalibrationEngine>,
    classifier:       GestureClassifier,
    last_gesture:     Gesture,
    last_gesture_ms:  Option<f64>,

    // ── world ────────────────────────────────────────────────────────────
    player:           JumpState,
    world_x:          f32,
    obstacles:        ObstacleField,
    particles:        ParticleField,
    spawn:            SpawnTimer,
    combo:            ComboTracker,
    board:            ScoreBoard,
    shake:            Shake,
    shake_x:          f32,
    hit_lock:         bool,
    slow_mo_until_ms: Option<f64>,
    game_over_at_ms:  Option<f64>,
    last_tick_ms:     f64,
    rng:              ChaCha8Rng,

    notices:          Vec<String>,
}

impl GameSession {
    /// Calibrates first unless the store already has thresholds.
    pub fn new(config: &RunnerConfig, store: Box<dyn ScoreStore>) -> Self {
        let thresholds = store.load_thresholds();
        let high_score = store.load_high_score();
        let phase = if thresholds.is_some() { SessionPhase::Running } else { SessionPhase::Calibrating };
        log::info!(
            "session start: {}, high score {}",
            if thresholds.is_some() { "stored thresholds" } else { "calibration needed" },
            high_score,
        );
        GameSession {
            phase,
            store,
            smoother:         PoseSmoother::default(),
            tracker:          WristTracker::default(),
            signals:          PoseSignals::default(),
            source_ready:     false,
            last_pose_ms:     None,
            manual:           config.manual_input,
            pending_intent:   None,
            thresholds,
            calibration:      None,
            classifier:       GestureClassifier::new(config.gesture, 0.0),
            last_gesture:     Gesture::Idle,
            last_gesture_ms:  None,
            player:           JumpState::GROUNDED,
            world_x:          0.0,
            obstacles:        ObstacleField::new(config.stage_width),
            particles:        ParticleField::new(),
            spawn:            SpawnTimer::new(),
            combo:            ComboTracker::new(),
            board:            ScoreBoard::new(high_score),
            shake:            Shake::default(),
            shake_x:          0.0,
            hit_lock:         false,
            slow_mo_until_ms: None,
            game_over_at_ms:  None,
            last_tick_ms:     0.0,
            rng:              ChaCha8Rng::seed_from_u64(config.seed),
            notices:          Vec::new(),
        }
    }

    // ── input ─────────────────────────────────────────────────────────────

    /// Fold one delivered pose into the wrist signals.
    pub fn ingest_pose(&mut self, sample: PoseSample) {
        self.source_ready = true;
        let raw = Pose::from_raw(&sample.keypoints);
        let pose = self.smoother.push(&raw);
        self.signals = self.tracker.observe(&raw, pose, sample.frame_height);

        if self.signals.has_pose && sample.timestamp_ms.is_finite() {
            let ts = sample.timestamp_ms;
            self.last_pose_ms = Some(self.last_pose_ms.map_or(ts, |t| t.max(ts)));
            if self.phase == SessionPhase::Paused(PauseReason::CameraLost) {
                log::info!("pose is back, resuming");
                self.phase = SessionPhase::Running;
            }
        }
    }

    pub fn set_manual_input(&mut self, on: bool) {
        if self.manual != on {
            log::info!("input: {}", if on { "keyboard" } else { "gestures" });
        }
        self.manual = on;
        self.pending_intent = None;
        if on && self.phase == SessionPhase::Paused(PauseReason::CameraLost) {
            self.phase = SessionPhase::Running;
        }
    }

    /// Queue a keyboard command for the next running tick. Ignored unless
    /// keyboard input is active.
    pub fn manual_intent(&mut self, gesture: Gesture) -> bool {
        if !self.manual {
            return false;
        }
        if gesture != Gesture::Idle {
            self.pending_intent = Some(gesture);
        }
        true
    }

    /// The pose source cannot run: tell the player and fall back to the
    /// keyboard. Thresholds picked here are not saved.
    pub fn input_unavailable(&mut self, message: &str) {
        log::warn!("input unavailable: {message}");
        self.notices.push(format!("{message} Switched to keyboard controls."));
        self.set_manual_input(true);
        if self.phase == SessionPhase::Calibrating {
            let outcome = CalibrationOutcome { result: default_result(), origin: OutcomeOrigin::Skipped };
            self.finish_calibration(outcome, false);
        }
    }

    // ── menu actions ──────────────────────────────────────────────────────

    pub fn resume(&mut self, now_ms: f64) -> bool {
        if !matches!(self.phase, SessionPhase::Paused(_)) {
            return false;
        }
        self.last_pose_ms = Some(now_ms);
        self.phase = SessionPhase::Running;
        log::info!("resumed");
        true
    }

    /// Start a fresh run. Also what "quit" in the pause menu does.
    pub fn replay(&mut self) {
        self.reset_run();
        if matches!(self.phase, SessionPhase::Paused(_) | SessionPhase::GameOver) {
            self.phase = SessionPhase::Running;
        }
        log::info!("new run");
    }

    /// Forget the stored thresholds and calibrate again.
    pub fn recalibrate(&mut self) {
        self.store.clear_thresholds();
        self.thresholds = None;
        self.calibration = None;
        self.reset_run();
        self.phase = SessionPhase::Calibrating;
        log::info!("recalibrating");
    }

    /// "Use defaults".
    pub fn skip_calibration(&mut self) -> bool {
        if self.phase != SessionPhase::Calibrating {
            return false;
        }
        let outcome = self
            .calibration
            .as_mut()
            .and_then(CalibrationEngine::skip)
            .unwrap_or(CalibrationOutcome { result: default_result(), origin: OutcomeOrigin::Skipped });
        self.finish_calibration(outcome, true);
        true
    }

    // ── tick ──────────────────────────────────────────────────────────────

    pub fn tick(&mut self, dt_s: f32, now_ms: f64) -> TickReport {
        let mut report = TickReport::default();
        match self.phase {
            SessionPhase::Calibrating => {
                report.calibration = self.tick_calibration(now_ms);
                return report;
            }
            SessionPhase::Paused(_) | SessionPhase::GameOver => return report,
            SessionPhase::Running => {}
        }

        if let Err(fault) = self.step(dt_s, now_ms, &mut report) {
            log::error!("tick failed, pausing: {fault}");
            self.phase = SessionPhase::Paused(PauseReason::UnexpectedError);
            self.notices.push(FAULT_NOTICE.to_string());
            report.paused = Some(PauseReason::UnexpectedError);
            report.fault = Some(fault);
        }
        report
    }

    fn tick_calibration(&mut self, now_ms: f64) -> Option<CalibrationEvent> {
        // the clock starts once the pose source has produced something
        if !self.source_ready || !now_ms.is_finite() {
            return None;
        }
        let signals = self.signals;
        let event = {
            let engine = self.calibration.get_or_insert_with(|| CalibrationEngine::new(now_ms));
            match engine.poll_timeout(now_ms) {
                Some(outcome) => CalibrationEvent::Completed(outcome),
                None => engine.offer_sample(signals.wrist_y, signals.has_pose, signals.has_wrist, now_ms),
            }
        };
        if let CalibrationEvent::Completed(outcome) = event {
            self.finish_calibration(outcome, true);
        }
        Some(event)
    }

    fn finish_calibration(&mut self, outcome: CalibrationOutcome, persist: bool) {
        let thresholds = outcome.result.thresholds;
        self.thresholds = Some(thresholds);
        if persist {
            self.store.save_thresholds(&thresholds);
            if outcome.origin != OutcomeOrigin::Skipped {
                self.store.save_stats(&outcome.result.stats);
            }
        }
        if outcome.origin == OutcomeOrigin::TimedOut {
            self.notices.push(TIMEOUT_NOTICE.to_string());
        }
        self.calibration = None;
        self.reset_run();
        self.phase = SessionPhase::Running;
    }

    fn step(&mut self, dt_s: f32, now_ms: f64, report: &mut TickReport) -> Result<(), TickFault> {
        if !(dt_s.is_finite() && dt_s >= 0.0) {
            return Err(TickFault::BadDelta(dt_s));
        }
        if !now_ms.is_finite() {
            return Err(TickFault::BadTimestamp(now_ms));
        }
        let dt = dt_s.min(MAX_TICK_S);
        self.last_tick_ms = now_ms;

        if let Some(at) = self.game_over_at_ms {
            if now_ms >= at {
                log::info!("game over: score {:.1}, distance {}", self.board.score, self.board.distance);
                self.phase = SessionPhase::GameOver;
                report.game_over = true;
                return Ok(());
            }
        }

        if !self.manual {
            let last = *self.last_pose_ms.get_or_insert(now_ms);
            if now_ms - last > POSE_STALE_MS {
                log::warn!("no pose for {:.0} ms, pausing", now_ms - last);
                self.phase = SessionPhase::Paused(PauseReason::CameraLost);
                report.paused = Some(PauseReason::CameraLost);
                return Ok(());
            }
        }
        report.simulated = true;

        let slow = self.slow_mo_until_ms.map_or(false, |t| now_ms < t);
        let dt = if slow { dt * SLOW_MO_FACTOR } else { dt };

        self.world_x += WORLD_SPEED * dt;
        self.board.set_distance(self.world_x);

        let gesture = self.resolve_gesture(now_ms);
        report.gesture = Some(gesture);
        match gesture {
            Gesture::Jump => {
                if self.player.apply_impulse(JUMP_IMPULSE) {
                    self.combo.record_jump(now_ms);
                    self.particles.emit(EMIT_ORIGIN, JUMP_BURST, &mut self.rng);
                    report.jump_impulse = Some(JUMP_IMPULSE);
                }
            }
            Gesture::Flap => {
                self.shake.trigger();
                self.particles.emit(EMIT_ORIGIN, FLAP_BURST, &mut self.rng);
            }
            Gesture::Idle => {}
        }
        if gesture != Gesture::Idle {
            log::debug!("gesture {} at {:.0} ms", gesture.name(), now_ms);
            self.last_gesture = gesture;
            self.last_gesture_ms = Some(now_ms);
        }
        self.combo.decay(now_ms);

        let was_grounded = self.player.grounded;
        self.player = integrate_jump(self.player, dt, GRAVITY);
        if !self.player.is_finite() {
            return Err(TickFault::NonFinite("runner position"));
        }
        report.landed = self.player.grounded && !was_grounded;

        let magnitude = self.shake.tick(dt);
        self.shake_x = if magnitude > 0.0 { (self.rng.gen::<f32>() - 0.5) * magnitude } else { 0.0 };

        if self.spawn.tick(dt, self.world_x) {
            report.spawned = self.obstacles.spawn(&mut self.rng);
        }

        let step = self.obstacles.advance(WORLD_SPEED * dt, &Rect::player(self.player.y));
        report.passed = step.passed;
        for _ in 0..step.passed {
            if let Some(best) = self.board.award(self.combo.combo()) {
                self.store.save_high_score(best);
            }
        }
        if !self.board.score.is_finite() {
            return Err(TickFault::NonFinite("score"));
        }
        if step.hit && !self.hit_lock {
            log::info!("hit at distance {}", self.board.distance);
            self.hit_lock = true;
            self.slow_mo_until_ms = Some(now_ms + SLOW_MO_MS);
            self.game_over_at_ms = Some(now_ms + GAME_OVER_DELAY_MS);
            report.hit = true;
        }

        self.particles.advance(dt);
        Ok(())
    }

    fn resolve_gesture(&mut self, now_ms: f64) -> Gesture {
        if self.manual {
            return self.pending_intent.take().unwrap_or(Gesture::Idle);
        }
        let input = GestureInput::from_signals(&self.signals, self.thresholds, now_ms);
        self.classifier.update(&input)
    }

    fn reset_run(&mut self) {
        self.player = JumpState::GROUNDED;
        self.world_x = 0.0;
        self.obstacles.reset();
        self.particles.reset();
        self.spawn.reset();
        self.combo.reset();
        self.board.reset();
        self.shake.reset();
        self.shake_x = 0.0;
        self.hit_lock = false;
        self.slow_mo_until_ms = None;
        self.game_over_at_ms = None;
        self.pending_intent = None;
        self.classifier.reset(self.last_tick_ms);
        self.last_gesture = Gesture::Idle;
        self.last_gesture_ms = None;
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn phase(&self) -> SessionPhase { self.phase }
    pub fn player(&self) -> &JumpState { &self.player }
    pub fn board(&self) -> &ScoreBoard { &self.board }
    pub fn combo(&self) -> f32 { self.combo.combo() }
    pub fn thresholds(&self) -> Option<PoseThresholds> { self.thresholds }
    pub fn signals(&self) -> &PoseSignals { &self.signals }
    pub fn using_manual_input(&self) -> bool { self.manual }
    pub fn world_x(&self) -> f32 { self.world_x }
    pub fn obstacles(&self) -> impl Iterator<Item = &Obstacle> { self.obstacles.active() }
    pub fn particles(&self) -> impl Iterator<Item = &Particle> { self.particles.live() }

    /// Force an obstacle onto the stage (scripted runs and tests).
    pub fn spawn_obstacle(&mut self, kind: ObstacleKind) -> bool {
        self.obstacles.spawn_kind(kind).is_some()
    }

    pub fn calibration_progress(&self) -> Option<CalibrationProgress> {
        if self.phase != SessionPhase::Calibrating {
            return None;
        }
        Some(self.calibration.as_ref().map_or(
            CalibrationProgress { phase: CalibrationPhase::Low, low: 0.0, high: 0.0 },
            CalibrationEngine::progress,
        ))
    }

    /// Notices for the player since the last call.
    pub fn take_notices(&mut self) -> Vec<String> { std::mem::take(&mut self.notices) }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase:           self.phase,
            player:          self.player,
            score:           self.board,
            combo:           self.combo.combo(),
            world_x:         self.world_x,
            shake_x:         self.shake_x,
            slow_motion:     self.slow_mo_until_ms.map_or(false, |t| self.last_tick_ms < t),
            hit_flash:       self.hit_lock && self.phase != SessionPhase::GameOver,
            manual_input:    self.manual,
            last_gesture:    self.last_gesture,
            last_gesture_ms: self.last_gesture_ms,
            gesture_mode:    self.classifier.state().mode,
            confidence:      self.classifier.confidence(self.signals.wrist_y, self.thresholds.as_ref()),
            signals:         self.signals,
            thresholds:      self.thresholds,
            calibration:     self.calibration_progress(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
