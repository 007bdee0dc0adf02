//! Top-level frame loop.
//!
//! `run` wires the pose source, the [`GameSession`] and the visualizer
//! together and drives them at the window's refresh rate. Everything in
//! between (store selection, source factory, command dispatch, toast
//! bookkeeping) is split into small functions the tests call directly.

use std::path::Path;
use std::time::{Duration, Instant};

use gesture_engine::Gesture;

use crate::config::{PoseSourceKind, RunnerConfig};
use crate::session::{GameSession, SessionPhase};
use crate::source::{
    FeedBatch, NullPoseSource, PoseSource, PoseSupervisor, SimLink, SimPoseSource, SimSkeleton,
    SourceFactory,
};
use crate::store::{JsonFileStore, MemoryStore, ScoreStore};
use crate::visualizer::{UiCommand, Visualizer};

/// How long a notice stays in the status bar.
pub const TOAST_MS: f64 = 3500.0;

const NO_CAMERA: &str = "Camera permissions denied or unavailable.";

// ════════════════════════════════════════════════════════════════════════════
// Wiring helpers
// ════════════════════════════════════════════════════════════════════════════

pub fn open_store(path: Option<&Path>) -> Box<dyn ScoreStore> {
    match path {
        Some(p) => {
            log::info!("progress file: {}", p.display());
            Box::new(JsonFileStore::open(p))
        }
        None => Box::new(MemoryStore::new()),
    }
}

/// Builds a fresh pose source each time the supervisor (re)starts one.
pub fn source_factory(cfg: &RunnerConfig, epoch: Instant, link: SimLink) -> SourceFactory {
    match cfg.pose_source {
        PoseSourceKind::Simulated => {
            let (w, h, seed) = (cfg.frame_width, cfg.frame_height, cfg.seed);
            let interval = Duration::from_millis(cfg.sim_frame_interval_ms.max(1));
            let mut generation = 0u64;
            Box::new(move || {
                generation += 1;
                let skeleton = SimSkeleton::new(w, h, seed.wrapping_add(generation));
                Box::new(SimPoseSource::new(link.connect(), epoch, interval, skeleton)) as Box<dyn PoseSource>
            })
        }
        PoseSourceKind::None => Box::new(|| {
            Box::new(NullPoseSource { message: NO_CAMERA.to_string() }) as Box<dyn PoseSource>
        }),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Toast
// ════════════════════════════════════════════════════════════════════════════

/// Status-bar text: a transient notice over a persistent hint.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Toast {
    text:     Option<String>,
    until_ms: f64,
}

impl Toast {
    pub fn show(&mut self, text: impl Into<String>, now_ms: f64) {
        self.text = Some(text.into());
        self.until_ms = now_ms + TOAST_MS;
    }

    pub fn current(&mut self, now_ms: f64) -> Option<&str> {
        if now_ms >= self.until_ms {
            self.text = None;
        }
        self.text.as_deref()
    }
}

/// Fold one frame's feed into the session; returns notices for the toast.
pub fn apply_feed(session: &mut GameSession, batch: FeedBatch) -> Vec<String> {
    if let Some(sample) = batch.latest {
        session.ingest_pose(sample);
    }
    if let Some(message) = batch.unavailable.as_deref() {
        session.input_unavailable(message);
    }
    batch.errors
}

/// Apply a keyboard command. Returns `false` to quit.
pub fn apply_command(session: &mut GameSession, cmd: UiCommand, now_ms: f64) -> bool {
    match cmd {
        UiCommand::ToggleInput => {
            let on = !session.using_manual_input();
            session.set_manual_input(on);
        }
        UiCommand::Jump => { session.manual_intent(Gesture::Jump); }
        UiCommand::Flap => { session.manual_intent(Gesture::Flap); }
        UiCommand::Resume => { session.resume(now_ms); }
        UiCommand::Replay => {
            if session.phase() != SessionPhase::Calibrating {
                session.replay();
            }
        }
        UiCommand::Recalibrate => session.recalibrate(),
        UiCommand::SkipCalibration => { session.skip_calibration(); }
        UiCommand::Quit => return false,
    }
    true
}

fn status_hint(session: &GameSession) -> &'static str {
    match session.phase() {
        SessionPhase::Calibrating => "CALIBRATING",
        SessionPhase::Running if session.using_manual_input() => "SPACE TO JUMP, F TO FLAP",
        SessionPhase::Running => "RAISE YOUR ARM FAST TO JUMP, WAVE TO FLAP",
        SessionPhase::Paused(_) => "PAUSED",
        SessionPhase::GameOver => "GAME OVER",
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run(): the main application loop
// ════════════════════════════════════════════════════════════════════════════

pub fn run(cfg: RunnerConfig) -> Result<(), String> {
    cfg.validate().map_err(|e| e.to_string())?;
    let epoch = Instant::now();
    let now = || epoch.elapsed().as_secs_f64() * 1000.0;

    let link = SimLink::new();
    let mut supervisor = PoseSupervisor::start(source_factory(&cfg, epoch, link.clone()), now());
    let mut vis = Visualizer::new(cfg.window_width, cfg.window_height, cfg.stage_width, link)?;
    let mut session = GameSession::new(&cfg, open_store(cfg.store_path.as_deref()));
    let mut toast = Toast::default();
    let mut last_ms = now();

    while vis.is_open() {
        let now_ms = now();

        // 1. Keyboard
        for cmd in vis.poll_input() {
            if !apply_command(&mut session, cmd, now_ms) {
                return Ok(());
            }
        }

        // 2. Pose feed
        for notice in apply_feed(&mut session, supervisor.poll(now_ms)) {
            toast.show(notice, now_ms);
        }

        // 3. Per-frame logic
        let dt = ((now_ms - last_ms) / 1000.0) as f32;
        last_ms = now_ms;
        let report = session.tick(dt, now_ms);
        if report.game_over && supervisor.restarts() > 0 {
            log::info!("pose source was restarted {} times this session", supervisor.restarts());
        }
        for notice in session.take_notices() {
            toast.show(notice, now_ms);
        }

        // 4. Render
        let status = toast.current(now_ms).map(str::to_string);
        vis.render(&session, now_ms, status.as_deref().unwrap_or_else(|| status_hint(&session)))?;
    }

    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
