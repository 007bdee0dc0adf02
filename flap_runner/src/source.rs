//! Pose-source boundary.
//!
//! A pose source runs on its own thread and talks to the frame loop only
//! through a [`PoseMessage`] channel. The frame loop never blocks on it:
//! each frame it drains whatever arrived and keeps the newest pose.
//!
//! [`PoseSupervisor`] owns the live feed plus a [`PoseWatchdog`] and
//! respawns the source when it goes silent.

use std::f32::consts::TAU;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use pose_signal::{KeypointName, RawKeypoint};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// ════════════════════════════════════════════════════════════════════════════
// Messages
// ════════════════════════════════════════════════════════════════════════════

/// One estimated pose, stamped in frame-loop milliseconds.
#[derive(Clone, Debug, PartialEq)]
pub struct PoseSample {
    pub keypoints:    Vec<RawKeypoint>,
    pub timestamp_ms: f64,
    /// Height of the camera frame the coordinates are in.
    pub frame_height: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PoseMessage {
    Pose(PoseSample),
    /// Recoverable estimator failure.
    Error { message: String },
    /// The source cannot run at all (no camera, permission denied).
    Unavailable { message: String },
}

// ════════════════════════════════════════════════════════════════════════════
// PoseSource trait + spawn helper
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`PoseMessage`]s over a channel. `run` returns
/// once the receiving side hangs up.
pub trait PoseSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<PoseMessage>);
}

/// Spawn a pose source on its own thread and return the receiving end.
pub fn spawn_pose_source<S: PoseSource>(source: S) -> PoseFeed {
    spawn_boxed(Box::new(source))
}

pub fn spawn_boxed(source: Box<dyn PoseSource>) -> PoseFeed {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || source.run(tx));
    PoseFeed::new(rx)
}

// ════════════════════════════════════════════════════════════════════════════
// PoseFeed
// ════════════════════════════════════════════════════════════════════════════

/// Everything drained from a feed in one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeedBatch {
    /// Newest pose; older ones from the same frame are dropped.
    pub latest:       Option<PoseSample>,
    /// New error messages. A message equal to the previous one is skipped.
    pub errors:       Vec<String>,
    pub unavailable:  Option<String>,
    /// Messages of any kind received.
    pub received:     usize,
    pub disconnected: bool,
}

pub struct PoseFeed {
    rx:         Receiver<PoseMessage>,
    last_error: Option<String>,
}

impl PoseFeed {
    pub fn new(rx: Receiver<PoseMessage>) -> Self {
        PoseFeed { rx, last_error: None }
    }

    /// Take everything already delivered without waiting.
    pub fn drain_latest(&mut self) -> FeedBatch {
        let mut batch = FeedBatch::default();
        loop {
            match self.rx.try_recv() {
                Ok(msg) => {
                    batch.received += 1;
                    match msg {
                        PoseMessage::Pose(sample) => batch.latest = Some(sample),
                        PoseMessage::Error { message } => {
                            if self.last_error.as_deref() != Some(message.as_str()) {
                                log::error!("pose source: {message}");
                                self.last_error = Some(message.clone());
                                batch.errors.push(message);
                            }
                        }
                        PoseMessage::Unavailable { message } => {
                            log::warn!("pose source unavailable: {message}");
                            batch.unavailable = Some(message);
                        }
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    batch.disconnected = true;
                    break;
                }
            }
        }
        batch
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PoseWatchdog
// ════════════════════════════════════════════════════════════════════════════

pub const STALE_AFTER_MS:   f64 = 2000.0;
pub const RESTART_AFTER_MS: f64 = 3500.0;
pub const RESTART_COOLDOWN_MS: f64 = 1000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchdogVerdict {
    Healthy,
    /// Quiet long enough that gameplay input is unreliable.
    Stale,
    /// Quiet long enough to respawn the source.
    Restart,
}

/// Tracks source silence. Any message counts as a sign of life.
#[derive(Clone, Debug)]
pub struct PoseWatchdog {
    last_message_ms: f64,
    last_restart_ms: Option<f64>,
}

impl PoseWatchdog {
    pub fn new(now_ms: f64) -> Self {
        PoseWatchdog { last_message_ms: now_ms, last_restart_ms: None }
    }

    pub fn record_message(&mut self, now_ms: f64) {
        self.last_message_ms = self.last_message_ms.max(now_ms);
    }

    pub fn check(&self, now_ms: f64) -> WatchdogVerdict {
        let silent = now_ms - self.last_message_ms;
        let cooled = self
            .last_restart_ms
            .map_or(true, |t| now_ms - t >= RESTART_COOLDOWN_MS);
        if silent > RESTART_AFTER_MS && cooled {
            WatchdogVerdict::Restart
        } else if silent > STALE_AFTER_MS {
            WatchdogVerdict::Stale
        } else {
            WatchdogVerdict::Healthy
        }
    }

    /// A fresh source gets a full silence budget.
    pub fn note_restart(&mut self, now_ms: f64) {
        self.last_restart_ms = Some(now_ms);
        self.last_message_ms = now_ms;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PoseSupervisor
// ════════════════════════════════════════════════════════════════════════════

pub type SourceFactory = Box<dyn FnMut() -> Box<dyn PoseSource>>;

/// Live feed + watchdog + respawn.
pub struct PoseSupervisor {
    factory:  SourceFactory,
    feed:     PoseFeed,
    watchdog: PoseWatchdog,
    restarts: u32,
    /// Set once the source reported it cannot run; no more respawns.
    given_up: bool,
}

impl PoseSupervisor {
    pub fn start(mut factory: SourceFactory, now_ms: f64) -> Self {
        let feed = spawn_boxed(factory());
        PoseSupervisor {
            factory,
            feed,
            watchdog: PoseWatchdog::new(now_ms),
            restarts: 0,
            given_up: false,
        }
    }

    /// Drain this frame's messages and restart the source if it stalled.
    pub fn poll(&mut self, now_ms: f64) -> FeedBatch {
        let batch = self.feed.drain_latest();
        if batch.received > 0 {
            self.watchdog.record_message(now_ms);
        }
        if batch.unavailable.is_some() {
            self.given_up = true;
        }
        if !self.given_up && self.watchdog.check(now_ms) == WatchdogVerdict::Restart {
            self.restart(now_ms);
        }
        batch
    }

    pub fn restart(&mut self, now_ms: f64) {
        self.restarts += 1;
        log::warn!("pose source silent, restarting (restart #{})", self.restarts);
        self.feed = spawn_boxed((self.factory)());
        self.watchdog.note_restart(now_ms);
    }

    pub fn restarts(&self) -> u32 { self.restarts }
}

// ════════════════════════════════════════════════════════════════════════════
// NullPoseSource
// ════════════════════════════════════════════════════════════════════════════

/// Reports that no camera is available and exits.
pub struct NullPoseSource {
    pub message: String,
}

impl PoseSource for NullPoseSource {
    fn run(self: Box<Self>, tx: Sender<PoseMessage>) {
        let _ = tx.send(PoseMessage::Unavailable { message: self.message });
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimPoseSource: keyboard-driven skeleton
// ════════════════════════════════════════════════════════════════════════════

/// Arm posture requested by the window, sent every frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimArm {
    pub raised:   bool,
    pub waving:   bool,
    /// Wrist hidden from the camera.
    pub occluded: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimInput {
    Arm(SimArm),
    /// Stop emitting without exiting, like a hung estimator.
    Stall,
}

/// Shared slot holding the sender of the current simulated source. A
/// respawned source takes over the slot; the old one sees its channel close
/// and exits.
#[derive(Clone, Default)]
pub struct SimLink {
    tx: Arc<Mutex<Option<Sender<SimInput>>>>,
}

impl SimLink {
    pub fn new() -> Self { SimLink::default() }

    pub fn send(&self, input: SimInput) {
        let slot = self.tx.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(tx) = slot.as_ref() {
            let _ = tx.send(input);
        }
    }

    pub fn connect(&self) -> Receiver<SimInput> {
        let (tx, rx) = mpsc::channel();
        *self.tx.lock().unwrap_or_else(|p| p.into_inner()) = Some(tx);
        rx
    }
}

// wrist height targets as a fraction of frame height
const SIM_WRIST_LOW:   f32 = 0.85;
const SIM_WRIST_HIGH:  f32 = 0.2;
const SIM_SHOULDER:    f32 = 0.42;
// The arm is a damped spring: a fast raise flicks past the target, then
// settles.
const SIM_ARM_OMEGA:   f32 = 30.0;
const SIM_ARM_DAMPING: f32 = 0.45;
const SIM_SUBSTEP_S:   f32 = 0.002;
/// Longer gaps (a stall) are not replayed.
const SIM_MAX_GAP_S:   f32 = 0.5;
const SIM_WAVE_HZ:     f32 = 3.0;
const SIM_WAVE_PX:     f32 = 60.0;
const SIM_JITTER_PX:   f32 = 1.5;

/// Synthetic 17-point skeleton standing at the center of the frame.
#[derive(Clone, Debug)]
pub struct SimSkeleton {
    width:   f32,
    height:  f32,
    wrist_y:  f32,
    wrist_vy: f32,
    rng:      ChaCha8Rng,
}

impl SimSkeleton {
    pub fn new(width: f32, height: f32, seed: u64) -> Self {
        SimSkeleton {
            width,
            height,
            wrist_y:  SIM_WRIST_LOW * height,
            wrist_vy: 0.0,
            rng:      ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Pose at time `t_s`, `dt_s` after the previous call.
    pub fn step(&mut self, arm: SimArm, t_s: f32, dt_s: f32) -> Vec<RawKeypoint> {
        let target_frac = if arm.raised {
            SIM_WRIST_HIGH
        } else if arm.waving {
            // the arm sags a little while waving
            SIM_WRIST_LOW + 0.05
        } else {
            SIM_WRIST_LOW
        };
        let target = target_frac * self.height;
        let mut left = if dt_s.is_finite() { dt_s.clamp(0.0, SIM_MAX_GAP_S) } else { 0.0 };
        while left > 0.0 {
            let h = left.min(SIM_SUBSTEP_S);
            let accel = SIM_ARM_OMEGA * SIM_ARM_OMEGA * (target - self.wrist_y)
                - 2.0 * SIM_ARM_DAMPING * SIM_ARM_OMEGA * self.wrist_vy;
            self.wrist_vy += accel * h;
            self.wrist_y += self.wrist_vy * h;
            left -= h;
        }

        let cx = self.width * 0.5;
        let h = self.height;
        let wave = if arm.waving { SIM_WAVE_PX * (TAU * SIM_WAVE_HZ * t_s).sin() } else { 0.0 };
        let wrist_x = cx + 70.0 + wave;
        let elbow_y = (h * SIM_SHOULDER + self.wrist_y) * 0.5;
        let wrist_score = if arm.occluded { 0.01 } else { 0.9 };

        KeypointName::ALL
            .iter()
            .map(|&name| {
                let (x, y, score) = match name {
                    KeypointName::Nose          => (cx, h * 0.22, 0.95),
                    KeypointName::LeftEye       => (cx + 8.0, h * 0.2, 0.9),
                    KeypointName::RightEye      => (cx - 8.0, h * 0.2, 0.9),
                    KeypointName::LeftEar       => (cx + 16.0, h * 0.21, 0.8),
                    KeypointName::RightEar      => (cx - 16.0, h * 0.21, 0.8),
                    KeypointName::LeftShoulder  => (cx + 45.0, h * SIM_SHOULDER, 0.9),
                    KeypointName::RightShoulder => (cx - 45.0, h * SIM_SHOULDER, 0.9),
                    KeypointName::LeftElbow     => (cx + 60.0 + wave * 0.5, elbow_y, 0.85),
                    KeypointName::RightElbow    => (cx - 60.0, h * 0.6, 0.85),
                    KeypointName::LeftWrist     => (wrist_x, self.wrist_y, wrist_score),
                    KeypointName::RightWrist    => (cx - 65.0, h * 0.78, 0.03),
                    KeypointName::LeftHip       => (cx + 30.0, h * 0.8, 0.7),
                    KeypointName::RightHip      => (cx - 30.0, h * 0.8, 0.7),
                    _                           => (cx, h, 0.02),
                };
                let jx = self.rng.gen_range(-SIM_JITTER_PX..=SIM_JITTER_PX);
                let jy = self.rng.gen_range(-SIM_JITTER_PX..=SIM_JITTER_PX);
                RawKeypoint::new(name.as_str(), x + jx, y + jy, score)
            })
            .collect()
    }
}

/// Stands in for the camera + pose model. Follows the arm posture the
/// window sends and emits one pose every `interval`.
pub struct SimPoseSource {
    rx:       Receiver<SimInput>,
    epoch:    Instant,
    interval: Duration,
    skeleton: SimSkeleton,
}

impl SimPoseSource {
    /// `epoch` must be the frame loop's clock origin so timestamps line up.
    pub fn new(rx: Receiver<SimInput>, epoch: Instant, interval: Duration, skeleton: SimSkeleton) -> Self {
        SimPoseSource { rx, epoch, interval, skeleton }
    }
}

impl PoseSource for SimPoseSource {
    fn run(mut self: Box<Self>, tx: Sender<PoseMessage>) {
        let mut arm = SimArm::default();
        let mut stalled = false;
        let mut last = self.epoch.elapsed().as_secs_f32();
        loop {
            loop {
                match self.rx.try_recv() {
                    Ok(SimInput::Arm(a)) => arm = a,
                    Ok(SimInput::Stall) => {
                        log::info!("simulated pose source stalled");
                        stalled = true;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return,
                }
            }
            if !stalled {
                let now = self.epoch.elapsed();
                let t = now.as_secs_f32();
                let keypoints = self.skeleton.step(arm, t, t - last);
                last = t;
                let sample = PoseSample {
                    keypoints,
                    timestamp_ms: now.as_secs_f64() * 1000.0,
                    frame_height: self.skeleton.height,
                };
                if tx.send(PoseMessage::Pose(sample)).is_err() {
                    return;
                }
            }
            thread::sleep(self.interval);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
