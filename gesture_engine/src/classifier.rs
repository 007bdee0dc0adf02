//! Gesture classification state machine.
//!
//! [`update_gesture`] is a pure transition `(state, input) → (state, gesture)`
//! called once per simulation tick. [`GestureClassifier`] is the owning
//! wrapper the frame pipeline keeps per session.
//!
//! ## Rules, in evaluation order
//!
//! 1. No pose or no wrist → `Idle`, mode forced to idle, nothing else changes.
//! 2. **Jump**: wrist at or above the jump line (`y ≤ jump`) less than
//!    `jump_window_ms` after it was last seen in the rest zone (`y > idle`).
//!    A slow raise runs out the window and yields nothing.
//! 3. **Flap** (only if rule 2 did not fire): arm low (`y ≥ idle`) and
//!    `|vx| > flap_velocity`. Each new nonzero direction counts one cycle;
//!    the third cycle and every one after emits `Flap`.
//! 4. Cycles older than `flap_decay_ms` are forgotten.

use serde::{Deserialize, Serialize};

use pose_signal::PoseSignals;

use crate::thresholds::PoseThresholds;

/// Horizontal wrist speed (px/s) a wave must exceed.
pub const DEFAULT_FLAP_VELOCITY: f32 = 200.0;

/// Speed above the flap threshold at which flap confidence saturates.
const FLAP_CONFIDENCE_SPAN: f32 = 300.0;

// ════════════════════════════════════════════════════════════════════════════
// Gesture / GestureMode
// ════════════════════════════════════════════════════════════════════════════

/// Discrete command emitted each tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gesture {
    Idle,
    Jump,
    Flap,
}

impl Gesture {
    pub fn name(&self) -> &'static str {
        match self {
            Gesture::Idle => "idle",
            Gesture::Jump => "jump",
            Gesture::Flap => "flap",
        }
    }
}

/// Classifier mode after a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureMode {
    Idle,
    /// Wrist has left the rest zone and a jump is still reachable.
    Raising,
    Jump,
    Flapping,
}

// ════════════════════════════════════════════════════════════════════════════
// Tuning
// ════════════════════════════════════════════════════════════════════════════

/// Product-tuned constants. Keep the defaults unless play-testing says
/// otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureTuning {
    pub jump_window_ms: f64,
    pub flap_velocity:  f32,
    pub flap_reversals: u32,
    pub flap_decay_ms:  f64,
    /// Added to the shoulder Y for the uncalibrated idle line.
    pub idle_offset:    f32,
    /// Added to the shoulder Y for the uncalibrated jump line.
    pub jump_offset:    f32,
    /// Floor on the velocity time step, seconds.
    pub min_dt_s:       f64,
}

impl Default for GestureTuning {
    fn default() -> Self {
        GestureTuning {
            jump_window_ms: 300.0,
            flap_velocity:  DEFAULT_FLAP_VELOCITY,
            flap_reversals: 3,
            flap_decay_ms:  1000.0,
            idle_offset:    0.1,
            jump_offset:    -0.05,
            min_dt_s:       0.001,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// State / input / output
// ════════════════════════════════════════════════════════════════════════════

/// Per-session classifier memory. Timestamps are milliseconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureState {
    pub mode:               GestureMode,
    pub last_timestamp_ms:  f64,
    /// Last tick the wrist was in the rest zone.
    pub last_above_idle_ms: Option<f64>,
    pub last_wrist_x:       f32,
    pub last_velocity_sign: i8,
    pub flap_cycles:        u32,
    pub last_flap_ms:       Option<f64>,
}

impl GestureState {
    pub fn new(timestamp_ms: f64) -> Self {
        GestureState {
            mode:               GestureMode::Idle,
            last_timestamp_ms:  timestamp_ms,
            last_above_idle_ms: None,
            last_wrist_x:       0.0,
            last_velocity_sign: 0,
            flap_cycles:        0,
            last_flap_ms:       None,
        }
    }
}

/// Everything one tick of classification looks at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureInput {
    /// Normalized wrist Y of this frame.
    pub wrist_y:      f32,
    /// Filtered wrist X in pixels.
    pub wrist_x:      f32,
    pub shoulder_y:   f32,
    pub thresholds:   Option<PoseThresholds>,
    pub has_pose:     bool,
    pub has_wrist:    bool,
    pub timestamp_ms: f64,
}

impl GestureInput {
    pub fn from_signals(
        signals:      &PoseSignals,
        thresholds:   Option<PoseThresholds>,
        timestamp_ms: f64,
    ) -> Self {
        GestureInput {
            wrist_y:    signals.wrist_y,
            wrist_x:    signals.wrist_x,
            shoulder_y: signals.shoulder_y,
            thresholds,
            has_pose:   signals.has_pose,
            has_wrist:  signals.has_wrist,
            timestamp_ms,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureUpdate {
    pub state:      GestureState,
    pub gesture:    Gesture,
    /// Horizontal wrist velocity used this tick (px/s).
    pub velocity_x: f32,
}

// ════════════════════════════════════════════════════════════════════════════
// Transition function
// ════════════════════════════════════════════════════════════════════════════

/// Advance the classifier by one tick.
pub fn update_gesture(
    prev:   &GestureState,
    input:  &GestureInput,
    tuning: &GestureTuning,
) -> GestureUpdate {
    if !input.has_pose || !input.has_wrist {
        return GestureUpdate {
            state:      GestureState { mode: GestureMode::Idle, ..*prev },
            gesture:    Gesture::Idle,
            velocity_x: 0.0,
        };
    }

    let now = input.timestamp_ms;
    let dt_s = ((now - prev.last_timestamp_ms) / 1000.0).max(tuning.min_dt_s);
    let velocity_x = ((input.wrist_x - prev.last_wrist_x) as f64 / dt_s) as f32;
    let velocity_sign = sign(velocity_x);

    let PoseThresholds { idle_threshold: idle, jump_threshold: jump } = input
        .thresholds
        .unwrap_or_else(|| {
            PoseThresholds::shoulder_relative(input.shoulder_y, tuning.idle_offset, tuning.jump_offset)
        });

    let mut next = GestureState {
        last_timestamp_ms: now,
        last_wrist_x:      input.wrist_x,
        ..*prev
    };
    let mut gesture = Gesture::Idle;

    if input.wrist_y > idle {
        next.last_above_idle_ms = Some(now);
    }
    let in_jump_window = next
        .last_above_idle_ms
        .map_or(false, |t| now - t < tuning.jump_window_ms);

    if input.wrist_y <= jump && in_jump_window {
        next.mode = GestureMode::Jump;
        next.flap_cycles = 0;
        gesture = Gesture::Jump;
    } else if velocity_x.abs() > tuning.flap_velocity && input.wrist_y >= idle {
        if velocity_sign != 0 && velocity_sign != next.last_velocity_sign {
            next.flap_cycles += 1;
            next.last_velocity_sign = velocity_sign;
            next.last_flap_ms = Some(now);
        }
        if next.flap_cycles >= tuning.flap_reversals {
            next.mode = GestureMode::Flapping;
            gesture = Gesture::Flap;
        }
    }

    if next.last_flap_ms.map_or(true, |t| now - t > tuning.flap_decay_ms) {
        next.flap_cycles = 0;
    }

    if gesture == Gesture::Idle {
        let raising = input.wrist_y < idle && input.wrist_y > jump && in_jump_window;
        next.mode = if raising { GestureMode::Raising } else { GestureMode::Idle };
    }

    GestureUpdate { state: next, gesture, velocity_x }
}

fn sign(v: f32) -> i8 {
    if v > 0.0 { 1 } else if v < 0.0 { -1 } else { 0 }
}

/// Advisory 0..1 score for HUD/diagnostics. Never gates emission.
pub fn gesture_confidence(
    gesture:    Gesture,
    velocity_x: f32,
    wrist_y:    f32,
    thresholds: Option<&PoseThresholds>,
) -> f32 {
    let Some(t) = thresholds else {
        return 0.2;
    };
    match gesture {
        Gesture::Jump => ((t.jump_threshold - wrist_y + 0.1) * 4.0).clamp(0.0, 1.0),
        Gesture::Flap => {
            ((velocity_x.abs() - DEFAULT_FLAP_VELOCITY) / FLAP_CONFIDENCE_SPAN).clamp(0.0, 1.0)
        }
        Gesture::Idle => 0.1,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureClassifier
// ════════════════════════════════════════════════════════════════════════════

/// Owns one session's [`GestureState`].
#[derive(Clone, Debug)]
pub struct GestureClassifier {
    state:      GestureState,
    tuning:     GestureTuning,
    velocity_x: f32,
    last:       Gesture,
}

impl GestureClassifier {
    pub fn new(tuning: GestureTuning, now_ms: f64) -> Self {
        GestureClassifier {
            state: GestureState::new(now_ms),
            tuning,
            velocity_x: 0.0,
            last: Gesture::Idle,
        }
    }

    pub fn update(&mut self, input: &GestureInput) -> Gesture {
        let out = update_gesture(&self.state, input, &self.tuning);
        self.state = out.state;
        self.velocity_x = out.velocity_x;
        self.last = out.gesture;
        out.gesture
    }

    /// Forget all history (replay / recalibration).
    pub fn reset(&mut self, now_ms: f64) {
        self.state = GestureState::new(now_ms);
        self.velocity_x = 0.0;
        self.last = Gesture::Idle;
    }

    pub fn state(&self) -> &GestureState { &self.state }
    pub fn tuning(&self) -> &GestureTuning { &self.tuning }
    pub fn velocity_x(&self) -> f32 { self.velocity_x }
    pub fn last_gesture(&self) -> Gesture { self.last }

    /// Confidence of the last emitted gesture.
    pub fn confidence(&self, wrist_y: f32, thresholds: Option<&PoseThresholds>) -> f32 {
        gesture_confidence(self.last, self.velocity_x, wrist_y, thresholds)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const T: PoseThresholds = PoseThresholds { idle_threshold: 0.75, jump_threshold: 0.35 };

    fn input(wrist_y: f32, wrist_x: f32, ts: f64) -> GestureInput {
        GestureInput {
            wrist_y,
            wrist_x,
            shoulder_y: 0.5,
            thresholds: Some(T),
            has_pose: true,
            has_wrist: true,
            timestamp_ms: ts,
        }
    }

    fn run(trace: &[(f32, f32, f64)]) -> (GestureState, Vec<Gesture>) {
        let tuning = GestureTuning::default();
        let mut state = GestureState::new(0.0);
        let mut out = Vec::new();
        for &(y, x, ts) in trace {
            let u = update_gesture(&state, &input(y, x, ts), &tuning);
            state = u.state;
            out.push(u.gesture);
        }
        (state, out)
    }

    #[test]
    fn idle_without_pose() {
        let mut i = input(0.1, 500.0, 100.0);
        i.has_pose = false;
        let u = update_gesture(&GestureState::new(0.0), &i, &GestureTuning::default());
        assert_eq!(u.gesture, Gesture::Idle);
        assert_eq!(u.state.mode, GestureMode::Idle);
        // only the mode is touched
        assert_eq!(u.state.last_timestamp_ms, 0.0);
    }

    #[test]
    fn idle_without_wrist_keeps_counters() {
        let mut prev = GestureState::new(0.0);
        prev.flap_cycles = 2;
        prev.mode = GestureMode::Flapping;
        let mut i = input(0.8, 0.0, 50.0);
        i.has_wrist = false;
        let u = update_gesture(&prev, &i, &GestureTuning::default());
        assert_eq!(u.gesture, Gesture::Idle);
        assert_eq!(u.state.flap_cycles, 2);
        assert_eq!(u.state.mode, GestureMode::Idle);
    }

    #[test]
    fn fast_raise_is_a_jump() {
        let (state, g) = run(&[(0.8, 0.0, 50.0), (0.3, 0.0, 200.0)]);
        assert_eq!(g, vec![Gesture::Idle, Gesture::Jump]);
        assert_eq!(state.mode, GestureMode::Jump);
    }

    #[test]
    fn long_rest_then_quick_raise_jumps_on_the_drop_tick() {
        let mut trace: Vec<_> = (0..=10).map(|i| (0.8, 0.0, i as f64 * 40.0)).collect();
        trace.push((0.3, 0.0, 400.0 + 200.0));
        let (_, g) = run(&trace);
        // left rest zone at t=400, reached jump line at t=600 (< 300 ms later)
        assert_eq!(*g.last().unwrap(), Gesture::Jump);
        assert!(g[..g.len() - 1].iter().all(|&x| x == Gesture::Idle));
    }

    #[test]
    fn slow_raise_is_not_a_jump() {
        let (state, g) = run(&[
            (0.8, 0.0, 0.0),
            (0.6, 0.0, 150.0),
            (0.5, 0.0, 250.0),
            (0.3, 0.0, 350.0),
        ]);
        assert_eq!(*g.last().unwrap(), Gesture::Idle);
        assert_eq!(state.mode, GestureMode::Idle);
    }

    #[test]
    fn mode_reports_raising_inside_window() {
        let (state, g) = run(&[(0.8, 0.0, 0.0), (0.5, 0.0, 100.0)]);
        assert_eq!(g[1], Gesture::Idle);
        assert_eq!(state.mode, GestureMode::Raising);
    }

    #[test]
    fn three_reversals_flap_two_do_not() {
        let two = [(0.8, 0.0, 100.0), (0.8, 50.0, 150.0), (0.8, -50.0, 200.0)];
        let (state, g) = run(&two);
        assert_eq!(state.flap_cycles, 2);
        assert!(g.iter().all(|&x| x == Gesture::Idle));

        let mut three = two.to_vec();
        three.push((0.8, 60.0, 250.0));
        let (state, g) = run(&three);
        assert_eq!(*g.last().unwrap(), Gesture::Flap);
        assert_eq!(state.mode, GestureMode::Flapping);
    }

    #[test]
    fn continued_waving_keeps_flapping() {
        let xs = [0.0, 50.0, -50.0, 60.0, -60.0, 70.0, -70.0];
        let trace: Vec<_> = xs.iter().enumerate()
            .map(|(i, &x)| (0.8, x, 100.0 + 50.0 * i as f64))
            .collect();
        let (_, g) = run(&trace);
        assert_eq!(*g.last().unwrap(), Gesture::Flap);
    }

    #[test]
    fn slow_wave_does_not_count() {
        // 5 px per 50 ms = 100 px/s
        let trace: Vec<_> = (0..8)
            .map(|i| (0.8, if i % 2 == 0 { 0.0 } else { 5.0 }, 50.0 * i as f64))
            .collect();
        let (state, g) = run(&trace);
        assert_eq!(state.flap_cycles, 0);
        assert!(g.iter().all(|&x| x == Gesture::Idle));
    }

    #[test]
    fn stale_cycles_decay() {
        let (state, _) = run(&[
            (0.8, 0.0, 100.0),
            (0.8, 50.0, 150.0),
            (0.8, -50.0, 200.0),
            (0.8, -50.0, 1300.0),
        ]);
        assert_eq!(state.flap_cycles, 0);
    }

    #[test]
    fn jump_wins_over_flap_in_same_tick() {
        let mut prev = GestureState::new(0.0);
        prev.flap_cycles = 2;
        prev.last_velocity_sign = -1;
        prev.last_flap_ms = Some(0.0);
        prev.last_above_idle_ms = Some(0.0);
        // fast horizontal move and a raise in one tick
        let u = update_gesture(&prev, &input(0.3, 100.0, 50.0), &GestureTuning::default());
        assert_eq!(u.gesture, Gesture::Jump);
        assert_eq!(u.state.flap_cycles, 0);
    }

    #[test]
    fn non_increasing_timestamps_use_dt_floor() {
        let mut prev = GestureState::new(100.0);
        prev.last_wrist_x = 0.0;
        let u = update_gesture(&prev, &input(0.8, 1.0, 100.0), &GestureTuning::default());
        assert!((u.velocity_x - 1000.0).abs() < 1e-3);
        let u = update_gesture(&prev, &input(0.8, 1.0, 90.0), &GestureTuning::default());
        assert!(u.velocity_x.is_finite());
    }

    #[test]
    fn missing_thresholds_fall_back_to_shoulder() {
        // shoulder 0.5 → idle 0.6, jump 0.45
        let tuning = GestureTuning::default();
        let mut s = GestureState::new(0.0);
        let mut i = input(0.65, 0.0, 10.0);
        i.thresholds = None;
        s = update_gesture(&s, &i, &tuning).state;
        i.wrist_y = 0.44;
        i.timestamp_ms = 100.0;
        assert_eq!(update_gesture(&s, &i, &tuning).gesture, Gesture::Jump);
    }

    #[test]
    fn confidence_bands() {
        assert_eq!(gesture_confidence(Gesture::Jump, 0.0, 0.3, None), 0.2);
        assert_eq!(gesture_confidence(Gesture::Idle, 0.0, 0.3, Some(&T)), 0.1);
        assert!((gesture_confidence(Gesture::Jump, 0.0, 0.3, Some(&T)) - 0.6).abs() < 1e-5);
        assert_eq!(gesture_confidence(Gesture::Flap, 800.0, 0.8, Some(&T)), 1.0);
        assert!((gesture_confidence(Gesture::Flap, 350.0, 0.8, Some(&T)) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn classifier_reset_clears_history() {
        let mut c = GestureClassifier::new(GestureTuning::default(), 0.0);
        c.update(&input(0.8, 0.0, 50.0));
        c.reset(1000.0);
        assert_eq!(c.state(), &GestureState::new(1000.0));
        assert_eq!(c.last_gesture(), Gesture::Idle);
    }

    proptest! {
        #[test]
        fn no_pose_is_always_idle(
            y in -1.0_f32..2.0,
            x in -1e4_f32..1e4,
            ts in 0.0_f64..1e6,
            has_wrist in any::<bool>(),
        ) {
            let mut i = input(y, x, ts);
            i.has_pose = false;
            i.has_wrist = has_wrist;
            let u = update_gesture(&GestureState::new(0.0), &i, &GestureTuning::default());
            prop_assert_eq!(u.gesture, Gesture::Idle);

            let mut i = input(y, x, ts);
            i.has_wrist = false;
            let u = update_gesture(&GestureState::new(0.0), &i, &GestureTuning::default());
            prop_assert_eq!(u.gesture, Gesture::Idle);
        }
    }
}
