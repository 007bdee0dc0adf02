//! Two-phase calibration: arm low, then arm high.
//!
//! ```text
//!   Low ──30 samples──▶ High ──30 samples──▶ Done (Sampled)
//!    │                   │
//!    └──── 20 s ─────────┴─────────────────▶ Done (TimedOut)
//!    skip() from either phase ─────────────▶ Done (Skipped)
//! ```
//!
//! Samples are the normalized wrist Y the classifier reads, accepted at most once per
//! [`SAMPLE_INTERVAL_MS`]. The engine is driven by the frame loop and never
//! reads a clock itself.

use serde::{Deserialize, Serialize};

use crate::thresholds::{CalibrationStats, PoseThresholds};

pub const CAPTURE_FRAMES: usize = 30;
pub const SAMPLE_INTERVAL_MS: f64 = 120.0;
pub const CALIBRATION_TIMEOUT_MS: f64 = 20_000.0;

/// Multiplier on the phase standard deviation.
pub const STD_WEIGHT: f32 = 0.3;
/// Gap forced between the two thresholds when they collide.
pub const THRESHOLD_MARGIN: f32 = 0.06;
pub const MIN_JUMP_THRESHOLD: f32 = 0.05;

// mean, std used for a phase that collected nothing
const FALLBACK_LOW:  (f32, f32) = (0.75, 0.08);
const FALLBACK_HIGH: (f32, f32) = (0.35, 0.08);

// ════════════════════════════════════════════════════════════════════════════
// Types
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationPhase {
    Low,
    High,
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub thresholds: PoseThresholds,
    pub stats:      CalibrationStats,
}

/// How a calibration run finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeOrigin {
    Sampled,
    TimedOut,
    Skipped,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibrationOutcome {
    pub result: CalibrationResult,
    pub origin: OutcomeOrigin,
}

impl CalibrationOutcome {
    /// Anything other than a full sampled run deserves a notice.
    pub fn is_fallback(&self) -> bool { self.origin != OutcomeOrigin::Sampled }
}

/// What a single [`CalibrationEngine::offer_sample`] call did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CalibrationEvent {
    /// Too early, no pose, non-finite, or already done.
    Rejected,
    Accepted,
    /// Low phase filled; now sampling the raised arm.
    PhaseAdvanced,
    Completed(CalibrationOutcome),
}

/// Fraction of [`CAPTURE_FRAMES`] collected per phase.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CalibrationProgress {
    pub phase: CalibrationPhase,
    pub low:   f32,
    pub high:  f32,
}

// ════════════════════════════════════════════════════════════════════════════
// Statistics
// ════════════════════════════════════════════════════════════════════════════

fn mean(values: &[f32]) -> f32 {
    values.iter().sum::<f32>() / values.len().max(1) as f32
}

/// Population standard deviation.
fn std_dev(values: &[f32]) -> f32 {
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f32>()
        / values.len().max(1) as f32;
    variance.sqrt()
}

fn phase_stats(values: &[f32], fallback: (f32, f32)) -> (f32, f32) {
    if values.is_empty() { fallback } else { (mean(values), std_dev(values)) }
}

/// Thresholds from a full sampled run, forced into `jump < idle`. The jump
/// floor only applies when the two collide.
pub fn derive_thresholds(stats: &CalibrationStats) -> PoseThresholds {
    let idle = stats.low_mean + STD_WEIGHT * stats.low_std;
    let jump = stats.high_mean - STD_WEIGHT * stats.high_std;
    enforce_order(idle, jump)
}

/// Thresholds for a timed-out run: the jump line is always floored.
pub fn derive_timeout_thresholds(stats: &CalibrationStats) -> PoseThresholds {
    let idle = stats.low_mean + STD_WEIGHT * stats.low_std;
    let jump = (stats.high_mean - STD_WEIGHT * stats.high_std).max(MIN_JUMP_THRESHOLD);
    enforce_order(idle, jump)
}

fn enforce_order(mut idle: f32, mut jump: f32) -> PoseThresholds {
    if jump >= idle {
        jump = (idle - THRESHOLD_MARGIN).max(MIN_JUMP_THRESHOLD);
    }
    if jump >= idle {
        // idle itself sits under the floor
        idle = jump + THRESHOLD_MARGIN;
    }
    PoseThresholds { idle_threshold: idle, jump_threshold: jump }
}

fn phase_summary(low: &[f32], high: &[f32]) -> CalibrationStats {
    let (low_mean, low_std) = phase_stats(low, FALLBACK_LOW);
    let (high_mean, high_std) = phase_stats(high, FALLBACK_HIGH);
    CalibrationStats { low_mean, low_std, high_mean, high_std }
}

/// Summarize a completed run. Empty phases use the fallback statistics.
pub fn summarize_samples(low: &[f32], high: &[f32]) -> CalibrationResult {
    let stats = phase_summary(low, high);
    CalibrationResult { thresholds: derive_thresholds(&stats), stats }
}

/// Summarize whatever a timed-out run collected.
pub fn summarize_timeout(low: &[f32], high: &[f32]) -> CalibrationResult {
    let stats = phase_summary(low, high);
    CalibrationResult { thresholds: derive_timeout_thresholds(&stats), stats }
}

/// Result used by the "use defaults" path.
pub fn default_result() -> CalibrationResult {
    CalibrationResult {
        thresholds: PoseThresholds::DEFAULT,
        stats: CalibrationStats {
            low_mean:  FALLBACK_LOW.0,
            low_std:   FALLBACK_LOW.1,
            high_mean: FALLBACK_HIGH.0,
            high_std:  FALLBACK_HIGH.1,
        },
    }
}

// ════════════════════════════════════════════════════════════════════════════
// CalibrationEngine
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct CalibrationEngine {
    phase:          CalibrationPhase,
    low:            Vec<f32>,
    high:           Vec<f32>,
    phase_start_ms: f64,
    last_sample_ms: Option<f64>,
    outcome:        Option<CalibrationOutcome>,
}

impl CalibrationEngine {
    pub fn new(now_ms: f64) -> Self {
        CalibrationEngine {
            phase:          CalibrationPhase::Low,
            low:            Vec::with_capacity(CAPTURE_FRAMES),
            high:           Vec::with_capacity(CAPTURE_FRAMES),
            phase_start_ms: now_ms,
            last_sample_ms: None,
            outcome:        None,
        }
    }

    /// Drop everything and start again from the low phase.
    pub fn restart(&mut self, now_ms: f64) {
        *self = CalibrationEngine::new(now_ms);
    }

    pub fn phase(&self) -> CalibrationPhase { self.phase }
    pub fn is_done(&self) -> bool { self.phase == CalibrationPhase::Done }
    pub fn outcome(&self) -> Option<&CalibrationOutcome> { self.outcome.as_ref() }

    pub fn progress(&self) -> CalibrationProgress {
        CalibrationProgress {
            phase: self.phase,
            low:   self.low.len() as f32 / CAPTURE_FRAMES as f32,
            high:  self.high.len() as f32 / CAPTURE_FRAMES as f32,
        }
    }

    /// Offer one frame's wrist height.
    pub fn offer_sample(
        &mut self,
        wrist_y:   f32,
        has_pose:  bool,
        has_wrist: bool,
        now_ms:    f64,
    ) -> CalibrationEvent {
        if self.is_done() {
            return CalibrationEvent::Rejected;
        }
        if let Some(last) = self.last_sample_ms {
            if now_ms - last < SAMPLE_INTERVAL_MS {
                return CalibrationEvent::Rejected;
            }
        }
        if !has_pose || !(has_wrist || wrist_y > 0.0) || !wrist_y.is_finite() {
            return CalibrationEvent::Rejected;
        }
        self.last_sample_ms = Some(now_ms);

        match self.phase {
            CalibrationPhase::Low => {
                self.low.push(wrist_y);
                log::trace!("calibration low sample {} = {:.3}", self.low.len(), wrist_y);
                if self.low.len() >= CAPTURE_FRAMES {
                    self.phase = CalibrationPhase::High;
                    self.phase_start_ms = now_ms;
                    log::info!("calibration: low phase captured, raise your arm");
                    return CalibrationEvent::PhaseAdvanced;
                }
                CalibrationEvent::Accepted
            }
            CalibrationPhase::High => {
                self.high.push(wrist_y);
                log::trace!("calibration high sample {} = {:.3}", self.high.len(), wrist_y);
                if self.high.len() >= CAPTURE_FRAMES {
                    let outcome = self.finish(OutcomeOrigin::Sampled);
                    return CalibrationEvent::Completed(outcome);
                }
                CalibrationEvent::Accepted
            }
            CalibrationPhase::Done => CalibrationEvent::Rejected,
        }
    }

    /// Force completion once the current phase has run for
    /// [`CALIBRATION_TIMEOUT_MS`].
    pub fn poll_timeout(&mut self, now_ms: f64) -> Option<CalibrationOutcome> {
        if self.is_done() || now_ms - self.phase_start_ms < CALIBRATION_TIMEOUT_MS {
            return None;
        }
        log::warn!(
            "calibration timed out with {}/{} samples, using fallback thresholds",
            self.low.len(),
            self.high.len(),
        );
        Some(self.finish(OutcomeOrigin::TimedOut))
    }

    /// "Use defaults". `None` once already done.
    pub fn skip(&mut self) -> Option<CalibrationOutcome> {
        if self.is_done() {
            return None;
        }
        Some(self.finish(OutcomeOrigin::Skipped))
    }

    fn finish(&mut self, origin: OutcomeOrigin) -> CalibrationOutcome {
        let result = match origin {
            OutcomeOrigin::Skipped  => default_result(),
            OutcomeOrigin::TimedOut => summarize_timeout(&self.low, &self.high),
            OutcomeOrigin::Sampled  => summarize_samples(&self.low, &self.high),
        };
        let outcome = CalibrationOutcome { result, origin };
        self.phase = CalibrationPhase::Done;
        self.outcome = Some(outcome);
        log::info!(
            "calibration done ({:?}): idle {:.3}, jump {:.3}",
            origin,
            result.thresholds.idle_threshold,
            result.thresholds.jump_threshold,
        );
        outcome
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn feed(engine: &mut CalibrationEngine, y: f32, count: usize, start_ms: f64) -> Vec<CalibrationEvent> {
        (0..count)
            .map(|i| engine.offer_sample(y, true, true, start_ms + i as f64 * SAMPLE_INTERVAL_MS))
            .collect()
    }

    #[test]
    fn zero_spread_samples_give_exact_thresholds() {
        let r = summarize_samples(&[0.8; 30], &[0.2; 30]);
        assert_relative_eq!(r.thresholds.idle_threshold, 0.8, epsilon = 1e-6);
        assert_relative_eq!(r.thresholds.jump_threshold, 0.2, epsilon = 1e-6);
        assert!(r.thresholds.is_ordered());
        assert_relative_eq!(r.stats.low_std, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn std_band_widens_thresholds() {
        let r = summarize_samples(&[0.7, 0.9], &[0.1, 0.3]);
        // std 0.1 each
        assert_relative_eq!(r.thresholds.idle_threshold, 0.83, epsilon = 1e-5);
        assert_relative_eq!(r.thresholds.jump_threshold, 0.17, epsilon = 1e-5);
    }

    #[test]
    fn collision_is_clamped_below_idle() {
        let r = summarize_samples(&[0.5; 4], &[0.5; 4]);
        assert_relative_eq!(r.thresholds.jump_threshold, 0.44, epsilon = 1e-6);
        assert!(r.thresholds.is_ordered());
    }

    #[test]
    fn sampled_jump_line_is_not_floored_without_collision() {
        let r = summarize_samples(&[0.8; 30], &[0.02; 30]);
        assert_relative_eq!(r.thresholds.jump_threshold, 0.02, epsilon = 1e-6);
        assert!(r.thresholds.is_ordered());
    }

    #[test]
    fn timed_out_jump_line_is_floored() {
        let r = summarize_timeout(&[0.8; 5], &[0.02; 5]);
        assert_eq!(r.thresholds.jump_threshold, MIN_JUMP_THRESHOLD);
        assert_relative_eq!(r.thresholds.idle_threshold, 0.8, epsilon = 1e-6);
    }

    #[test]
    fn tiny_idle_lifts_above_floor() {
        let r = summarize_samples(&[0.01; 4], &[0.01; 4]);
        assert_eq!(r.thresholds.jump_threshold, MIN_JUMP_THRESHOLD);
        assert!(r.thresholds.is_ordered());
    }

    #[test]
    fn full_run_completes_with_sampled_origin() {
        let mut e = CalibrationEngine::new(0.0);
        let low = feed(&mut e, 0.9, CAPTURE_FRAMES, 0.0);
        assert_eq!(low.last(), Some(&CalibrationEvent::PhaseAdvanced));
        assert_eq!(e.phase(), CalibrationPhase::High);
        assert_relative_eq!(e.progress().low, 1.0);

        let start = CAPTURE_FRAMES as f64 * SAMPLE_INTERVAL_MS;
        let high = feed(&mut e, 0.2, CAPTURE_FRAMES, start);
        let Some(CalibrationEvent::Completed(outcome)) = high.last().copied() else {
            panic!("expected completion, got {:?}", high.last());
        };
        assert_eq!(outcome.origin, OutcomeOrigin::Sampled);
        assert!(!outcome.is_fallback());
        assert_relative_eq!(outcome.result.thresholds.idle_threshold, 0.9, epsilon = 1e-5);
        assert_relative_eq!(outcome.result.thresholds.jump_threshold, 0.2, epsilon = 1e-5);
        assert!(e.is_done());
    }

    #[test]
    fn cadence_rejects_fast_samples() {
        let mut e = CalibrationEngine::new(0.0);
        assert_eq!(e.offer_sample(0.8, true, true, 0.0), CalibrationEvent::Accepted);
        assert_eq!(e.offer_sample(0.8, true, true, 60.0), CalibrationEvent::Rejected);
        assert_eq!(e.offer_sample(0.8, true, true, 120.0), CalibrationEvent::Accepted);
    }

    #[test]
    fn gate_requires_pose() {
        let mut e = CalibrationEngine::new(0.0);
        assert_eq!(e.offer_sample(0.8, false, true, 0.0), CalibrationEvent::Rejected);
        assert_eq!(e.offer_sample(0.0, true, false, 0.0), CalibrationEvent::Rejected);
        // a weak wrist with a usable height still counts
        assert_eq!(e.offer_sample(0.8, true, false, 0.0), CalibrationEvent::Accepted);
        assert_eq!(e.offer_sample(f32::NAN, true, true, 500.0), CalibrationEvent::Rejected);
    }

    #[test]
    fn timeout_with_no_samples_uses_fallback() {
        let mut e = CalibrationEngine::new(1000.0);
        assert!(e.poll_timeout(20_999.0).is_none());
        let outcome = e.poll_timeout(21_000.0).unwrap();
        assert_eq!(outcome.origin, OutcomeOrigin::TimedOut);
        // 0.75 + 0.3·0.08, 0.35 − 0.3·0.08
        assert_relative_eq!(outcome.result.thresholds.idle_threshold, 0.774, epsilon = 1e-5);
        assert_relative_eq!(outcome.result.thresholds.jump_threshold, 0.326, epsilon = 1e-5);
        assert!(e.poll_timeout(50_000.0).is_none());
    }

    #[test]
    fn timeout_uses_partial_low_samples() {
        let mut e = CalibrationEngine::new(0.0);
        feed(&mut e, 0.6, 5, 0.0);
        let outcome = e.poll_timeout(CALIBRATION_TIMEOUT_MS).unwrap();
        assert_relative_eq!(outcome.result.stats.low_mean, 0.6, epsilon = 1e-6);
        assert_relative_eq!(outcome.result.stats.high_mean, 0.35, epsilon = 1e-6);
    }

    #[test]
    fn high_phase_gets_its_own_timeout() {
        let mut e = CalibrationEngine::new(0.0);
        feed(&mut e, 0.9, CAPTURE_FRAMES, 15_000.0);
        assert_eq!(e.phase(), CalibrationPhase::High);
        assert!(e.poll_timeout(25_000.0).is_none());
    }

    #[test]
    fn done_is_terminal() {
        let mut e = CalibrationEngine::new(0.0);
        let skipped = e.skip().unwrap();
        assert_eq!(skipped.result.thresholds, PoseThresholds::DEFAULT);
        assert_eq!(e.offer_sample(0.5, true, true, 10_000.0), CalibrationEvent::Rejected);
        assert!(e.skip().is_none());
        assert_eq!(e.outcome(), Some(&skipped));
    }

    #[test]
    fn restart_clears_samples() {
        let mut e = CalibrationEngine::new(0.0);
        feed(&mut e, 0.9, 10, 0.0);
        e.restart(5000.0);
        assert_eq!(e.progress().low, 0.0);
        assert_eq!(e.phase(), CalibrationPhase::Low);
    }

    proptest! {
        #[test]
        fn thresholds_always_strictly_ordered(
            low in proptest::collection::vec(-1.0_f32..2.0, 0..40),
            high in proptest::collection::vec(-1.0_f32..2.0, 0..40),
        ) {
            let r = summarize_samples(&low, &high);
            prop_assert!(r.thresholds.jump_threshold < r.thresholds.idle_threshold);

            let t = summarize_timeout(&low, &high);
            prop_assert!(t.thresholds.jump_threshold < t.thresholds.idle_threshold);
            prop_assert!(t.thresholds.jump_threshold >= MIN_JUMP_THRESHOLD);
        }
    }
}
