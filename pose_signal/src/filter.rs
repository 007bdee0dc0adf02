//! 1-D recursive estimator for one noisy keypoint coordinate.
//!
//! Scalar Kalman recurrence with a constant-position model:
//!
//! ```text
//! P ← P + Q
//! K ← P / (P + R)
//! x ← x + K·(z − x)
//! P ← (1 − K)·P
//! ```

use num_traits::Float;
use serde::{Deserialize, Serialize};

/// Noise parameters, all strictly positive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterParams<T> {
    /// Q: how far the true value may drift between measurements.
    pub process_noise:     T,
    /// R: sensor jitter.
    pub measurement_noise: T,
    /// P₀: initial estimate uncertainty.
    pub estimated_error:   T,
}

impl FilterParams<f32> {
    /// Tuning used for the wrist X/Y streams (pixel units).
    pub const WRIST: FilterParams<f32> = FilterParams {
        process_noise:     2.0,
        measurement_noise: 10.0,
        estimated_error:   1.0,
    };
}

impl Default for FilterParams<f32> {
    fn default() -> Self { FilterParams::WRIST }
}

/// Smooths one scalar stream. There is no error path; every update returns
/// the new estimate.
#[derive(Clone, Debug, PartialEq)]
pub struct KeypointFilter<T = f32> {
    estimate:          T,
    error:             T,
    process_noise:     T,
    measurement_noise: T,
    last_gain:         T,
}

impl<T: Float> KeypointFilter<T> {
    pub fn new(initial: T, params: FilterParams<T>) -> Self {
        KeypointFilter {
            estimate:          initial,
            error:             params.estimated_error,
            process_noise:     params.process_noise,
            measurement_noise: params.measurement_noise,
            last_gain:         T::zero(),
        }
    }

    /// Fold one measurement into the estimate and return it.
    pub fn update(&mut self, measurement: T) -> T {
        self.error = self.error + self.process_noise;
        let gain = self.error / (self.error + self.measurement_noise);
        self.estimate = self.estimate + gain * (measurement - self.estimate);
        self.error = (T::one() - gain) * self.error;
        self.last_gain = gain;
        self.estimate
    }

    /// Overwrite the estimate without touching the error covariance.
    pub fn set(&mut self, value: T) { self.estimate = value; }

    pub fn estimate(&self) -> T { self.estimate }
    pub fn error(&self) -> T { self.error }

    /// Gain applied by the most recent [`update`](Self::update); zero before
    /// the first one.
    pub fn gain(&self) -> T { self.last_gain }
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
    fn first_update_uses_initial_error() {
        let mut f = KeypointFilter::new(0.0_f32, FilterParams::WRIST);
        let est = f.update(13.0);
        // P = 1 + 2 = 3, K = 3 / 13
        assert_relative_eq!(f.gain(), 3.0 / 13.0, epsilon = 1e-6);
        assert_relative_eq!(est, 3.0, epsilon = 1e-5);
        assert_relative_eq!(f.error(), 3.0 * 10.0 / 13.0, epsilon = 1e-5);
    }

    #[test]
    fn constant_stream_converges_monotonically() {
        let mut f = KeypointFilter::new(100.0_f64, FilterParams {
            process_noise: 2.0, measurement_noise: 10.0, estimated_error: 1.0,
        });
        let target = 40.0;
        let mut prev_gap = (100.0_f64 - target).abs();
        for _ in 0..200 {
            let gap = (f.update(target) - target).abs();
            assert!(gap <= prev_gap, "gap grew: {} > {}", gap, prev_gap);
            prev_gap = gap;
        }
        assert!(prev_gap < 1e-6);
    }

    #[test]
    fn steady_state_gain_settles() {
        // P² + 2P − 20 = 0 for Q=2, R=10 → P ≈ 3.583, K = (P+2)/(P+12)
        let mut f = KeypointFilter::new(0.0_f64, FilterParams {
            process_noise: 2.0, measurement_noise: 10.0, estimated_error: 1.0,
        });
        for _ in 0..100 { f.update(1.0); }
        let p = -1.0 + 21.0_f64.sqrt();
        assert_relative_eq!(f.gain(), (p + 2.0) / (p + 12.0), epsilon = 1e-9);
    }

    #[test]
    fn set_overrides_estimate() {
        let mut f = KeypointFilter::new(0.0_f32, FilterParams::WRIST);
        f.set(5.0);
        assert_eq!(f.estimate(), 5.0);
    }

    proptest! {
        #[test]
        fn gain_stays_inside_unit_interval(
            q in 1e-3_f64..100.0,
            r in 1e-3_f64..100.0,
            p0 in 1e-3_f64..100.0,
            zs in proptest::collection::vec(-1e4_f64..1e4, 1..64),
        ) {
            let mut f = KeypointFilter::new(0.0, FilterParams {
                process_noise: q, measurement_noise: r, estimated_error: p0,
            });
            for z in zs {
                f.update(z);
                prop_assert!(f.gain() > 0.0 && f.gain() < 1.0);
            }
        }
    }
}
