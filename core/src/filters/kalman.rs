use serde::Serialize;

use super::{AngleTable, Filter, FilterInfo};

pub const DEFAULT_PROCESS_NOISE: f64 = 1.0;
pub const DEFAULT_MEASUREMENT_NOISE: f64 = 10.0;

/// Smallest noise value accepted for either Q or R.
pub const MIN_NOISE: f64 = 0.001;

const INITIAL_COVARIANCE: f64 = 1.0;

/// Per-angle estimate and error covariance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KalmanState {
    pub estimate: f64,
    pub covariance: f64,
}

/// Scalar Kalman filter with a constant-position model.
///
/// Higher measurement noise (R) trusts the sensor less and smooths more;
/// higher process noise (Q) lets the estimate follow changes faster.
pub struct KalmanFilter {
    process_noise: f64,
    measurement_noise: f64,
    state: AngleTable<Option<KalmanState>>,
    enabled: bool,
}

impl KalmanFilter {
    pub fn new(process_noise: f64, measurement_noise: f64) -> Self {
        Self {
            process_noise: clamp_noise(process_noise),
            measurement_noise: clamp_noise(measurement_noise),
            state: AngleTable::new(),
            enabled: true,
        }
    }

    pub fn process_noise(&self) -> f64 {
        self.process_noise
    }

    pub fn measurement_noise(&self) -> f64 {
        self.measurement_noise
    }

    /// Retunes Q and R. Existing per-angle estimates are kept.
    pub fn set_noise_parameters(&mut self, process_noise: f64, measurement_noise: f64) {
        self.process_noise = clamp_noise(process_noise);
        self.measurement_noise = clamp_noise(measurement_noise);
    }

    pub fn state(&self, angle: u16) -> Option<KalmanState> {
        self.state.get(angle).copied().flatten()
    }
}

fn clamp_noise(value: f64) -> f64 {
    if value.is_nan() {
        MIN_NOISE
    } else {
        value.max(MIN_NOISE)
    }
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new(DEFAULT_PROCESS_NOISE, DEFAULT_MEASUREMENT_NOISE)
    }
}

impl Filter for KalmanFilter {
    fn apply(&mut self, angle: u16, measurement: f64) -> f64 {
        let (q, r) = (self.process_noise, self.measurement_noise);
        let Some(slot) = self.state.get_mut(angle) else {
            return measurement;
        };

        let Some(prev) = *slot else {
            *slot = Some(KalmanState {
                estimate: measurement,
                covariance: INITIAL_COVARIANCE,
            });
            return measurement;
        };

        // Predict: position unchanged, uncertainty grows by Q.
        let predicted_covariance = prev.covariance + q;

        let gain = predicted_covariance / (predicted_covariance + r);
        let estimate = prev.estimate + gain * (measurement - prev.estimate);
        let covariance = (1.0 - gain) * predicted_covariance;

        *slot = Some(KalmanState {
            estimate,
            covariance,
        });
        estimate
    }

    fn reset(&mut self) {
        self.state.clear();
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn info(&self) -> FilterInfo {
        FilterInfo::leaf(
            "Kalman Filter",
            "Optimal state estimation balancing prediction and measurement",
            self.enabled,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kalman_filter() {
        let mut filter = KalmanFilter::default();

        // First measurement initializes the filter
        assert_eq!(filter.process(90, 100.0), 100.0);
        assert_eq!(
            filter.state(90),
            Some(KalmanState {
                estimate: 100.0,
                covariance: 1.0
            })
        );

        // Q=1, R=10: p'=2, K=2/12
        let second = filter.process(90, 112.0);
        assert!((second - 102.0).abs() < 1e-9);
        let state = filter.state(90).unwrap();
        assert!((state.covariance - 2.0 * (10.0 / 12.0)).abs() < 1e-9);
    }

    #[test]
    fn high_measurement_noise_converges_slowly() {
        let mut filter = KalmanFilter::new(0.01, 100.0);
        filter.process(0, 0.0);
        let mut output = 0.0;
        for _ in 0..5 {
            output = filter.process(0, 100.0);
        }
        assert!(output < 20.0, "tracked too fast: {output}");
    }

    #[test]
    fn high_process_noise_tracks_quickly() {
        let mut filter = KalmanFilter::new(100.0, 0.01);
        filter.process(0, 0.0);
        let output = filter.process(0, 100.0);
        assert!(output > 99.9, "tracked too slowly: {output}");
    }

    #[test]
    fn retuning_keeps_state_and_clamps() {
        let mut filter = KalmanFilter::default();
        filter.process(10, 50.0);
        filter.process(10, 60.0);
        let before = filter.state(10);

        filter.set_noise_parameters(0.0, -3.0);
        assert_eq!(filter.process_noise(), MIN_NOISE);
        assert_eq!(filter.measurement_noise(), MIN_NOISE);
        assert_eq!(filter.state(10), before);
    }

    #[test]
    fn disabled_filter_does_not_initialize_state() {
        let mut filter = KalmanFilter::default();
        filter.set_enabled(false);
        assert_eq!(filter.process(45, 80.0), 80.0);
        assert_eq!(filter.state(45), None);
    }

    #[test]
    fn reset_drops_all_estimates() {
        let mut filter = KalmanFilter::default();
        filter.process(1, 5.0);
        filter.process(2, 6.0);
        filter.reset();
        assert_eq!(filter.state(1), None);
        assert_eq!(filter.state(2), None);
        assert_eq!(filter.process(1, 9.0), 9.0);
    }
}
