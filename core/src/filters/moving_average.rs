use std::collections::VecDeque;

use super::{AngleTable, Filter, FilterInfo};
use crate::math::StatsHelper;

pub const DEFAULT_WINDOW: usize = 5;

/// Averages the last `window_size` readings seen at each angle.
pub struct MovingAverageFilter {
    window_size: usize,
    history: AngleTable<VecDeque<f64>>,
    enabled: bool,
}

impl MovingAverageFilter {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
            history: AngleTable::new(),
            enabled: true,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Changes the window and drops all history.
    pub fn set_window_size(&mut self, size: usize) {
        self.window_size = size.max(1);
        self.reset();
    }

    pub fn history(&self, angle: u16) -> Option<&VecDeque<f64>> {
        self.history.get(angle)
    }
}

impl Default for MovingAverageFilter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl Filter for MovingAverageFilter {
    fn apply(&mut self, angle: u16, value: f64) -> f64 {
        let Some(buffer) = self.history.get_mut(angle) else {
            return value;
        };

        if buffer.len() >= self.window_size {
            buffer.pop_front();
        }
        buffer.push_back(value);

        StatsHelper::mean(buffer.iter())
    }

    fn reset(&mut self) {
        self.history.clear();
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn info(&self) -> FilterInfo {
        FilterInfo::leaf(
            "Moving Average",
            "Averages the last N readings to smooth noise",
            self.enabled,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_average() {
        let mut filter = MovingAverageFilter::new(3);

        assert_eq!(filter.process(90, 10.0), 10.0);
        assert_eq!(filter.process(90, 20.0), 15.0);
        assert_eq!(filter.process(90, 30.0), 20.0);

        // Window is full, oldest value should be dropped
        assert_eq!(filter.process(90, 40.0), 30.0);
    }

    #[test]
    fn angles_keep_independent_history() {
        let mut filter = MovingAverageFilter::new(3);
        filter.process(10, 100.0);
        filter.process(10, 100.0);

        assert_eq!(filter.process(20, 40.0), 40.0);
        assert_eq!(filter.history(10).map(|h| h.len()), Some(2));
        assert_eq!(filter.history(20).map(|h| h.len()), Some(1));
    }

    #[test]
    fn constant_input_converges_after_full_window() {
        let mut filter = MovingAverageFilter::new(5);
        let mut last = 0.0;
        for _ in 0..5 {
            last = filter.process(0, 42.0);
        }
        assert_eq!(last, 42.0);
    }

    #[test]
    fn single_outlier_is_scaled_by_window() {
        let window = 4;
        let mut filter = MovingAverageFilter::new(window);
        for _ in 0..window {
            filter.process(45, 100.0);
        }
        let output = filter.process(45, 180.0);
        let expected = 100.0 + 80.0 / window as f64;
        assert!((output - expected).abs() < 1e-9);
    }

    #[test]
    fn disabled_filter_passes_through_without_state_change() {
        let mut filter = MovingAverageFilter::new(3);
        filter.process(90, 10.0);
        filter.set_enabled(false);

        assert_eq!(filter.process(90, 500.0), 500.0);
        assert_eq!(filter.history(90).map(|h| h.len()), Some(1));

        filter.set_enabled(true);
        assert_eq!(filter.process(90, 20.0), 15.0);
    }

    #[test]
    fn window_change_clears_history() {
        let mut filter = MovingAverageFilter::new(3);
        filter.process(90, 10.0);
        filter.process(90, 20.0);

        filter.set_window_size(0);
        assert_eq!(filter.window_size(), 1);
        assert_eq!(filter.history(90).map(|h| h.len()), Some(0));
        assert_eq!(filter.process(90, 70.0), 70.0);
    }

    #[test]
    fn out_of_range_angle_passes_through() {
        let mut filter = MovingAverageFilter::new(3);
        assert_eq!(filter.process(400, 12.5), 12.5);
    }
}
