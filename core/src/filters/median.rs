use std::collections::VecDeque;

use super::{AngleTable, Filter, FilterInfo};
use crate::math::StatsHelper;

pub const DEFAULT_WINDOW: usize = 5;

/// Median of the last N readings per angle. Rejects isolated spikes that a
/// moving average would smear into its neighbours.
pub struct MedianFilter {
    window_size: usize,
    history: AngleTable<VecDeque<f64>>,
    enabled: bool,
}

/// Rounds up to the nearest odd window, never below one.
fn odd_window(size: usize) -> usize {
    let size = size.max(1);
    if size % 2 == 0 {
        size + 1
    } else {
        size
    }
}

impl MedianFilter {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: odd_window(window_size),
            history: AngleTable::new(),
            enabled: true,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Changes the window (rounded up to odd) and drops all history.
    pub fn set_window_size(&mut self, size: usize) {
        self.window_size = odd_window(size);
        self.reset();
    }

    pub fn history(&self, angle: u16) -> Option<&VecDeque<f64>> {
        self.history.get(angle)
    }
}

impl Default for MedianFilter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl Filter for MedianFilter {
    fn apply(&mut self, angle: u16, value: f64) -> f64 {
        let Some(buffer) = self.history.get_mut(angle) else {
            return value;
        };

        if buffer.len() >= self.window_size {
            buffer.pop_front();
        }
        buffer.push_back(value);

        StatsHelper::median(buffer.iter())
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
            "Median Filter",
            "Returns median of last N readings, ignoring outliers",
            self.enabled,
        )
    }
}
