//! Per-angle smoothing filters for noisy distance readings.
//!
//! Every filter keeps independent state for each scan angle; a reading at one
//! angle never influences the output at another. Filters compose through
//! [`FilterChain`], which is itself a [`Filter`].

pub mod chain;
pub mod kalman;
pub mod median;
pub mod moving_average;
pub mod presets;

pub use chain::FilterChain;
pub use kalman::{KalmanFilter, KalmanState};
pub use median::MedianFilter;
pub use moving_average::MovingAverageFilter;
pub use presets::{FilterPreset, FilterSettings};

use crate::prelude::ANGLE_SLOTS;
use serde::Serialize;

/// Capability shared by every smoothing filter.
pub trait Filter: Send {
    /// Filters `value` for `angle`. A disabled filter returns `value` untouched
    /// and leaves its state alone.
    fn process(&mut self, angle: u16, value: f64) -> f64 {
        if !self.is_enabled() {
            return value;
        }
        self.apply(angle, value)
    }

    /// Algorithm step: updates the state for `angle` and returns the smoothed value.
    fn apply(&mut self, angle: u16, value: f64) -> f64;

    /// Clears all per-angle state. The enabled flag is left as is.
    fn reset(&mut self);

    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    fn info(&self) -> FilterInfo;
}

/// Display metadata for a filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FilterInfo>,
}

impl FilterInfo {
    pub fn leaf(name: &'static str, description: &'static str, enabled: bool) -> Self {
        Self {
            name,
            description,
            enabled,
            children: Vec::new(),
        }
    }
}

/// Fixed table with one slot per scan angle.
///
/// Angles beyond the scan range have no slot; lookups for them return `None`.
#[derive(Debug, Clone)]
pub struct AngleTable<T> {
    slots: Vec<T>,
}

impl<T: Default + Clone> AngleTable<T> {
    pub fn new() -> Self {
        Self {
            slots: vec![T::default(); ANGLE_SLOTS],
        }
    }

    pub fn get(&self, angle: u16) -> Option<&T> {
        self.slots.get(usize::from(angle))
    }

    pub fn get_mut(&mut self, angle: u16) -> Option<&mut T> {
        self.slots.get_mut(usize::from(angle))
    }

    pub fn clear(&mut self) {
        self.slots.fill(T::default());
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &T)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(angle, slot)| (angle as u16, slot))
    }
}

impl<T: Default + Clone> Default for AngleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
