use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use super::{kalman, median, moving_average};
use super::{Filter, FilterChain, KalmanFilter, MedianFilter, MovingAverageFilter};
use crate::prelude::{SonarError, SonarResult};

/// Default spike-detection threshold in centimeters.
pub const DEFAULT_SPIKE_THRESHOLD: f64 = 50.0;

/// Named filter chain configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPreset {
    /// Pass raw data through.
    None,
    /// Moving average (3): minimal lag.
    Light,
    /// Median (3) then moving average (3).
    Standard,
    /// Median (5) then moving average (7): smooth, noticeable lag.
    Heavy,
    /// Median (3) then Kalman.
    Kalman,
    /// Median then moving average, sized from [`FilterSettings`].
    Custom,
}

impl FilterPreset {
    pub const ALL: [FilterPreset; 6] = [
        FilterPreset::None,
        FilterPreset::Light,
        FilterPreset::Standard,
        FilterPreset::Heavy,
        FilterPreset::Kalman,
        FilterPreset::Custom,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FilterPreset::None => "none",
            FilterPreset::Light => "light",
            FilterPreset::Standard => "standard",
            FilterPreset::Heavy => "heavy",
            FilterPreset::Kalman => "kalman",
            FilterPreset::Custom => "custom",
        }
    }

    /// Resolves a preset by name, falling back to `standard` for unknown names.
    pub fn from_name_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            warn!("unknown filter preset {:?}, using standard", name);
            FilterPreset::Standard
        })
    }

    /// Builds the chain with default parameters.
    pub fn build(&self) -> FilterChain {
        self.build_with(&FilterSettings::default())
    }

    /// Builds the chain, taking Kalman noise and custom window sizes from `settings`.
    pub fn build_with(&self, settings: &FilterSettings) -> FilterChain {
        let filters: Vec<Box<dyn Filter>> = match self {
            FilterPreset::None => Vec::new(),
            FilterPreset::Light => vec![Box::new(MovingAverageFilter::new(3))],
            FilterPreset::Standard => vec![
                Box::new(MedianFilter::new(3)),
                Box::new(MovingAverageFilter::new(3)),
            ],
            FilterPreset::Heavy => vec![
                Box::new(MedianFilter::new(5)),
                Box::new(MovingAverageFilter::new(7)),
            ],
            FilterPreset::Kalman => vec![
                Box::new(MedianFilter::new(3)),
                Box::new(KalmanFilter::new(
                    settings.kalman_process_noise,
                    settings.kalman_measurement_noise,
                )),
            ],
            FilterPreset::Custom => vec![
                Box::new(MedianFilter::new(settings.median_window)),
                Box::new(MovingAverageFilter::new(settings.moving_average_window)),
            ],
        };
        FilterChain::new(filters)
    }
}

impl fmt::Display for FilterPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterPreset {
    type Err = SonarError;

    fn from_str(s: &str) -> SonarResult<Self> {
        let wanted = s.trim().to_lowercase();
        FilterPreset::ALL
            .into_iter()
            .find(|preset| preset.name() == wanted)
            .ok_or_else(|| SonarError::InvalidConfig(format!("unknown filter preset: {s}")))
    }
}

/// Filtering section of the session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub preset: String,
    pub enabled: bool,
    pub moving_average_window: usize,
    pub median_window: usize,
    pub kalman_process_noise: f64,
    pub kalman_measurement_noise: f64,
    pub spike_threshold: f64,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            preset: FilterPreset::Standard.name().to_string(),
            enabled: true,
            moving_average_window: moving_average::DEFAULT_WINDOW,
            median_window: median::DEFAULT_WINDOW,
            kalman_process_noise: kalman::DEFAULT_PROCESS_NOISE,
            kalman_measurement_noise: kalman::DEFAULT_MEASUREMENT_NOISE,
            spike_threshold: DEFAULT_SPIKE_THRESHOLD,
        }
    }
}

impl FilterSettings {
    pub fn resolved_preset(&self) -> FilterPreset {
        FilterPreset::from_name_or_default(&self.preset)
    }

    /// Chain for the configured preset, with the configured enabled flag.
    pub fn build_chain(&self) -> FilterChain {
        let mut chain = self.resolved_preset().build_with(self);
        chain.set_enabled(self.enabled);
        chain
    }
}
