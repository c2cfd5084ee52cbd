use crate::generator::scenario::{GeneratorConfig, ScenarioPreset};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use sonarcore::filters::FilterSettings;
use std::fs;
use std::path::Path;

/// Readings in one full sweep and back (0..=180..=1).
pub const SWEEP_READINGS: usize = 360;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub filter: FilterSettings,
    pub sensor: GeneratorConfig,
    /// Readings generated by an offline run.
    pub samples: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            filter: FilterSettings::default(),
            sensor: GeneratorConfig::default(),
            samples: SWEEP_READINGS * 5,
        }
    }
}

impl SessionConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading session config {}", path_ref.display()))?;
        let config: SessionConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing session config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(scenario: &str, preset: &str, samples: usize, seed: u64) -> Self {
        let sensor = GeneratorConfig {
            seed,
            ..ScenarioPreset::from_name_or_default(scenario).config()
        };
        let filter = FilterSettings {
            preset: preset.to_string(),
            ..Default::default()
        };
        Self {
            filter,
            sensor,
            samples,
        }
    }
}
