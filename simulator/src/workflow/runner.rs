use crate::generator::{GeneratorConfig, MockSensor, ReplaySource, ScanGenerator, ScenarioPreset};
use crate::workflow::config::SessionConfig;
use anyhow::Context;
use log::info;
use serde::Serialize;
use sonarcore::filters::{Filter, FilterPreset};
use sonarcore::processing::{
    ComparisonDataProvider, DataProcessor, NoiseReductionStats, ProcessingStats, SharedProcessor,
};
use sonarcore::sensor::{ManualSource, SampleSource};
use sonarcore::telemetry::MetricsSnapshot;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// Summary printed after a run and served to the bridge.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub preset: String,
    pub stats: ProcessingStats,
    pub average_noise_reduction: Option<f64>,
    pub noise_reduction: NoiseReductionStats,
    pub angles_covered: usize,
    pub metrics: MetricsSnapshot,
}

/// Owns the processor for one session and swaps sources in and out of it.
#[derive(Clone)]
pub struct Runner {
    config: SessionConfig,
    processor: SharedProcessor,
    provider: ComparisonDataProvider,
    active_preset: Arc<Mutex<FilterPreset>>,
}

impl Runner {
    pub fn new(config: SessionConfig) -> Self {
        let processor = SharedProcessor::new(DataProcessor::with_settings(&config.filter));
        let mut provider = ComparisonDataProvider::new(processor.clone());
        provider.set_comparison_mode(true);
        let active_preset = Arc::new(Mutex::new(config.filter.resolved_preset()));
        Self {
            config,
            processor,
            provider,
            active_preset,
        }
    }

    pub fn processor(&self) -> &SharedProcessor {
        &self.processor
    }

    pub fn provider(&self) -> &ComparisonDataProvider {
        &self.provider
    }

    /// Preset behind the chain currently installed in the processor.
    pub fn active_preset(&self) -> FilterPreset {
        *self
            .active_preset
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn attach(&self, source: Box<dyn SampleSource>) {
        if let Some(mut previous) = self.processor.set_sensor(source) {
            previous.stop();
        }
    }

    /// Generates `config.samples` readings synchronously and reports on them.
    pub fn run_offline(&self) -> anyhow::Result<RunReport> {
        let source = ManualSource::new();
        self.attach(Box::new(source.clone()));
        self.processor
            .start_sensor()
            .context("starting offline source")?;

        let mut generator = ScanGenerator::new(self.config.sensor.clone());
        for _ in 0..self.config.samples {
            source.push(generator.next_reading());
        }
        self.processor.stop_sensor();

        Ok(self.report())
    }

    /// Plays a recorded scan log through the processor and waits for it to finish.
    pub fn run_replay<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<RunReport> {
        let replay = ReplaySource::from_path(path, Duration::ZERO)?;
        self.attach(Box::new(replay));
        self.processor
            .start_sensor()
            .context("starting replay source")?;

        while self
            .processor
            .with_sensor(|source| source.is_running())
            .unwrap_or(false)
        {
            thread::sleep(Duration::from_millis(10));
        }
        self.processor.stop_sensor();

        Ok(self.report())
    }

    /// Attaches a live mock sensor for the configured scenario and starts it.
    pub fn start_live(&self) -> anyhow::Result<()> {
        self.attach(Box::new(MockSensor::new(self.config.sensor.clone())));
        self.processor
            .start_sensor()
            .context("starting mock sensor")?;
        Ok(())
    }

    /// Replaces the live sensor with `preset` and clears accumulated data.
    pub fn switch_scenario(&self, preset: ScenarioPreset) -> anyhow::Result<()> {
        let config = GeneratorConfig {
            scan_interval_ms: self.config.sensor.scan_interval_ms,
            seed: self.config.sensor.seed,
            ..preset.config()
        };
        self.attach(Box::new(MockSensor::new(config)));
        self.processor.reset();
        self.processor
            .start_sensor()
            .with_context(|| format!("starting scenario {}", preset.name()))?;
        info!("switched to scenario {}", preset.name());
        Ok(())
    }

    /// Swaps in the chain for `name`, keeping the current filtering toggle.
    pub fn apply_preset(&self, name: &str) -> FilterPreset {
        let preset = FilterPreset::from_name_or_default(name);
        let mut chain = preset.build_with(&self.config.filter);

        let mut processor = self.processor.lock();
        chain.set_enabled(processor.is_filtering_enabled());
        processor.set_filter_chain(chain);
        *self
            .active_preset
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = preset;
        preset
    }

    pub fn stop(&self) {
        self.processor.stop_sensor();
    }

    pub fn report(&self) -> RunReport {
        let stats = self.processor.get_stats();
        RunReport {
            preset: self.active_preset().name().to_string(),
            stats,
            average_noise_reduction: stats.average_noise_reduction(),
            noise_reduction: self.provider.noise_reduction_stats(),
            angles_covered: self.processor.get_raw_data().len(),
            metrics: self.processor.metrics().snapshot(),
        }
    }
}
