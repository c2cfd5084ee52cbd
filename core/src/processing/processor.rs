use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use log::debug;
use serde::Serialize;

use crate::filters::presets::DEFAULT_SPIKE_THRESHOLD;
use crate::filters::{AngleTable, Filter, FilterChain, FilterPreset, FilterSettings};
use crate::prelude::{Sample, SonarResult};
use crate::sensor::{SampleCallback, SampleSource, SubscriptionId};
use crate::telemetry::{LogManager, MetricsRecorder};

/// Notification sent to downstream consumers for every processed reading.
///
/// For a given sample, `Raw` is always delivered before `Filtered`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessorEvent {
    Raw { angle: u16, distance: f64 },
    Filtered { angle: u16, distance: f64 },
    QualityWarning { angle: u16, delta: f64, message: String },
}

pub type EventObserver = Box<dyn FnMut(&ProcessorEvent) + Send>;

/// Counters accumulated since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProcessingStats {
    pub readings_processed: u64,
    pub spikes_detected: u64,
    /// Sum of `|raw - filtered|` over all processed readings, in cm.
    pub noise_filtered: f64,
}

impl ProcessingStats {
    /// Mean `|raw - filtered|` per reading, or `None` before the first reading.
    pub fn average_noise_reduction(&self) -> Option<f64> {
        if self.readings_processed == 0 {
            None
        } else {
            Some(self.noise_filtered / self.readings_processed as f64)
        }
    }
}

/// Runs raw readings through the active filter chain and keeps the latest
/// raw and filtered value for every angle.
pub struct DataProcessor {
    chain: FilterChain,
    raw: AngleTable<Option<f64>>,
    filtered: AngleTable<Option<f64>>,
    last_readings: AngleTable<Option<f64>>,
    spike_threshold: f64,
    stats: ProcessingStats,
    observers: Vec<EventObserver>,
    logger: LogManager,
}

impl DataProcessor {
    /// Processor with the `standard` preset and the default spike threshold.
    pub fn new() -> Self {
        Self::with_chain(FilterPreset::Standard.build(), DEFAULT_SPIKE_THRESHOLD)
    }

    pub fn with_settings(settings: &FilterSettings) -> Self {
        Self::with_chain(settings.build_chain(), settings.spike_threshold)
    }

    pub fn with_chain(chain: FilterChain, spike_threshold: f64) -> Self {
        Self {
            chain,
            raw: AngleTable::new(),
            filtered: AngleTable::new(),
            last_readings: AngleTable::new(),
            spike_threshold,
            stats: ProcessingStats::default(),
            observers: Vec::new(),
            logger: LogManager::new("processor"),
        }
    }

    /// Replaces the active chain. State held by the old chain is dropped with it.
    pub fn set_filter_chain(&mut self, chain: FilterChain) {
        self.logger.record(&format!(
            "filter chain swapped ({} filters, enabled: {})",
            chain.len(),
            chain.is_enabled()
        ));
        self.chain = chain;
    }

    pub fn filter_chain(&self) -> &FilterChain {
        &self.chain
    }

    pub fn filter_chain_mut(&mut self) -> &mut FilterChain {
        &mut self.chain
    }

    pub fn enable_filtering(&mut self, enabled: bool) {
        self.chain.set_enabled(enabled);
        self.logger
            .record(&format!("filtering {}", if enabled { "enabled" } else { "disabled" }));
    }

    pub fn is_filtering_enabled(&self) -> bool {
        self.chain.is_enabled()
    }

    pub fn spike_threshold(&self) -> f64 {
        self.spike_threshold
    }

    pub fn set_spike_threshold(&mut self, threshold: f64) {
        self.spike_threshold = threshold;
    }

    /// Registers a consumer of raw, filtered and quality-warning events.
    ///
    /// Observers run synchronously inside the processing step and must not
    /// call back into the processor.
    pub fn subscribe(&mut self, observer: EventObserver) {
        self.observers.push(observer);
    }

    /// Clears stored readings, filter state and statistics.
    pub fn reset(&mut self) {
        self.raw.clear();
        self.filtered.clear();
        self.last_readings.clear();
        self.chain.reset();
        self.stats = ProcessingStats::default();
        self.logger.record("processor reset");
    }

    pub fn get_raw_data(&self) -> BTreeMap<u16, f64> {
        collect_table(&self.raw)
    }

    pub fn get_filtered_data(&self) -> BTreeMap<u16, f64> {
        collect_table(&self.filtered)
    }

    pub fn get_stats(&self) -> ProcessingStats {
        self.stats
    }

    /// Processes one reading and returns the filtered distance.
    ///
    /// Readings outside the scan range are rejected before any state changes.
    pub fn handle_sample(&mut self, sample: Sample) -> SonarResult<f64> {
        sample.validate()?;
        let Sample { angle, distance } = sample;

        self.stats.readings_processed += 1;
        self.check_data_quality(angle, distance);

        set_slot(&mut self.raw, angle, distance);
        self.notify(&ProcessorEvent::Raw { angle, distance });

        let filtered = self.chain.process(angle, distance);
        set_slot(&mut self.filtered, angle, filtered);
        self.notify(&ProcessorEvent::Filtered {
            angle,
            distance: filtered,
        });

        self.stats.noise_filtered += (distance - filtered).abs();
        set_slot(&mut self.last_readings, angle, distance);

        debug!("angle {angle}: raw {distance:.1} -> filtered {filtered:.1}");
        Ok(filtered)
    }

    fn check_data_quality(&mut self, angle: u16, distance: f64) {
        let Some(previous) = self.last_readings.get(angle).copied().flatten() else {
            return;
        };

        let delta = (distance - previous).abs();
        if delta > self.spike_threshold {
            self.stats.spikes_detected += 1;
            let message = format!("Spike detected at {angle}°: {delta:.1}cm change");
            self.logger.warn(&message);
            self.notify(&ProcessorEvent::QualityWarning {
                angle,
                delta,
                message,
            });
        }
    }

    fn notify(&mut self, event: &ProcessorEvent) {
        for observer in &mut self.observers {
            observer(event);
        }
    }
}

impl Default for DataProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn set_slot(table: &mut AngleTable<Option<f64>>, angle: u16, value: f64) {
    if let Some(slot) = table.get_mut(angle) {
        *slot = Some(value);
    }
}

fn collect_table(table: &AngleTable<Option<f64>>) -> BTreeMap<u16, f64> {
    table
        .iter()
        .filter_map(|(angle, value)| value.map(|v| (angle, v)))
        .collect()
}

struct AttachedSource {
    source: Box<dyn SampleSource>,
    subscription: SubscriptionId,
}

/// Thread-safe handle around a [`DataProcessor`] and its active source.
///
/// Readings delivered from a source thread, chain swaps and resets all go
/// through the same lock, so they never interleave.
#[derive(Clone)]
pub struct SharedProcessor {
    processor: Arc<Mutex<DataProcessor>>,
    source: Arc<Mutex<Option<AttachedSource>>>,
    metrics: Arc<MetricsRecorder>,
}

impl SharedProcessor {
    pub fn new(processor: DataProcessor) -> Self {
        Self {
            processor: Arc::new(Mutex::new(processor)),
            source: Arc::new(Mutex::new(None)),
            metrics: Arc::new(MetricsRecorder::new()),
        }
    }

    /// Locks the processor for direct access.
    pub fn lock(&self) -> MutexGuard<'_, DataProcessor> {
        self.processor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn attached(&self) -> MutexGuard<'_, Option<AttachedSource>> {
        self.source.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attaches `source`, detaching the previous one, which is handed back
    /// still in whatever running state it was in.
    pub fn set_sensor(&self, mut source: Box<dyn SampleSource>) -> Option<Box<dyn SampleSource>> {
        let mut attached = self.attached();
        let previous = attached.take().map(|mut old| {
            old.source.disconnect(old.subscription);
            old.source
        });

        let subscription = source.connect(self.sample_callback());
        let info = source.info();
        *attached = Some(AttachedSource {
            source,
            subscription,
        });
        drop(attached);

        self.lock()
            .logger
            .record(&format!("attached source {}", info.name));
        previous
    }

    /// Detaches and returns the active source, if any.
    pub fn detach_sensor(&self) -> Option<Box<dyn SampleSource>> {
        self.attached().take().map(|mut old| {
            old.source.disconnect(old.subscription);
            old.source
        })
    }

    /// Runs `f` against the attached source.
    pub fn with_sensor<R>(&self, f: impl FnOnce(&mut dyn SampleSource) -> R) -> Option<R> {
        let mut attached = self.attached();
        attached.as_mut().map(|active| f(&mut *active.source))
    }

    pub fn start_sensor(&self) -> SonarResult<bool> {
        self.with_sensor(|source| source.start())
            .transpose()
            .map(|started| started.is_some())
    }

    pub fn stop_sensor(&self) {
        self.with_sensor(|source| source.stop());
    }

    fn sample_callback(&self) -> SampleCallback {
        let processor: Weak<Mutex<DataProcessor>> = Arc::downgrade(&self.processor);
        let metrics = self.metrics.clone();
        Box::new(move |sample: Sample| {
            let Some(processor) = processor.upgrade() else {
                return;
            };
            let mut processor = processor.lock().unwrap_or_else(PoisonError::into_inner);
            match processor.handle_sample(sample) {
                Ok(_) => metrics.record_processed(),
                Err(err) => {
                    metrics.record_rejected(sample);
                    processor.logger.warn(&format!("dropping reading: {err}"));
                }
            }
        })
    }

    pub fn handle_sample(&self, sample: Sample) -> SonarResult<f64> {
        let result = self.lock().handle_sample(sample);
        match result {
            Ok(_) => self.metrics.record_processed(),
            Err(_) => self.metrics.record_rejected(sample),
        }
        result
    }

    pub fn set_filter_chain(&self, chain: FilterChain) {
        self.lock().set_filter_chain(chain);
    }

    pub fn enable_filtering(&self, enabled: bool) {
        self.lock().enable_filtering(enabled);
    }

    pub fn subscribe(&self, observer: EventObserver) {
        self.lock().subscribe(observer);
    }

    pub fn reset(&self) {
        self.lock().reset();
    }

    pub fn get_raw_data(&self) -> BTreeMap<u16, f64> {
        self.lock().get_raw_data()
    }

    pub fn get_filtered_data(&self) -> BTreeMap<u16, f64> {
        self.lock().get_filtered_data()
    }

    pub fn get_stats(&self) -> ProcessingStats {
        self.lock().get_stats()
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }
}
