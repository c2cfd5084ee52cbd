use std::collections::BTreeMap;

use serde::Serialize;

use super::processor::{ProcessingStats, SharedProcessor};
use crate::filters::{Filter, FilterInfo};

/// Noise figures shown next to the raw/filtered comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NoiseReductionStats {
    /// Mean `|raw - filtered|` over angles present in both maps.
    pub average_reduction: f64,
    pub readings: u64,
    pub spikes: u64,
}

/// Everything a side-by-side view needs, captured in one lock.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonSnapshot {
    pub comparison_mode: bool,
    pub filtering_enabled: bool,
    pub chain: FilterInfo,
    pub raw: BTreeMap<u16, f64>,
    pub filtered: BTreeMap<u16, f64>,
    pub stats: ProcessingStats,
    pub noise_reduction: NoiseReductionStats,
}

/// Read-only view over a processor for raw vs filtered display.
#[derive(Clone)]
pub struct ComparisonDataProvider {
    processor: SharedProcessor,
    comparison_mode: bool,
}

impl ComparisonDataProvider {
    pub fn new(processor: SharedProcessor) -> Self {
        Self {
            processor,
            comparison_mode: false,
        }
    }

    pub fn set_comparison_mode(&mut self, enabled: bool) {
        self.comparison_mode = enabled;
    }

    pub fn comparison_mode(&self) -> bool {
        self.comparison_mode
    }

    /// Returns `(raw, filtered)` copies taken under the same lock.
    pub fn comparison_data(&self) -> (BTreeMap<u16, f64>, BTreeMap<u16, f64>) {
        let processor = self.processor.lock();
        (processor.get_raw_data(), processor.get_filtered_data())
    }

    pub fn noise_reduction_stats(&self) -> NoiseReductionStats {
        let (raw, filtered) = self.comparison_data();
        noise_reduction(&raw, &filtered, &self.processor.get_stats())
    }

    pub fn snapshot(&self) -> ComparisonSnapshot {
        let processor = self.processor.lock();
        let raw = processor.get_raw_data();
        let filtered = processor.get_filtered_data();
        let stats = processor.get_stats();

        ComparisonSnapshot {
            comparison_mode: self.comparison_mode,
            filtering_enabled: processor.is_filtering_enabled(),
            chain: processor.filter_chain().info(),
            noise_reduction: noise_reduction(&raw, &filtered, &stats),
            raw,
            filtered,
            stats,
        }
    }
}

fn noise_reduction(
    raw: &BTreeMap<u16, f64>,
    filtered: &BTreeMap<u16, f64>,
    stats: &ProcessingStats,
) -> NoiseReductionStats {
    if raw.is_empty() {
        return NoiseReductionStats::default();
    }

    let diffs: Vec<f64> = raw
        .iter()
        .filter_map(|(angle, r)| filtered.get(angle).map(|f| (r - f).abs()))
        .collect();
    let average_reduction = if diffs.is_empty() {
        0.0
    } else {
        diffs.iter().sum::<f64>() / diffs.len() as f64
    };

    NoiseReductionStats {
        average_reduction,
        readings: stats.readings_processed,
        spikes: stats.spikes_detected,
    }
}
