use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::prelude::Sample;

/// Point-in-time copy of the session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub processed: u64,
    pub rejected: u64,
    /// Most recent reading refused at the processor boundary.
    pub last_rejected: Option<Sample>,
}

impl MetricsSnapshot {
    /// Share of delivered readings that were refused, or `None` before any arrived.
    pub fn rejection_rate(&self) -> Option<f64> {
        let total = self.processed + self.rejected;
        (total > 0).then(|| self.rejected as f64 / total as f64)
    }
}

/// Session-lifetime counters, kept apart from the resettable processor stats.
#[derive(Default)]
pub struct MetricsRecorder {
    processed: AtomicU64,
    rejected: AtomicU64,
    last_rejected: Mutex<Option<Sample>>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self, sample: Sample) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        *self
            .last_rejected
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(sample);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            last_rejected: *self
                .last_rejected
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }
}
