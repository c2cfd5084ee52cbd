pub mod comparison;
pub mod processor;

pub use comparison::{ComparisonDataProvider, ComparisonSnapshot, NoiseReductionStats};
pub use processor::{DataProcessor, EventObserver, ProcessingStats, ProcessorEvent, SharedProcessor};
