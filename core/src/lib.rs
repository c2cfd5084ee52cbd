//! Filtering and data-processing core for the ultrasonic sonar scanner.
//!
//! Raw `(angle, distance)` readings arrive from a [`sensor::SampleSource`],
//! pass through a per-angle [`filters::FilterChain`] inside the
//! [`processing::DataProcessor`], and are handed to downstream consumers as
//! raw, filtered and quality-warning events.

pub mod filters;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod sensor;
pub mod telemetry;

pub use prelude::{Sample, SonarError, SonarResult};
