use serde::{Deserialize, Serialize};

/// Highest scan angle reported by the servo, in degrees.
pub const MAX_ANGLE: u16 = 180;

/// Number of per-angle slots needed to cover `0..=MAX_ANGLE`.
pub const ANGLE_SLOTS: usize = MAX_ANGLE as usize + 1;

/// Single distance reading taken at a given servo angle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub angle: u16,
    /// Distance in centimeters.
    pub distance: f64,
}

impl Sample {
    /// Builds a sample, rejecting angles outside `0..=180` and distances that
    /// are negative or not finite.
    pub fn new(angle: u16, distance: f64) -> SonarResult<Self> {
        let sample = Self { angle, distance };
        sample.validate()?;
        Ok(sample)
    }

    pub fn validate(&self) -> SonarResult<()> {
        if self.angle > MAX_ANGLE {
            return Err(SonarError::InvalidSample(format!(
                "angle {} outside 0..={}",
                self.angle, MAX_ANGLE
            )));
        }
        if !self.distance.is_finite() || self.distance < 0.0 {
            return Err(SonarError::InvalidSample(format!(
                "distance {} at angle {} is not a non-negative number",
                self.distance, self.angle
            )));
        }
        Ok(())
    }
}

/// Common error type for the sonar core.
#[derive(thiserror::Error, Debug)]
pub enum SonarError {
    #[error("invalid sample: {0}")]
    InvalidSample(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("source failure: {0}")]
    Source(String),
    #[error("parse error: {0}")]
    Parse(String),
}

pub type SonarResult<T> = Result<T, SonarError>;
