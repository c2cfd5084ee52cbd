use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sonarcore::prelude::{Sample, MAX_ANGLE};
use std::f64::consts::PI;

const MIN_DISTANCE: f64 = 2.0;
const MAX_DISTANCE: f64 = 200.0;

/// Room layout the synthetic scanner sweeps across.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Flat wall at 100cm.
    Wall,
    /// Wall at 150cm with a 20 degree wide object drifting in front of it.
    MovingObject,
    /// Trapezoidal room with a pillar and an object that comes and goes.
    Realistic,
}

/// Configuration for generating synthetic scan data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub scenario: Scenario,
    pub scan_interval_ms: u64,
    /// Standard deviation of the Gaussian jitter, in cm.
    pub noise_level: f64,
    pub outlier_probability: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::Realistic,
            scan_interval_ms: 20,
            noise_level: 5.0,
            outlier_probability: 0.05,
            seed: 0,
        }
    }
}

/// Named generator setups for quick comparisons of the filter presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioPreset {
    CleanWall,
    NoisyWall,
    VeryNoisy,
    MovingObstacle,
    RealisticRoom,
}

impl ScenarioPreset {
    pub const ALL: [ScenarioPreset; 5] = [
        ScenarioPreset::CleanWall,
        ScenarioPreset::NoisyWall,
        ScenarioPreset::VeryNoisy,
        ScenarioPreset::MovingObstacle,
        ScenarioPreset::RealisticRoom,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioPreset::CleanWall => "clean_wall",
            ScenarioPreset::NoisyWall => "noisy_wall",
            ScenarioPreset::VeryNoisy => "very_noisy",
            ScenarioPreset::MovingObstacle => "moving_obstacle",
            ScenarioPreset::RealisticRoom => "realistic_room",
        }
    }

    pub fn from_name_or_default(name: &str) -> Self {
        let wanted = name.trim().to_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|preset| preset.name() == wanted)
            .unwrap_or_else(|| {
                log::warn!("unknown scenario {:?}, using realistic_room", name);
                ScenarioPreset::RealisticRoom
            })
    }

    pub fn config(&self) -> GeneratorConfig {
        let (scenario, noise_level, outlier_probability) = match self {
            ScenarioPreset::CleanWall => (Scenario::Wall, 1.0, 0.0),
            ScenarioPreset::NoisyWall => (Scenario::Wall, 5.0, 0.03),
            ScenarioPreset::VeryNoisy => (Scenario::Wall, 15.0, 0.1),
            ScenarioPreset::MovingObstacle => (Scenario::MovingObject, 5.0, 0.03),
            ScenarioPreset::RealisticRoom => (Scenario::Realistic, 5.0, 0.05),
        };
        GeneratorConfig {
            scenario,
            noise_level,
            outlier_probability,
            ..Default::default()
        }
    }
}

/// Produces one reading per call while sweeping 0..180..0 a degree at a time.
pub struct ScanGenerator {
    config: GeneratorConfig,
    rng: StdRng,
    current_angle: u16,
    sweeping_up: bool,
    object_angle: f64,
    object_direction: f64,
    ticks: u64,
}

impl ScanGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            current_angle: 0,
            sweeping_up: true,
            object_angle: 90.0,
            object_direction: 1.0,
            ticks: 0,
        }
    }

    pub fn next_reading(&mut self) -> Sample {
        let angle = self.current_angle;
        let base = self.base_distance(angle);

        let mut distance = base + self.gaussian() * self.config.noise_level;
        if self.rng.gen_bool(self.config.outlier_probability.clamp(0.0, 1.0)) {
            distance = if self.rng.gen_bool(0.5) {
                self.rng.gen_range(2.0..15.0)
            } else {
                self.rng.gen_range(180.0..200.0)
            };
        }
        let distance = distance.clamp(MIN_DISTANCE, MAX_DISTANCE);

        self.advance_angle();
        self.ticks += 1;

        Sample { angle, distance }
    }

    fn advance_angle(&mut self) {
        if self.sweeping_up {
            self.current_angle += 1;
            if self.current_angle >= MAX_ANGLE {
                self.sweeping_up = false;
            }
        } else {
            self.current_angle = self.current_angle.saturating_sub(1);
            if self.current_angle == 0 {
                self.sweeping_up = true;
            }
        }
    }

    /// Standard normal deviate (Box-Muller).
    fn gaussian(&mut self) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    fn base_distance(&mut self, angle: u16) -> f64 {
        match self.config.scenario {
            Scenario::Wall => 100.0,
            Scenario::MovingObject => {
                self.object_angle += self.object_direction * 0.5;
                if self.object_angle > 140.0 {
                    self.object_direction = -1.0;
                } else if self.object_angle < 40.0 {
                    self.object_direction = 1.0;
                }

                if (f64::from(angle) - self.object_angle).abs() < 10.0 {
                    50.0
                } else {
                    150.0
                }
            }
            Scenario::Realistic => self.room_distance(angle),
        }
    }

    fn room_distance(&self, angle: u16) -> f64 {
        let a = f64::from(angle);
        let mut base = if angle < 30 {
            40.0 + a * 2.0
        } else if angle > 150 {
            40.0 + (180.0 - a) * 2.0
        } else {
            100.0 + 20.0 * (a * 2.0).to_radians().sin()
        };

        // Pillar
        if (55..=75).contains(&angle) {
            base = base.min(45.0 + (a - 65.0).abs() * 2.0);
        }

        // Object present one cycle out of three
        if (self.ticks / 100) % 3 == 0 {
            let center = 90.0 + 30.0 * (self.ticks as f64 * 0.05).sin();
            if (a - center).abs() < 15.0 {
                base = base.min(35.0 + (a - center).abs() * 2.0);
            }
        }

        base
    }
}
