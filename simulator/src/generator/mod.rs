pub mod mock_sensor;
pub mod replay;
pub mod scenario;

pub use mock_sensor::MockSensor;
pub use replay::ReplaySource;
pub use scenario::{GeneratorConfig, ScanGenerator, ScenarioPreset};
