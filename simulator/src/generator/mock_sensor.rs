use crate::generator::scenario::{GeneratorConfig, ScanGenerator};
use log::info;
use sonarcore::prelude::{Sample, SonarError, SonarResult};
use sonarcore::sensor::{SampleBus, SampleCallback, SampleSource, SourceInfo, SubscriptionId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Simulated scanner that emits generated readings from a background thread.
pub struct MockSensor {
    bus: SampleBus,
    running: Arc<AtomicBool>,
    latest: Arc<Mutex<Option<Sample>>>,
    generator: Option<ScanGenerator>,
    worker: Option<JoinHandle<ScanGenerator>>,
    interval: Duration,
}

impl MockSensor {
    pub fn new(config: GeneratorConfig) -> Self {
        let interval = Duration::from_millis(config.scan_interval_ms);
        Self {
            bus: SampleBus::new(),
            running: Arc::new(AtomicBool::new(false)),
            latest: Arc::new(Mutex::new(None)),
            generator: Some(ScanGenerator::new(config)),
            worker: None,
            interval,
        }
    }
}

impl SampleSource for MockSensor {
    fn connect(&mut self, callback: SampleCallback) -> SubscriptionId {
        self.bus.connect(callback)
    }

    fn disconnect(&mut self, id: SubscriptionId) -> bool {
        self.bus.disconnect(id)
    }

    fn start(&mut self) -> SonarResult<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        let Some(mut generator) = self.generator.take() else {
            return Err(SonarError::Source("scan generator unavailable".into()));
        };

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let latest = self.latest.clone();
        let bus = self.bus.clone();
        let interval = self.interval;

        let spawned = thread::Builder::new()
            .name("mock-sensor".into())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    let sample = generator.next_reading();
                    *latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(sample);
                    bus.emit(sample);
                    thread::sleep(interval);
                }
                generator
            });

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                info!("mock sensor started ({:?} per reading)", self.interval);
                Ok(())
            }
            Err(err) => {
                self.running.store(false, Ordering::SeqCst);
                Err(SonarError::Source(format!("spawning mock sensor thread: {err}")))
            }
        }
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            match worker.join() {
                Ok(generator) => self.generator = Some(generator),
                Err(_) => log::error!("mock sensor thread panicked"),
            }
            info!("mock sensor stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.worker.is_some() && self.running.load(Ordering::SeqCst)
    }

    fn is_connected(&self) -> bool {
        self.is_running()
    }

    fn latest_reading(&self) -> Option<Sample> {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: "Mock Sensor",
            description: "Simulated sensor with configurable noise and scenarios",
            connected: self.is_connected(),
            running: self.is_running(),
        }
    }
}

impl Drop for MockSensor {
    fn drop(&mut self) {
        self.stop();
    }
}
