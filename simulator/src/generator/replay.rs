use anyhow::Context;
use log::{info, warn};
use sonarcore::prelude::{Sample, SonarError, SonarResult};
use sonarcore::sensor::{
    parse_reading_line, SampleBus, SampleCallback, SampleSource, SourceInfo, SubscriptionId,
};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Plays back a recorded `angle,distance` log as if it came from the scanner.
///
/// Lines that fail to parse are skipped. Stopping and restarting resumes from
/// the next unplayed line.
pub struct ReplaySource {
    lines: Arc<Vec<String>>,
    position: usize,
    bus: SampleBus,
    running: Arc<AtomicBool>,
    latest: Arc<Mutex<Option<Sample>>>,
    worker: Option<JoinHandle<usize>>,
    interval: Duration,
}

impl ReplaySource {
    pub fn from_lines(lines: Vec<String>, interval: Duration) -> Self {
        Self {
            lines: Arc::new(lines),
            position: 0,
            bus: SampleBus::new(),
            running: Arc::new(AtomicBool::new(false)),
            latest: Arc::new(Mutex::new(None)),
            worker: None,
            interval,
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P, interval: Duration) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading scan log {}", path_ref.display()))?;
        let lines = contents.lines().map(str::to_owned).collect();
        Ok(Self::from_lines(lines, interval))
    }

    /// Blocks until every remaining line has been played.
    pub fn wait(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.position = worker.join().unwrap_or(self.lines.len());
            self.running.store(false, Ordering::SeqCst);
        }
    }

    pub fn remaining(&self) -> usize {
        self.lines.len().saturating_sub(self.position)
    }
}

impl SampleSource for ReplaySource {
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

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let latest = self.latest.clone();
        let bus = self.bus.clone();
        let lines = self.lines.clone();
        let interval = self.interval;
        let start = self.position;

        let spawned = thread::Builder::new()
            .name("replay-source".into())
            .spawn(move || {
                let mut position = start;
                while position < lines.len() && running.load(Ordering::SeqCst) {
                    let line = &lines[position];
                    position += 1;
                    match parse_reading_line(line) {
                        Ok(Some(sample)) => {
                            *latest.lock().unwrap_or_else(PoisonError::into_inner) =
                                Some(sample);
                            bus.emit(sample);
                            if !interval.is_zero() {
                                thread::sleep(interval);
                            }
                        }
                        Ok(None) => {}
                        Err(err) => warn!("skipping line {}: {}", position, err),
                    }
                }
                running.store(false, Ordering::SeqCst);
                position
            });

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                info!("replaying {} lines", self.remaining());
                Ok(())
            }
            Err(err) => {
                self.running.store(false, Ordering::SeqCst);
                Err(SonarError::Source(format!("spawning replay thread: {err}")))
            }
        }
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.wait();
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn is_connected(&self) -> bool {
        self.is_running()
    }

    fn latest_reading(&self) -> Option<Sample> {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: "Replay Source",
            description: "Recorded angle,distance log played back line by line",
            connected: self.is_connected(),
            running: self.is_running(),
        }
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        self.stop();
    }
}
