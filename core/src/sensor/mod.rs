//! Contract for anything that produces distance readings.

pub mod line;

pub use line::{format_reading_line, parse_reading_line};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::prelude::{Sample, SonarResult};

/// Observer invoked for each new reading.
pub type SampleCallback = Box<dyn Fn(Sample) + Send>;

/// Handle returned by [`SampleSource::connect`], used to disconnect later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Display metadata for a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub connected: bool,
    pub running: bool,
}

/// A producer of timestamped `(angle, distance)` readings.
///
/// `start` and `stop` are idempotent. Once `stop` returns, no registered
/// callback is invoked again until the next `start`.
pub trait SampleSource: Send {
    fn connect(&mut self, callback: SampleCallback) -> SubscriptionId;

    /// Returns `false` if `id` was not connected.
    fn disconnect(&mut self, id: SubscriptionId) -> bool;

    fn start(&mut self) -> SonarResult<()>;

    fn stop(&mut self);

    fn is_running(&self) -> bool;

    fn is_connected(&self) -> bool;

    fn latest_reading(&self) -> Option<Sample>;

    fn info(&self) -> SourceInfo;
}

/// Fan-out of readings to every connected callback.
///
/// Callbacks run while the subscriber list is locked, so a `disconnect` that
/// returns has also waited out any delivery in progress. A callback must not
/// connect or disconnect on the bus that is calling it.
#[derive(Clone, Default)]
pub struct SampleBus {
    subscribers: Arc<Mutex<Vec<(SubscriptionId, SampleCallback)>>>,
    next_id: Arc<AtomicU64>,
}

impl SampleBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn subscribers(&self) -> MutexGuard<'_, Vec<(SubscriptionId, SampleCallback)>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn connect(&self, callback: SampleCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers().push((id, callback));
        id
    }

    pub fn disconnect(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    /// Delivers `sample` to every subscriber and returns how many were called.
    pub fn emit(&self, sample: Sample) -> usize {
        let subscribers = self.subscribers();
        for (_, callback) in subscribers.iter() {
            callback(sample);
        }
        subscribers.len()
    }

    /// Delivers `sample` only if `gate` is still set once the subscriber lock
    /// is held. Returns `None` when the gate was closed.
    pub fn emit_while(&self, gate: &AtomicBool, sample: Sample) -> Option<usize> {
        let subscribers = self.subscribers();
        if !gate.load(Ordering::SeqCst) {
            return None;
        }
        for (_, callback) in subscribers.iter() {
            callback(sample);
        }
        Some(subscribers.len())
    }

    /// Blocks until any delivery in progress has returned.
    pub fn quiesce(&self) {
        drop(self.subscribers());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }
}

/// Source fed by the caller, one reading at a time.
///
/// Clones share the same subscribers and lifecycle, so one clone can be handed
/// to a processor while another keeps pushing readings.
#[derive(Clone, Default)]
pub struct ManualSource {
    bus: SampleBus,
    running: Arc<AtomicBool>,
    latest: Arc<Mutex<Option<Sample>>>,
}

impl ManualSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `sample` if the source is running. Returns whether it was delivered.
    pub fn push(&self, sample: Sample) -> bool {
        if self.bus.emit_while(&self.running, sample).is_none() {
            return false;
        }
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(sample);
        true
    }
}

impl SampleSource for ManualSource {
    fn connect(&mut self, callback: SampleCallback) -> SubscriptionId {
        self.bus.connect(callback)
    }

    fn disconnect(&mut self, id: SubscriptionId) -> bool {
        self.bus.disconnect(id)
    }

    fn start(&mut self) -> SonarResult<()> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Must not be called from inside one of this source's callbacks.
    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.bus.quiesce();
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
            name: "Manual Source",
            description: "Readings pushed directly by the caller",
            connected: self.is_connected(),
            running: self.is_running(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn counting_callback(counter: &Arc<AtomicU64>) -> SampleCallback {
        let counter = counter.clone();
        Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn bus_fans_out_and_disconnects() {
        let bus = SampleBus::new();
        let hits = Arc::new(AtomicU64::new(0));
        let first = bus.connect(counting_callback(&hits));
        bus.connect(counting_callback(&hits));

        let sample = Sample::new(10, 50.0).unwrap();
        assert_eq!(bus.emit(sample), 2);
        assert!(bus.disconnect(first));
        assert!(!bus.disconnect(first));
        assert_eq!(bus.emit(sample), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn manual_source_only_delivers_while_running() {
        let mut source = ManualSource::new();
        let hits = Arc::new(AtomicU64::new(0));
        source.connect(counting_callback(&hits));
        let sample = Sample::new(90, 120.0).unwrap();

        assert!(!source.push(sample));
        source.start().unwrap();
        source.start().unwrap();
        assert!(source.push(sample));
        source.stop();
        source.stop();
        assert!(!source.push(sample));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(source.latest_reading(), Some(sample));
        assert!(!source.info().running);
    }

    #[test]
    fn manual_source_stop_waits_out_pending_delivery() {
        let mut source = ManualSource::new();
        let hits = Arc::new(AtomicU64::new(0));
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let counter = hits.clone();
        source.connect(Box::new(move |sample: Sample| {
            counter.fetch_add(1, Ordering::SeqCst);
            if sample.angle == 1 {
                let _ = entered_tx.send(());
                let _ = release_rx.lock().unwrap().recv();
            }
        }));
        source.start().unwrap();

        let first = source.clone();
        let blocked = thread::spawn(move || first.push(Sample::new(1, 10.0).unwrap()));
        entered_rx.recv_timeout(Duration::from_secs(2)).unwrap();

        let second = source.clone();
        let racing = thread::spawn(move || second.push(Sample::new(2, 20.0).unwrap()));
        thread::sleep(Duration::from_millis(30));

        let mut stopper = source.clone();
        let observed = hits.clone();
        let stopped = thread::spawn(move || {
            stopper.stop();
            observed.load(Ordering::SeqCst)
        });
        thread::sleep(Duration::from_millis(30));
        release_tx.send(()).unwrap();

        assert!(blocked.join().unwrap());
        let racing_delivered = racing.join().unwrap();
        let at_stop = stopped.join().unwrap();
        thread::sleep(Duration::from_millis(20));

        assert_eq!(hits.load(Ordering::SeqCst), at_stop);
        assert!(!racing_delivered);
        assert_eq!(at_stop, 1);
        assert!(!source.push(Sample::new(3, 30.0).unwrap()));
    }

    #[test]
    fn manual_source_clones_share_subscribers() {
        let mut source = ManualSource::new();
        let feeder = source.clone();
        let hits = Arc::new(AtomicU64::new(0));
        source.connect(counting_callback(&hits));
        source.start().unwrap();

        feeder.push(Sample::new(0, 1.0).unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(feeder.is_running());
    }
}
