//! Mock port adapters for integration tests.
//!
//! Records every collaborator call so tests can assert on the full
//! command history without hardware or a dashboard connection. Handles
//! are `Arc`-shared: the adapter box moves into the station while the
//! test keeps a reader.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use washcure::config::OperatorSettings;
use washcure::model::Channel;
use washcure::pins::PinValue;
use washcure::ports::{
    ActuatorOutput, DisplaySurface, RemoteLink, SettingsStore, StoreError,
};

// ── Actuator ──────────────────────────────────────────────────

pub type WriteLog = Arc<Mutex<Vec<(Channel, f64)>>>;

pub struct RecordingActuator {
    writes: WriteLog,
}

impl RecordingActuator {
    pub fn new() -> (Self, WriteLog) {
        let log = WriteLog::default();
        (Self { writes: log.clone() }, log)
    }
}

impl ActuatorOutput for RecordingActuator {
    fn write(&mut self, channel: Channel, value: f64) {
        self.writes.lock().unwrap().push((channel, value));
    }
}

// ── Display ───────────────────────────────────────────────────

pub struct CountingDisplay {
    redraws: Arc<AtomicUsize>,
}

impl CountingDisplay {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        (Self { redraws: count.clone() }, count)
    }
}

impl DisplaySurface for CountingDisplay {
    fn request_redraw(&mut self) {
        self.redraws.fetch_add(1, Ordering::Relaxed);
    }
}

// ── Remote link ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum LinkCall {
    Push(u8, PinValue),
    Property(u8, String, Vec<String>),
    Notify(String),
}

pub type LinkLog = Arc<Mutex<Vec<LinkCall>>>;

pub struct RecordingLink {
    calls: LinkLog,
}

impl RecordingLink {
    pub fn new() -> (Self, LinkLog) {
        let log = LinkLog::default();
        (Self { calls: log.clone() }, log)
    }
}

impl RemoteLink for RecordingLink {
    fn push(&mut self, pin: u8, value: &PinValue) {
        self.calls.lock().unwrap().push(LinkCall::Push(pin, value.clone()));
    }

    fn set_display_property(&mut self, pin: u8, key: &str, values: &[String]) {
        self.calls
            .lock()
            .unwrap()
            .push(LinkCall::Property(pin, key.to_string(), values.to_vec()));
    }

    fn notify(&mut self, message: &str) {
        self.calls.lock().unwrap().push(LinkCall::Notify(message.to_string()));
    }
}

/// Count notifications with this exact text.
pub fn notify_count(log: &LinkLog, message: &str) -> usize {
    log.lock()
        .unwrap()
        .iter()
        .filter(|c| matches!(c, LinkCall::Notify(m) if m == message))
        .count()
}

// ── Settings store ────────────────────────────────────────────

pub struct MemorySettingsStore {
    slot: Arc<Mutex<Option<OperatorSettings>>>,
    saves: Arc<AtomicUsize>,
}

impl MemorySettingsStore {
    pub fn new() -> (Self, Arc<Mutex<Option<OperatorSettings>>>, Arc<AtomicUsize>) {
        let slot = Arc::new(Mutex::new(None));
        let saves = Arc::new(AtomicUsize::new(0));
        (
            Self { slot: slot.clone(), saves: saves.clone() },
            slot,
            saves,
        )
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<OperatorSettings, StoreError> {
        self.slot.lock().unwrap().clone().ok_or(StoreError::NotFound)
    }

    fn save(&self, settings: &OperatorSettings) -> Result<(), StoreError> {
        *self.slot.lock().unwrap() = Some(settings.clone());
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
