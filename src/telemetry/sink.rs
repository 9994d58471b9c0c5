//! Telemetry sinks - append-only event storage shared by all sessions

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::error;

use super::{EventInfo, EventType, Status};
use crate::Result;

/// Destination for telemetry events.
///
/// Sinks are shared by every concurrently running session. Each
/// `write_event` call must land atomically; no ordering across sessions is
/// promised. Sinks never fail towards the caller.
pub trait TelemetrySink: Send + Sync {
    /// Append one event.
    fn write_event(&self, event: EventInfo);

    /// Push buffered events to durable storage, if any.
    fn flush(&self) {}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory sink.
///
/// ## Design
///
/// A single mutex-guarded vector. Events from one session appear in the
/// order that session wrote them; interleaving across sessions follows lock
/// acquisition order.
#[derive(Debug, Default)]
pub struct MemoryTelemetrySink {
    events: Mutex<Vec<EventInfo>>,
}

impl MemoryTelemetrySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events in append order.
    #[must_use]
    pub fn events(&self) -> Vec<EventInfo> {
        lock(&self.events).clone()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.events).len()
    }

    /// Whether no event has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.events).is_empty()
    }

    /// Events for one subject id, in append order.
    #[must_use]
    pub fn events_for(&self, event_id: &str) -> Vec<EventInfo> {
        lock(&self.events)
            .iter()
            .filter(|e| e.event_id() == event_id)
            .cloned()
            .collect()
    }

    /// Events of one type, in append order.
    #[must_use]
    pub fn events_of_type(&self, event_type: EventType) -> Vec<EventInfo> {
        lock(&self.events)
            .iter()
            .filter(|e| e.event_type() == event_type)
            .cloned()
            .collect()
    }

    /// Number of events with the given type and status.
    #[must_use]
    pub fn count(&self, event_type: EventType, status: Status) -> usize {
        lock(&self.events)
            .iter()
            .filter(|e| e.event_type() == event_type && e.status() == status)
            .count()
    }

    /// Drop all recorded events.
    pub fn clear(&self) {
        lock(&self.events).clear();
    }
}

impl TelemetrySink for MemoryTelemetrySink {
    fn write_event(&self, event: EventInfo) {
        lock(&self.events).push(event);
    }
}

/// Sink writing one JSON object per line.
///
/// Write failures are logged and the event is dropped.
#[derive(Debug)]
pub struct JsonLinesTelemetrySink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesTelemetrySink {
    /// Create (or append to) the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be opened.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Target file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TelemetrySink for JsonLinesTelemetrySink {
    fn write_event(&self, event: EventInfo) {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                error!(event_id = %event.event_id(), error = %e, "Failed to serialize event");
                return;
            }
        };
        let mut writer = lock(&self.writer);
        if let Err(e) = writeln!(writer, "{line}") {
            error!(path = %self.path.display(), error = %e, "Failed to write event");
        }
    }

    fn flush(&self) {
        if let Err(e) = lock(&self.writer).flush() {
            error!(path = %self.path.display(), error = %e, "Failed to flush events");
        }
    }
}

impl Drop for JsonLinesTelemetrySink {
    fn drop(&mut self) {
        self.flush();
    }
}
