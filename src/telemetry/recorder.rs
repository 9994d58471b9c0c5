//! Event recorder - stamps and emits events for one experiment run

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{EventInfo, EventType, Status, TelemetrySink};

/// Emits events into a shared sink on behalf of one experiment run.
///
/// The experiment start time is fixed at construction and threaded into
/// every event; the end time is taken when the event is recorded.
#[derive(Clone)]
pub struct EventRecorder {
    sink: Arc<dyn TelemetrySink>,
    experiment_start: DateTime<Utc>,
}

impl fmt::Debug for EventRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRecorder")
            .field("experiment_start", &self.experiment_start)
            .finish_non_exhaustive()
    }
}

impl EventRecorder {
    /// Create a recorder for a run that started at `experiment_start`.
    #[must_use]
    pub fn new(sink: Arc<dyn TelemetrySink>, experiment_start: DateTime<Utc>) -> Self {
        Self {
            sink,
            experiment_start,
        }
    }

    /// Start time of the run.
    #[must_use]
    pub const fn experiment_start(&self) -> DateTime<Utc> {
        self.experiment_start
    }

    /// Shared sink.
    #[must_use]
    pub fn sink(&self) -> &Arc<dyn TelemetrySink> {
        &self.sink
    }

    /// Record an event that started at `start` and ends now.
    pub fn record(
        &self,
        start: DateTime<Utc>,
        event_id: &str,
        event_type: EventType,
        status: Status,
        payload: Option<String>,
    ) -> EventInfo {
        let mut event = EventInfo::new(
            self.experiment_start,
            start,
            Utc::now(),
            event_id,
            event_type,
            status,
        );
        if let Some(payload) = payload {
            event = event.with_payload(payload);
        }
        self.sink.write_event(event.clone());
        event
    }

    /// Record a file execution.
    pub fn record_file(&self, start: DateTime<Utc>, file_id: &str, status: Status) -> EventInfo {
        self.record(start, file_id, EventType::ExecFile, status, None)
    }

    /// Record a statement execution.
    pub fn record_statement(
        &self,
        start: DateTime<Utc>,
        statement_id: &str,
        status: Status,
        payload: Option<String>,
    ) -> EventInfo {
        self.record(start, statement_id, EventType::ExecStatement, status, payload)
    }
}
