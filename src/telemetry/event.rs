//! Event Info - the unit telemetry record

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Level of the workload tree an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// One run of a whole workload.
    ExecExperiment,
    /// One phase (barrier-delimited stage).
    ExecPhase,
    /// One session (connection stream) within a phase.
    ExecSession,
    /// One task within a session.
    ExecTask,
    /// One file within a task.
    ExecFile,
    /// One statement within a file.
    ExecStatement,
}

impl EventType {
    /// Wire name of the event type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExecExperiment => "EXEC_EXPERIMENT",
            Self::ExecPhase => "EXEC_PHASE",
            Self::ExecSession => "EXEC_SESSION",
            Self::ExecTask => "EXEC_TASK",
            Self::ExecFile => "EXEC_FILE",
            Self::ExecStatement => "EXEC_STATEMENT",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome recorded for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Completed normally.
    Success,
    /// Failed but was skipped; execution continued.
    Warn,
    /// Failed and aborted the enclosing unit.
    Failure,
}

impl Status {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Warn => "WARN",
            Self::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one execution step.
///
/// The field set and the `EventType`/`Status` names are consumed by
/// downstream analysis tooling and must stay stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInfo {
    experiment_start_time: DateTime<Utc>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    event_id: String,
    event_type: EventType,
    status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<String>,
}

impl EventInfo {
    /// Create an event without payload.
    #[must_use]
    pub fn new(
        experiment_start_time: DateTime<Utc>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        event_id: impl Into<String>,
        event_type: EventType,
        status: Status,
    ) -> Self {
        Self {
            experiment_start_time,
            start_time,
            end_time,
            event_id: event_id.into(),
            event_type,
            status,
            payload: None,
        }
    }

    /// Attach diagnostic text.
    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Start of the experiment this event belongs to.
    #[must_use]
    pub const fn experiment_start_time(&self) -> DateTime<Utc> {
        self.experiment_start_time
    }

    /// Start of the step.
    #[must_use]
    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// End of the step.
    #[must_use]
    pub const fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    /// File, statement, task, session, phase or workload id.
    #[must_use]
    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    /// Level of the step.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Outcome of the step.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Diagnostic text, only present on non-success.
    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    /// Wall-clock duration of the step.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }
}
