//! Outcomes of sessions, phases and workloads

use chrono::{DateTime, Utc};

use super::WorkloadState;
use crate::{Error, Result};

/// Terminal state of one session.
#[derive(Debug)]
pub struct SessionOutcome {
    pub(crate) index: usize,
    pub(crate) target_endpoint: usize,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) ended_at: DateTime<Utc>,
    pub(crate) error: Option<Error>,
}

impl SessionOutcome {
    /// Position within the phase.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Endpoint the session's connection targeted.
    #[must_use]
    pub const fn target_endpoint(&self) -> usize {
        self.target_endpoint
    }

    /// When the session began, before opening its connection.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When the session reached its terminal state.
    #[must_use]
    pub const fn ended_at(&self) -> DateTime<Utc> {
        self.ended_at
    }

    /// First failure of the session, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Whether the session ran every task.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Terminal state of one phase: every session has terminated.
#[derive(Debug)]
pub struct PhaseResult {
    pub(crate) phase_id: String,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) ended_at: DateTime<Utc>,
    pub(crate) sessions: Vec<SessionOutcome>,
}

impl PhaseResult {
    /// Phase id.
    #[must_use]
    pub fn phase_id(&self) -> &str {
        &self.phase_id
    }

    /// Before the first session started.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// After the last session terminated.
    #[must_use]
    pub const fn ended_at(&self) -> DateTime<Utc> {
        self.ended_at
    }

    /// Session outcomes in declared order.
    #[must_use]
    pub fn sessions(&self) -> &[SessionOutcome] {
        &self.sessions
    }

    /// Whether every session succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.sessions.iter().all(SessionOutcome::is_success)
    }

    /// Sessions that failed, in declared order.
    pub fn failed_sessions(&self) -> impl Iterator<Item = &SessionOutcome> {
        self.sessions.iter().filter(|s| !s.is_success())
    }
}

/// Result of one workload run.
#[derive(Debug)]
pub struct WorkloadResult {
    pub(crate) workload_id: String,
    pub(crate) state: WorkloadState,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) ended_at: DateTime<Utc>,
    pub(crate) phases: Vec<PhaseResult>,
}

impl WorkloadResult {
    /// Workload id.
    #[must_use]
    pub fn workload_id(&self) -> &str {
        &self.workload_id
    }

    /// Terminal state: `Completed` or `Failed`.
    #[must_use]
    pub const fn state(&self) -> &WorkloadState {
        &self.state
    }

    /// Start of the run.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// End of the run.
    #[must_use]
    pub const fn ended_at(&self) -> DateTime<Utc> {
        self.ended_at
    }

    /// Results of the phases that ran, in order.
    #[must_use]
    pub fn phases(&self) -> &[PhaseResult] {
        &self.phases
    }

    /// Result of one phase by id.
    #[must_use]
    pub fn phase(&self, phase_id: &str) -> Option<&PhaseResult> {
        self.phases.iter().find(|p| p.phase_id == phase_id)
    }

    /// Whether the workload completed without failures.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.state, WorkloadState::Completed)
    }

    /// First failure: earliest failed phase, lowest failed session index.
    #[must_use]
    pub fn first_error(&self) -> Option<&Error> {
        self.phases
            .iter()
            .flat_map(|p| p.sessions.iter())
            .find_map(SessionOutcome::error)
    }

    /// Turn a failed run into `Error::SessionFailed` carrying the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first session failure of the run.
    pub fn into_result(self) -> Result<Self> {
        let position = self.phases.iter().enumerate().find_map(|(p, phase)| {
            phase
                .sessions
                .iter()
                .position(|s| !s.is_success())
                .map(|s| (p, s))
        });
        let Some((phase_pos, session_pos)) = position else {
            return Ok(self);
        };

        let mut phases = self.phases;
        let mut phase = phases.swap_remove(phase_pos);
        let session = phase.sessions.swap_remove(session_pos);
        let source = session
            .error
            .unwrap_or_else(|| Error::Other("session failed".to_string()));
        Err(Error::SessionFailed {
            phase_id: phase.phase_id,
            session: session.index,
            source: Box::new(source),
        })
    }
}
