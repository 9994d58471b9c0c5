//! Workload state machine and phase completion registry

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::telemetry::Status;

/// Parameter that receives the time-travel clause.
pub const TIME_TRAVEL_PARAMETER: &str = "asof";

/// Progress of one workload run.
///
/// `NotStarted → Running(0) → … → Running(n) → Completed`, or `Failed` at
/// the first phase that had a failed session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WorkloadState {
    /// No run has begun.
    #[default]
    NotStarted,
    /// A phase is executing.
    Running {
        /// Position of the phase.
        phase_index: usize,
        /// Id of the phase.
        phase_id: String,
    },
    /// Every phase finished without a failed session.
    Completed,
    /// A phase finished with at least one failed session.
    Failed {
        /// Position of the first failed phase.
        phase_index: usize,
        /// Id of the first failed phase.
        phase_id: String,
    },
}

impl WorkloadState {
    /// Whether the run has ended.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. })
    }
}

/// Wall-clock span and outcome of a terminated phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTiming {
    /// Before the first session started.
    pub started_at: DateTime<Utc>,
    /// After the last session terminated.
    pub ended_at: DateTime<Utc>,
    /// SUCCESS iff every session succeeded.
    pub status: Status,
}

/// Terminated phases of the current run, keyed by phase id.
///
/// Read concurrently by sessions resolving time-travel references.
#[derive(Debug, Default)]
pub struct PhaseRegistry {
    phases: DashMap<String, PhaseTiming>,
}

impl PhaseRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a terminated phase.
    pub fn record(&self, phase_id: &str, timing: PhaseTiming) {
        self.phases.insert(phase_id.to_string(), timing);
    }

    /// Timing of a terminated phase.
    #[must_use]
    pub fn get(&self, phase_id: &str) -> Option<PhaseTiming> {
        self.phases.get(phase_id).map(|t| *t.value())
    }

    /// Completion timestamp of a terminated phase.
    #[must_use]
    pub fn completion(&self, phase_id: &str) -> Option<DateTime<Utc>> {
        self.get(phase_id).map(|t| t.ended_at)
    }

    /// Number of terminated phases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    /// Whether no phase has terminated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Forget all phases.
    pub fn clear(&self) {
        self.phases.clear();
    }
}

/// Clause injected as `${asof}` for tasks time-travelling to a phase.
#[must_use]
pub fn time_travel_clause(completed_at: DateTime<Utc>) -> String {
    format!(
        "TIMESTAMP AS OF '{}' ",
        completed_at.format("%Y-%m-%d %H:%M:%S%.6f")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_registry_roundtrip() {
        let registry = PhaseRegistry::new();
        assert!(registry.is_empty());
        let t0 = Utc::now();
        registry.record(
            "load",
            PhaseTiming {
                started_at: t0,
                ended_at: t0,
                status: Status::Success,
            },
        );
        assert_eq!(registry.completion("load"), Some(t0));
        assert!(registry.completion("other").is_none());
        registry.clear();
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_time_travel_clause_format() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(
            time_travel_clause(ts),
            "TIMESTAMP AS OF '2024-03-01 12:30:05.000000' "
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(!WorkloadState::NotStarted.is_terminal());
        assert!(WorkloadState::Completed.is_terminal());
        assert!(WorkloadState::Failed {
            phase_index: 0,
            phase_id: "p".into()
        }
        .is_terminal());
    }
}
