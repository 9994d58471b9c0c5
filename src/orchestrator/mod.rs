//! Session and phase orchestration
//!
//! ```text
//! run(workload)
//!   for each phase (sequential):
//!     spawn one blocking worker per session ──> connect, run tasks, close
//!     await every worker                     (barrier)
//!     record phase completion                ──> PhaseRegistry, EXEC_PHASE
//!   EXEC_EXPERIMENT
//! ```
//!
//! Sessions of a phase run concurrently, each on its own connection. A
//! phase ends only after every one of its sessions has terminated,
//! successfully or not, and the next phase starts only after that.

mod result;
mod session;
mod state;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::client::ConnectionFactory;
use crate::config::{PhaseFailurePolicy, RunConfig};
use crate::task::{build_executor, TaskExecutor};
use crate::telemetry::{EventRecorder, EventType, Status};
use crate::workload::{Phase, TaskLibrary, Workload};
use crate::{Error, Result};

pub use result::{PhaseResult, SessionOutcome, WorkloadResult};
pub use state::{
    time_travel_clause, PhaseRegistry, PhaseTiming, WorkloadState, TIME_TRAVEL_PARAMETER,
};

use session::{run_session, SessionContext};

/// Drives a workload through its phases.
pub struct Orchestrator {
    config: RunConfig,
    library: Arc<TaskLibrary>,
    factory: Arc<dyn ConnectionFactory>,
    executor: Arc<dyn TaskExecutor>,
    recorder: EventRecorder,
    registry: Arc<PhaseRegistry>,
    state: watch::Sender<WorkloadState>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("templates", &self.library.len())
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator using the executor selected by `config`.
    #[must_use]
    pub fn new(
        config: RunConfig,
        library: TaskLibrary,
        factory: Arc<dyn ConnectionFactory>,
        recorder: EventRecorder,
    ) -> Self {
        let executor = build_executor(
            config.executor(),
            recorder.clone(),
            config.executor_arguments(),
        );
        let (state, _) = watch::channel(WorkloadState::NotStarted);
        Self {
            config,
            library: Arc::new(library),
            factory,
            executor,
            recorder,
            registry: Arc::new(PhaseRegistry::new()),
            state,
        }
    }

    /// Replace the configured executor.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Run configuration.
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Current workload state.
    #[must_use]
    pub fn state(&self) -> WorkloadState {
        self.state.borrow().clone()
    }

    /// Watch state transitions.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<WorkloadState> {
        self.state.subscribe()
    }

    /// Phases terminated in the current or last run.
    #[must_use]
    pub fn phase_registry(&self) -> &PhaseRegistry {
        &self.registry
    }

    /// Completion timestamp of a terminated phase.
    #[must_use]
    pub fn phase_completion(&self, phase_id: &str) -> Option<DateTime<Utc>> {
        self.registry.completion(phase_id)
    }

    /// Run every phase of `workload` in order.
    ///
    /// Session failures do not make this return `Err`: they are reported in
    /// the [`WorkloadResult`], whose state is `Failed`. Use
    /// [`WorkloadResult::into_result`] to turn them into an error.
    ///
    /// # Errors
    ///
    /// Returns `InvalidWorkload` if the workload fails validation; nothing
    /// runs in that case.
    pub async fn run(&self, workload: &Workload) -> Result<WorkloadResult> {
        workload.validate(&self.library)?;
        self.registry.clear();

        let started_at = Utc::now();
        info!(
            workload_id = %workload.id,
            version = workload.version,
            phases = workload.phases.len(),
            "Starting workload"
        );

        let mut phases = Vec::with_capacity(workload.phases.len());
        let mut failed: Option<(usize, String)> = None;
        for (phase_index, phase) in workload.phases.iter().enumerate() {
            self.state.send_replace(WorkloadState::Running {
                phase_index,
                phase_id: phase.id.clone(),
            });

            let result = self.run_phase(phase_index, phase).await;
            let succeeded = result.is_success();
            phases.push(result);

            if !succeeded {
                if failed.is_none() {
                    failed = Some((phase_index, phase.id.clone()));
                }
                if self.config.failure_policy() == PhaseFailurePolicy::AbortWorkload {
                    warn!(phase_id = %phase.id, "Phase failed, aborting workload");
                    break;
                }
                warn!(phase_id = %phase.id, "Phase failed, continuing workload");
            }
        }

        let (state, status, payload) = match failed {
            Some((phase_index, phase_id)) => {
                let payload = format!("phase '{phase_id}' failed");
                (
                    WorkloadState::Failed {
                        phase_index,
                        phase_id,
                    },
                    Status::Failure,
                    Some(payload),
                )
            }
            None => (WorkloadState::Completed, Status::Success, None),
        };
        self.recorder.record(
            started_at,
            &workload.id,
            EventType::ExecExperiment,
            status,
            payload,
        );
        self.recorder.sink().flush();
        self.state.send_replace(state.clone());

        info!(workload_id = %workload.id, ?state, "Workload finished");
        Ok(WorkloadResult {
            workload_id: workload.id.clone(),
            state,
            started_at,
            ended_at: Utc::now(),
            phases,
        })
    }

    async fn run_phase(&self, phase_index: usize, phase: &Phase) -> PhaseResult {
        let started_at = Utc::now();
        info!(phase_id = %phase.id, sessions = phase.sessions.len(), "Starting phase");

        let base_values = Arc::new(self.config.parameter_values().clone());
        let handles: Vec<_> = phase
            .sessions
            .iter()
            .enumerate()
            .map(|(session_index, session)| {
                let ctx = SessionContext {
                    phase_index,
                    phase_id: phase.id.clone(),
                    phase_time_travel: phase.time_travel_phase_id.clone(),
                    session_index,
                    session: session.clone(),
                    library: Arc::clone(&self.library),
                    factory: Arc::clone(&self.factory),
                    executor: Arc::clone(&self.executor),
                    recorder: self.recorder.clone(),
                    registry: Arc::clone(&self.registry),
                    base_values: Arc::clone(&base_values),
                    seed: self.config.permutation_seed(),
                };
                tokio::task::spawn_blocking(move || run_session(ctx))
            })
            .collect();

        // Barrier: every session terminates before the phase does.
        let mut sessions = Vec::with_capacity(handles.len());
        for (session_index, handle) in handles.into_iter().enumerate() {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    error!(
                        phase_id = %phase.id,
                        session = session_index,
                        error = %join_error,
                        "Session worker died"
                    );
                    let error = Error::WorkerPanicked(join_error.to_string());
                    self.recorder.record(
                        started_at,
                        &session::session_event_id(&phase.id, session_index),
                        EventType::ExecSession,
                        Status::Failure,
                        Some(error.to_string()),
                    );
                    SessionOutcome {
                        index: session_index,
                        target_endpoint: phase.sessions[session_index].target_endpoint,
                        started_at,
                        ended_at: Utc::now(),
                        error: Some(error),
                    }
                }
            };
            sessions.push(outcome);
        }

        let ended_at = Utc::now();
        let failed_sessions = sessions.iter().filter(|s| !s.is_success()).count();
        let status = if failed_sessions == 0 {
            Status::Success
        } else {
            Status::Failure
        };
        self.registry.record(
            &phase.id,
            PhaseTiming {
                started_at,
                ended_at,
                status,
            },
        );
        self.recorder.record(
            started_at,
            &phase.id,
            EventType::ExecPhase,
            status,
            (failed_sessions > 0)
                .then(|| format!("{failed_sessions} of {} sessions failed", sessions.len())),
        );
        info!(phase_id = %phase.id, failed_sessions, "Phase finished");

        PhaseResult {
            phase_id: phase.id.clone(),
            started_at,
            ended_at,
            sessions,
        }
    }
}
