//! One session: a connection and a sequential list of tasks

use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error, info_span};

use super::result::SessionOutcome;
use super::state::{time_travel_clause, PhaseRegistry, TIME_TRAVEL_PARAMETER};
use crate::client::{Connection, ConnectionFactory};
use crate::task::TaskExecutor;
use crate::telemetry::{EventRecorder, EventType, Status};
use crate::workload::{ParameterValues, Session, Task, TaskLibrary};
use crate::{Error, Result};

/// Everything a session worker owns while it runs on its own thread.
pub(crate) struct SessionContext {
    pub phase_index: usize,
    pub phase_id: String,
    pub phase_time_travel: Option<String>,
    pub session_index: usize,
    pub session: Session,
    pub library: Arc<TaskLibrary>,
    pub factory: Arc<dyn ConnectionFactory>,
    pub executor: Arc<dyn TaskExecutor>,
    pub recorder: EventRecorder,
    pub registry: Arc<PhaseRegistry>,
    pub base_values: Arc<ParameterValues>,
    pub seed: Option<u64>,
}

/// Event id of a session: `<phase id>/<session index>`.
pub(crate) fn session_event_id(phase_id: &str, session_index: usize) -> String {
    format!("{phase_id}/{session_index}")
}

fn session_rng(seed: Option<u64>, phase_index: usize, session_index: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(
            seed ^ ((phase_index as u64) << 32) ^ (session_index as u64),
        ),
        None => StdRng::from_entropy(),
    }
}

/// Run a session to its terminal state. Blocking.
pub(crate) fn run_session(ctx: SessionContext) -> SessionOutcome {
    let span = info_span!("session", phase_id = %ctx.phase_id, session = ctx.session_index);
    let _entered = span.enter();

    let started_at = Utc::now();
    let mut rng = session_rng(ctx.seed, ctx.phase_index, ctx.session_index);

    let error = match ctx.factory.connect(ctx.session.target_endpoint) {
        Err(err) => {
            error!(
                endpoint = ctx.session.target_endpoint,
                error = %err,
                "Failed to open connection"
            );
            Some(err)
        }
        Ok(mut connection) => {
            debug!(endpoint = ctx.session.target_endpoint, "Connection opened");
            let mut first_error = run_tasks(&ctx, connection.as_mut(), &mut rng).err();
            if let Err(close_err) = connection.close() {
                if first_error.is_none() {
                    first_error = Some(close_err);
                }
            }
            first_error
        }
    };

    let status = match &error {
        None => {
            debug!("Session completed");
            Status::Success
        }
        Some(err) => {
            error!(error = %err, "Session failed");
            Status::Failure
        }
    };
    ctx.recorder.record(
        started_at,
        &session_event_id(&ctx.phase_id, ctx.session_index),
        EventType::ExecSession,
        status,
        error.as_ref().map(ToString::to_string),
    );

    SessionOutcome {
        index: ctx.session_index,
        target_endpoint: ctx.session.target_endpoint,
        started_at,
        ended_at: Utc::now(),
        error,
    }
}

fn run_tasks(
    ctx: &SessionContext,
    connection: &mut dyn Connection,
    rng: &mut StdRng,
) -> Result<()> {
    for task in &ctx.session.tasks {
        let task_start = Utc::now();
        match run_task(ctx, connection, task, rng) {
            Ok(()) => {
                ctx.recorder.record(
                    task_start,
                    &task.template_id,
                    EventType::ExecTask,
                    Status::Success,
                    None,
                );
            }
            Err(err) => {
                error!(task_id = %task.template_id, error = %err, "Task failed");
                ctx.recorder.record(
                    task_start,
                    &task.template_id,
                    EventType::ExecTask,
                    Status::Failure,
                    Some(err.to_string()),
                );
                return Err(err);
            }
        }
    }
    Ok(())
}

fn run_task(
    ctx: &SessionContext,
    connection: &mut dyn Connection,
    task: &Task,
    rng: &mut StdRng,
) -> Result<()> {
    let mut exec = task.resolve(&ctx.library, rng)?;
    if exec.time_travel_phase_id.is_none() {
        exec.time_travel_phase_id.clone_from(&ctx.phase_time_travel);
    }

    let mut values = (*ctx.base_values).clone();
    values.extend(
        task.parameter_values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    if let Some(phase_id) = &exec.time_travel_phase_id {
        let completed_at = ctx.registry.completion(phase_id).ok_or_else(|| {
            Error::InvalidWorkload(format!("time-travel phase '{phase_id}' has not completed"))
        })?;
        values.insert(
            TIME_TRAVEL_PARAMETER.to_string(),
            time_travel_clause(completed_at),
        );
    }

    debug!(task_id = %exec.id, files = exec.files.len(), "Executing task");
    ctx.executor.execute_task(connection, &exec, &values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{DriverError, RetryingConnection, ScriptedDriver};
    use crate::task::FailFastExecutor;
    use crate::telemetry::MemoryTelemetrySink;
    use crate::workload::{FileExec, StatementExec, TaskTemplate};

    fn context(
        driver: ScriptedDriver,
        tasks: Vec<Task>,
    ) -> (SessionContext, Arc<MemoryTelemetrySink>) {
        let sink = Arc::new(MemoryTelemetrySink::new());
        let recorder = EventRecorder::new(sink.clone(), Utc::now());
        let library = TaskLibrary::new([TaskTemplate::new(
            "t",
            vec![FileExec::new(
                "f",
                vec![StatementExec::new("s", "SELECT 1 ${asof}")],
            )],
        )]);
        let factory: Arc<dyn ConnectionFactory> =
            Arc::new(move |_endpoint: usize| -> Result<Box<dyn Connection>> {
                Ok(Box::new(RetryingConnection::new(driver.clone(), 0)))
            });
        let ctx = SessionContext {
            phase_index: 0,
            phase_id: "p".into(),
            phase_time_travel: None,
            session_index: 0,
            session: Session::new(tasks),
            library: Arc::new(library),
            factory,
            executor: Arc::new(FailFastExecutor::fail_fast(recorder.clone())),
            recorder,
            registry: Arc::new(PhaseRegistry::new()),
            base_values: Arc::new(ParameterValues::default()),
            seed: Some(1),
        };
        (ctx, sink)
    }

    #[test]
    fn test_session_closes_connection_after_failure() {
        let driver = ScriptedDriver::new().fail_always("SELECT", DriverError::new("boom"));
        let (ctx, sink) = context(driver.clone(), vec![Task::new("t"), Task::new("t")]);

        let outcome = run_session(ctx);
        assert!(!outcome.is_success());
        assert!(driver.is_closed());
        // Second task never started.
        assert_eq!(sink.events_of_type(EventType::ExecTask).len(), 1);
        assert_eq!(sink.count(EventType::ExecSession, Status::Failure), 1);
    }

    #[test]
    fn test_close_failure_fails_successful_session() {
        let driver = ScriptedDriver::new().fail_on_close(DriverError::new("close refused"));
        let (ctx, _sink) = context(driver, vec![Task::new("t")]);

        let outcome = run_session(ctx);
        assert!(outcome.error().unwrap().to_string().contains("close refused"));
    }

    #[test]
    fn test_unknown_time_travel_phase_fails_task() {
        let (ctx, _sink) = context(ScriptedDriver::new(), vec![Task::new("t").time_travel("gone")]);
        let outcome = run_session(ctx);
        assert!(matches!(outcome.error(), Some(Error::InvalidWorkload(_))));
    }

    #[test]
    fn test_seeded_rng_differs_per_session() {
        use rand::Rng;
        let a: u64 = session_rng(Some(7), 0, 0).gen();
        let b: u64 = session_rng(Some(7), 0, 1).gen();
        let again: u64 = session_rng(Some(7), 0, 0).gen();
        assert_ne!(a, b);
        assert_eq!(a, again);
    }
}
