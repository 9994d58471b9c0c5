//! Sequential task execution

use chrono::Utc;
use tracing::{debug, error, warn};

use super::policy::{Disposition, FailFast, FailurePolicy, SkipOnError};
use crate::client::{Connection, QueryResult, ResultMode};
use crate::telemetry::{EventRecorder, Status};
use crate::workload::{replace_parameters, FileExec, ParameterValues, StatementExec, TaskExec};
use crate::Result;

/// Runs a resolved task over a connection.
pub trait TaskExecutor: Send + Sync {
    /// Execute every file of the task in order.
    ///
    /// # Errors
    ///
    /// Returns the first unrecovered statement error; the remainder of the
    /// file and task is not executed.
    fn execute_task(
        &self,
        connection: &mut dyn Connection,
        task: &TaskExec,
        values: &ParameterValues,
    ) -> Result<()>;

    /// Execute a single statement, recording its event.
    ///
    /// Returns the rows with [`ResultMode::Collect`]; `None` when discarding
    /// or when the statement was skipped.
    ///
    /// # Errors
    ///
    /// Returns the statement error if it is not skipped.
    fn execute_statement(
        &self,
        connection: &mut dyn Connection,
        statement: &StatementExec,
        values: &ParameterValues,
        mode: ResultMode,
    ) -> Result<Option<QueryResult>>;
}

/// Executes files and statements strictly in order, consulting a
/// [`FailurePolicy`] when a statement fails.
#[derive(Debug, Clone)]
pub struct SequentialExecutor<P> {
    recorder: EventRecorder,
    policy: P,
}

/// Aborts on the first statement failure.
pub type FailFastExecutor = SequentialExecutor<FailFast>;

/// Skips statements whose failure matches a configured substring.
pub type SkipOnErrorExecutor = SequentialExecutor<SkipOnError>;

impl<P: FailurePolicy> SequentialExecutor<P> {
    /// Executor emitting events through `recorder`.
    #[must_use]
    pub const fn new(recorder: EventRecorder, policy: P) -> Self {
        Self { recorder, policy }
    }

    /// Failure policy in use.
    #[must_use]
    pub const fn policy(&self) -> &P {
        &self.policy
    }

    fn execute_file(
        &self,
        connection: &mut dyn Connection,
        file: &FileExec,
        values: &ParameterValues,
    ) -> Result<()> {
        for statement in &file.statements {
            self.execute_statement(connection, statement, values, ResultMode::Discard)?;
        }
        Ok(())
    }
}

impl FailFastExecutor {
    /// Fail-fast executor.
    #[must_use]
    pub const fn fail_fast(recorder: EventRecorder) -> Self {
        Self::new(recorder, FailFast)
    }
}

impl<P: FailurePolicy> TaskExecutor for SequentialExecutor<P> {
    fn execute_task(
        &self,
        connection: &mut dyn Connection,
        task: &TaskExec,
        values: &ParameterValues,
    ) -> Result<()> {
        for file in &task.files {
            let file_start = Utc::now();
            if let Err(err) = self.execute_file(connection, file, values) {
                error!(
                    file_id = %file.id,
                    task_id = %task.id,
                    error = %err,
                    "Exception executing file"
                );
                self.recorder.record_file(file_start, &file.id, Status::Failure);
                return Err(err);
            }
            self.recorder.record_file(file_start, &file.id, Status::Success);
        }
        Ok(())
    }

    fn execute_statement(
        &self,
        connection: &mut dyn Connection,
        statement: &StatementExec,
        values: &ParameterValues,
        mode: ResultMode,
    ) -> Result<Option<QueryResult>> {
        let start = Utc::now();
        let resolved = replace_parameters(statement, values);
        debug!(statement_id = %statement.id, "Executing statement");

        let outcome = match mode {
            ResultMode::Discard => connection.execute(&resolved.statement).map(|()| None),
            ResultMode::Collect => connection.execute_query(&resolved.statement).map(Some),
        };

        match outcome {
            Ok(result) => {
                self.recorder
                    .record_statement(start, &statement.id, Status::Success, None);
                Ok(result)
            }
            Err(err) => {
                let logged = format!(
                    "Exception executing statement: {}, statement text: {}; error message: {err}",
                    statement.id, resolved.statement
                );
                match self.policy.disposition(&err) {
                    Disposition::Skip => {
                        warn!(
                            statement_id = %statement.id,
                            policy = self.policy.name(),
                            "{logged}"
                        );
                        self.recorder
                            .record_statement(start, &statement.id, Status::Warn, Some(logged));
                        Ok(None)
                    }
                    Disposition::Fail => {
                        error!(
                            statement_id = %statement.id,
                            policy = self.policy.name(),
                            "{logged}"
                        );
                        self.recorder
                            .record_statement(start, &statement.id, Status::Failure, Some(logged));
                        Err(err)
                    }
                }
            }
        }
    }
}
