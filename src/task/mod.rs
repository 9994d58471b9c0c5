//! Task execution strategies
//!
//! A strategy walks a resolved task's files and statements in order and
//! decides, per failed statement, whether the failure is fatal or
//! skippable. Strategies are selected by configuration:
//!
//! | `ExecutorKind`  | Policy        | On unmatched failure | On matched failure |
//! |-----------------|---------------|----------------------|--------------------|
//! | `fail_fast`     | [`FailFast`]    | FAILURE, abort       | n/a                |
//! | `skip_on_error` | [`SkipOnError`] | FAILURE, abort       | WARN, continue     |
//!
//! New strategies implement [`FailurePolicy`] (or [`TaskExecutor`]
//! directly) without touching the fail-fast baseline.

mod executor;
mod policy;

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::telemetry::EventRecorder;

pub use executor::{FailFastExecutor, SequentialExecutor, SkipOnErrorExecutor, TaskExecutor};
pub use policy::{
    Disposition, FailFast, FailurePolicy, SkipOnError, SKIP_ERRONEOUS_QUERY_DELIMITER,
    SKIP_ERRONEOUS_QUERY_STRINGS_KEY,
};

/// Free-form strategy arguments.
pub type ExecutorArguments = FxHashMap<String, String>;

/// Built-in strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorKind {
    /// Abort on the first failed statement.
    #[default]
    FailFast,
    /// Skip failed statements whose error matches `skip_erroneous_query_strings`.
    SkipOnError,
}

/// Build the configured strategy.
#[must_use]
pub fn build_executor(
    kind: ExecutorKind,
    recorder: EventRecorder,
    arguments: &ExecutorArguments,
) -> Arc<dyn TaskExecutor> {
    match kind {
        ExecutorKind::FailFast => Arc::new(FailFastExecutor::fail_fast(recorder)),
        ExecutorKind::SkipOnError => {
            let policy = arguments
                .get(SKIP_ERRONEOUS_QUERY_STRINGS_KEY)
                .map_or_else(SkipOnError::default, |raw| SkipOnError::parse(raw));
            Arc::new(SkipOnErrorExecutor::new(recorder, policy))
        }
    }
}
