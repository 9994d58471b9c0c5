//! Run configuration
//!
//! Deserializable from JSON (every field has a default) or assembled with
//! [`RunConfig::builder`].

use serde::{Deserialize, Serialize};

use crate::task::{ExecutorArguments, ExecutorKind};
use crate::workload::ParameterValues;

/// What the orchestrator does after a phase with a failed session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseFailurePolicy {
    /// Stop; later phases do not run.
    #[default]
    AbortWorkload,
    /// Run the remaining phases; the workload still ends failed.
    ContinueWorkload,
}

/// Settings for one experiment run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    max_num_retries: u32,
    executor: ExecutorKind,
    executor_arguments: ExecutorArguments,
    failure_policy: PhaseFailurePolicy,
    parameter_values: ParameterValues,
    permutation_seed: Option<u64>,
}

impl RunConfig {
    /// Create a builder starting from defaults.
    #[must_use]
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    /// Retries per statement on top of the first attempt.
    ///
    /// Connections get this budget from their factory, see
    /// `SqliteConnectionFactory::from_config`.
    #[must_use]
    pub const fn max_num_retries(&self) -> u32 {
        self.max_num_retries
    }

    /// Task execution strategy.
    #[must_use]
    pub const fn executor(&self) -> ExecutorKind {
        self.executor
    }

    /// Strategy arguments.
    #[must_use]
    pub const fn executor_arguments(&self) -> &ExecutorArguments {
        &self.executor_arguments
    }

    /// Phase failure policy.
    #[must_use]
    pub const fn failure_policy(&self) -> PhaseFailurePolicy {
        self.failure_policy
    }

    /// Experiment-level parameter values.
    #[must_use]
    pub const fn parameter_values(&self) -> &ParameterValues {
        &self.parameter_values
    }

    /// Seed for permute-order shuffling, if runs should be reproducible.
    #[must_use]
    pub const fn permutation_seed(&self) -> Option<u64> {
        self.permutation_seed
    }
}

/// Builder for `RunConfig`.
#[derive(Debug, Default)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    /// Set retries per statement.
    #[must_use]
    pub const fn max_num_retries(mut self, retries: u32) -> Self {
        self.config.max_num_retries = retries;
        self
    }

    /// Set the task execution strategy.
    #[must_use]
    pub const fn executor(mut self, kind: ExecutorKind) -> Self {
        self.config.executor = kind;
        self
    }

    /// Set one strategy argument.
    #[must_use]
    pub fn executor_argument(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config
            .executor_arguments
            .insert(key.into(), value.into());
        self
    }

    /// Set the phase failure policy.
    #[must_use]
    pub const fn failure_policy(mut self, policy: PhaseFailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    /// Set one experiment-level parameter value.
    #[must_use]
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.parameter_values.insert(name.into(), value.into());
        self
    }

    /// Make permute-order reproducible.
    #[must_use]
    pub const fn permutation_seed(mut self, seed: u64) -> Self {
        self.config.permutation_seed = Some(seed);
        self
    }

    /// Build the `RunConfig`.
    #[must_use]
    pub fn build(self) -> RunConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::SKIP_ERRONEOUS_QUERY_STRINGS_KEY;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.max_num_retries(), 0);
        assert_eq!(config.executor(), ExecutorKind::FailFast);
        assert_eq!(config.failure_policy(), PhaseFailurePolicy::AbortWorkload);
        assert!(config.permutation_seed().is_none());
    }

    #[test]
    fn test_builder() {
        let config = RunConfig::builder()
            .max_num_retries(3)
            .executor(ExecutorKind::SkipOnError)
            .executor_argument(SKIP_ERRONEOUS_QUERY_STRINGS_KEY, "conflict")
            .failure_policy(PhaseFailurePolicy::ContinueWorkload)
            .parameter("database", "tpcds")
            .permutation_seed(9)
            .build();

        assert_eq!(config.max_num_retries(), 3);
        assert_eq!(
            config.executor_arguments().get(SKIP_ERRONEOUS_QUERY_STRINGS_KEY).map(String::as_str),
            Some("conflict")
        );
        assert_eq!(config.parameter_values().get("database").map(String::as_str), Some("tpcds"));
        assert_eq!(config.permutation_seed(), Some(9));
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: RunConfig = serde_json::from_str(
            r#"{
                "max_num_retries": 2,
                "executor": "skip_on_error",
                "executor_arguments": { "skip_erroneous_query_strings": "a;b" },
                "failure_policy": "continue_workload"
            }"#,
        )
        .unwrap();
        assert_eq!(config.max_num_retries(), 2);
        assert_eq!(config.executor(), ExecutorKind::SkipOnError);
        assert_eq!(config.failure_policy(), PhaseFailurePolicy::ContinueWorkload);
        assert!(config.parameter_values().is_empty());
    }
}
