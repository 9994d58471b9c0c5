//! Scripted in-process driver
//!
//! Runs no SQL at all: failures and result sets are scripted per SQL
//! fragment, and every attempt is recorded. Clones share one script, so a
//! handle kept by the caller observes what a connection-owned clone did.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Driver, DriverError, QueryResult, ResultMode};

#[derive(Debug)]
struct FailureRule {
    fragment: String,
    /// `None` fails forever
    remaining: Option<u32>,
    error: DriverError,
}

#[derive(Debug, Default)]
struct Script {
    failures: Vec<FailureRule>,
    responses: Vec<(String, QueryResult)>,
    close_error: Option<DriverError>,
    attempts: Vec<String>,
    completed: Vec<String>,
    closed: bool,
}

/// Driver whose behavior is scripted by SQL fragment.
///
/// Fragments are matched with `str::contains`; the first matching rule wins.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDriver {
    script: Arc<Mutex<Script>>,
}

impl ScriptedDriver {
    /// Driver on which every statement succeeds with no rows.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail the first `times` attempts of statements containing `fragment`.
    #[must_use]
    pub fn fail_times(self, fragment: impl Into<String>, times: u32, error: DriverError) -> Self {
        self.lock().failures.push(FailureRule {
            fragment: fragment.into(),
            remaining: Some(times),
            error,
        });
        self
    }

    /// Fail every attempt of statements containing `fragment`.
    #[must_use]
    pub fn fail_always(self, fragment: impl Into<String>, error: DriverError) -> Self {
        self.lock().failures.push(FailureRule {
            fragment: fragment.into(),
            remaining: None,
            error,
        });
        self
    }

    /// Return `result` for collected statements containing `fragment`.
    #[must_use]
    pub fn respond_with(self, fragment: impl Into<String>, result: QueryResult) -> Self {
        self.lock().responses.push((fragment.into(), result));
        self
    }

    /// Make `close` fail with `error`.
    #[must_use]
    pub fn fail_on_close(self, error: DriverError) -> Self {
        self.lock().close_error = Some(error);
        self
    }

    /// Every attempted statement, failed attempts included, in order.
    #[must_use]
    pub fn attempts(&self) -> Vec<String> {
        self.lock().attempts.clone()
    }

    /// Statements that completed successfully, in order.
    #[must_use]
    pub fn completed(&self) -> Vec<String> {
        self.lock().completed.clone()
    }

    /// Number of attempts of statements containing `fragment`.
    #[must_use]
    pub fn attempt_count(&self, fragment: &str) -> usize {
        self.lock()
            .attempts
            .iter()
            .filter(|sql| sql.contains(fragment))
            .count()
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl Driver for ScriptedDriver {
    fn run(
        &mut self,
        sql: &str,
        mode: ResultMode,
    ) -> std::result::Result<Option<QueryResult>, DriverError> {
        let mut script = self.lock();
        if script.closed {
            return Err(DriverError::new("driver is closed"));
        }
        script.attempts.push(sql.to_string());

        let failing = script.failures.iter_mut().find(|rule| {
            sql.contains(rule.fragment.as_str()) && rule.remaining.map_or(true, |n| n > 0)
        });
        if let Some(rule) = failing {
            if let Some(remaining) = rule.remaining.as_mut() {
                *remaining -= 1;
            }
            return Err(rule.error.clone());
        }

        script.completed.push(sql.to_string());
        match mode {
            ResultMode::Discard => Ok(None),
            ResultMode::Collect => Ok(script
                .responses
                .iter()
                .find(|(fragment, _)| sql.contains(fragment.as_str()))
                .map(|(_, result)| result.clone())),
        }
    }

    fn close(&mut self) -> std::result::Result<(), DriverError> {
        let mut script = self.lock();
        script.closed = true;
        script.close_error.clone().map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_times_then_succeed() {
        let mut driver = ScriptedDriver::new().fail_times("x", 1, DriverError::new("boom"));
        assert!(driver.run("select x", ResultMode::Discard).is_err());
        assert!(driver.run("select x", ResultMode::Discard).is_ok());
        assert_eq!(driver.attempt_count("x"), 2);
        assert_eq!(driver.completed().len(), 1);
    }

    #[test]
    fn test_clones_share_script() {
        let handle = ScriptedDriver::new();
        let mut owned = handle.clone();
        owned.run("a", ResultMode::Discard).unwrap();
        owned.close().unwrap();
        assert_eq!(handle.attempts(), vec!["a".to_string()]);
        assert!(handle.is_closed());
    }
}
