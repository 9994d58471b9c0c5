//! Connection with bounded automatic retry

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::{Driver, DriverError, ExceptionHandler, QueryResult, ResultMode};
use crate::{Error, Result};

/// One logical link to the system under test, as seen by task executors.
///
/// A connection is owned by exactly one session for that session's
/// lifetime, so implementations need `Send` but not `Sync`.
pub trait Connection: Send {
    /// Execute a statement, discarding any rows.
    ///
    /// # Errors
    ///
    /// Returns a client-level error once the statement cannot be completed.
    fn execute(&mut self, sql: &str) -> Result<()>;

    /// Execute a statement and materialize its rows.
    ///
    /// # Errors
    ///
    /// Returns a client-level error once the statement cannot be completed.
    fn execute_query(&mut self, sql: &str) -> Result<QueryResult>;

    /// Release the link.
    ///
    /// # Errors
    ///
    /// Returns `Error::Client` if the underlying link fails to close.
    fn close(&mut self) -> Result<()>;

    /// Whether the injected exception policy recognizes this error.
    fn is_exception_handled(&self, error: &DriverError) -> bool;
}

/// Connection that retries every failed statement up to `max_num_retries`
/// times before surfacing [`Error::RetriesExhausted`].
///
/// Each attempt resubmits the full statement text; statements are assumed
/// idempotent or safe to resubmit.
///
/// # Example
///
/// ```rust
/// use lst_bench::client::{Connection, DriverError, RetryingConnection, ScriptedDriver};
///
/// let driver = ScriptedDriver::new().fail_times("INSERT", 2, DriverError::new("busy"));
/// let mut connection = RetryingConnection::new(driver.clone(), 2);
///
/// connection.execute("INSERT INTO t VALUES (1)")?;
/// assert_eq!(driver.attempt_count("INSERT"), 3);
/// # Ok::<(), lst_bench::Error>(())
/// ```
pub struct RetryingConnection<D: Driver> {
    driver: D,
    max_num_retries: u32,
    exception_handler: Option<Arc<dyn ExceptionHandler>>,
    closed: bool,
}

impl<D: Driver> RetryingConnection<D> {
    /// Wrap a driver with the given retry budget.
    #[must_use]
    pub fn new(driver: D, max_num_retries: u32) -> Self {
        Self {
            driver,
            max_num_retries,
            exception_handler: None,
            closed: false,
        }
    }

    /// Inject an exception classification policy.
    #[must_use]
    pub fn with_exception_handler(mut self, handler: Arc<dyn ExceptionHandler>) -> Self {
        self.exception_handler = Some(handler);
        self
    }

    /// Configured retry budget.
    #[must_use]
    pub const fn max_num_retries(&self) -> u32 {
        self.max_num_retries
    }

    /// Whether `close` has completed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    fn run_with_retries(&mut self, sql: &str, mode: ResultMode) -> Result<Option<QueryResult>> {
        if self.closed {
            return Err(Error::Client("connection is closed".to_string()));
        }

        // Retry count is in addition to the first attempt.
        let mut error_count: u32 = 0;
        loop {
            match self.driver.run(sql, mode) {
                Ok(result) => {
                    if error_count > 0 {
                        debug!(attempts = error_count + 1, "Query succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(err) => {
                    let diagnostic = err.diagnostic();
                    let handled = self.is_exception_handled(&err);
                    if error_count >= self.max_num_retries {
                        error!(
                            attempts = error_count + 1,
                            max_retries = self.max_num_retries,
                            handled,
                            error = %diagnostic,
                            "Query execution unsuccessful, retries exhausted"
                        );
                        return Err(Error::RetriesExhausted {
                            max_retries: self.max_num_retries,
                            diagnostic,
                        });
                    }
                    error_count += 1;
                    warn!(
                        attempt = error_count,
                        max_retries = self.max_num_retries,
                        handled,
                        error = %diagnostic,
                        "Query execution failed, retrying"
                    );
                }
            }
        }
    }
}

impl<D: Driver> Connection for RetryingConnection<D> {
    fn execute(&mut self, sql: &str) -> Result<()> {
        self.run_with_retries(sql, ResultMode::Discard).map(|_| ())
    }

    fn execute_query(&mut self, sql: &str) -> Result<QueryResult> {
        Ok(self
            .run_with_retries(sql, ResultMode::Collect)?
            .unwrap_or_default())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.driver.close().map_err(|err| {
            error!(error = %err, "Failed to close connection");
            Error::Client(format!("failed to close connection: {err}"))
        })
    }

    fn is_exception_handled(&self, error: &DriverError) -> bool {
        self.exception_handler
            .as_ref()
            .is_some_and(|handler| handler.is_handled(error))
    }
}

impl<D: Driver> Drop for RetryingConnection<D> {
    fn drop(&mut self) {
        if !self.closed {
            warn!("Connection dropped without close, closing");
            // Close failures are already logged inside close().
            let _ = self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MessageSubstringHandler, ScriptedDriver, Value};

    #[test]
    fn test_success_on_first_attempt() {
        let driver = ScriptedDriver::new();
        let mut conn = RetryingConnection::new(driver.clone(), 3);
        conn.execute("CREATE TABLE t (a INT)").unwrap();
        assert_eq!(driver.attempts().len(), 1);
    }

    #[test]
    fn test_total_attempts_is_retries_plus_one() {
        let driver = ScriptedDriver::new().fail_always("SELECT", DriverError::new("timeout"));
        let mut conn = RetryingConnection::new(driver.clone(), 4);

        let err = conn.execute("SELECT 1").unwrap_err();

        assert_eq!(driver.attempt_count("SELECT"), 5);
        assert!(err.is_retries_exhausted());
        assert!(err.to_string().contains("(4 retries)"));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_zero_retries_makes_single_attempt() {
        let driver = ScriptedDriver::new().fail_always("DROP", DriverError::new("denied"));
        let mut conn = RetryingConnection::new(driver.clone(), 0);
        assert!(conn.execute("DROP TABLE t").is_err());
        assert_eq!(driver.attempt_count("DROP"), 1);
    }

    #[test]
    fn test_recovers_within_budget() {
        let driver = ScriptedDriver::new().fail_times("UPDATE", 2, DriverError::new("busy"));
        let mut conn = RetryingConnection::new(driver.clone(), 2);
        conn.execute("UPDATE t SET a = 1").unwrap();
        assert_eq!(driver.attempt_count("UPDATE"), 3);
        assert_eq!(driver.completed(), vec!["UPDATE t SET a = 1".to_string()]);
    }

    #[test]
    fn test_execute_query_returns_rows() {
        let rows = QueryResult::try_new(vec!["n".to_string()], vec![vec![Value::Integer(7)]])
            .unwrap();
        let driver = ScriptedDriver::new().respond_with("SELECT n", rows.clone());
        let mut conn = RetryingConnection::new(driver, 0);
        assert_eq!(conn.execute_query("SELECT n FROM t").unwrap(), rows);
        assert!(conn.execute_query("INSERT INTO t VALUES (1)").unwrap().is_empty());
    }

    #[test]
    fn test_close_failure_surfaces() {
        let driver = ScriptedDriver::new().fail_on_close(DriverError::new("socket reset"));
        let mut conn = RetryingConnection::new(driver, 0);
        let err = conn.close().unwrap_err();
        assert!(matches!(err, Error::Client(_)));
        assert!(err.to_string().contains("socket reset"));
        // Second close is a no-op
        conn.close().unwrap();
    }

    #[test]
    fn test_execute_after_close_fails_without_attempt() {
        let driver = ScriptedDriver::new();
        let mut conn = RetryingConnection::new(driver.clone(), 5);
        conn.close().unwrap();
        assert!(conn.is_closed());
        assert!(matches!(conn.execute("SELECT 1"), Err(Error::Client(_))));
        assert!(driver.attempts().is_empty());
    }

    #[test]
    fn test_exception_handler_is_advisory() {
        let conflict = DriverError::new(crate::client::SNAPSHOT_CONFLICT_MESSAGE);
        let driver = ScriptedDriver::new().fail_always("MERGE", conflict.clone());
        let mut conn = RetryingConnection::new(driver.clone(), 1)
            .with_exception_handler(Arc::new(
                MessageSubstringHandler::snapshot_isolation_conflict(),
            ));

        assert!(conn.is_exception_handled(&conflict));
        assert!(!conn.is_exception_handled(&DriverError::new("other")));

        // Handled errors are retried exactly like any other error
        assert!(conn.execute("MERGE INTO t").is_err());
        assert_eq!(driver.attempt_count("MERGE"), 2);
    }
}
