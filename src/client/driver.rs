//! Raw driver link to the system under test

use std::fmt;

use super::QueryResult;

/// Error raised by a driver for a single attempt.
///
/// Carries the driver-specific SQL state and error code when the driver
/// exposes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    message: String,
    sql_state: Option<String>,
    error_code: Option<i64>,
}

impl DriverError {
    /// Create a driver error with only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sql_state: None,
            error_code: None,
        }
    }

    /// Attach a SQL state.
    #[must_use]
    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }

    /// Attach a vendor error code.
    #[must_use]
    pub const fn with_error_code(mut self, error_code: i64) -> Self {
        self.error_code = Some(error_code);
        self
    }

    /// The driver's message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// SQL state, if the driver reported one.
    #[must_use]
    pub fn sql_state(&self) -> Option<&str> {
        self.sql_state.as_deref()
    }

    /// Vendor error code, if the driver reported one.
    #[must_use]
    pub const fn error_code(&self) -> Option<i64> {
        self.error_code
    }

    /// Message plus SQL state and error code, as logged and recorded.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        let mut text = self.message.clone();
        if let Some(state) = &self.sql_state {
            text.push_str("; SQL State: ");
            text.push_str(state);
        }
        if let Some(code) = self.error_code {
            text.push_str(&format!("; Error Code: {code}"));
        }
        text
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.diagnostic())
    }
}

impl std::error::Error for DriverError {}

/// What to do with a statement's result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultMode {
    /// Drain and drop any rows
    #[default]
    Discard,
    /// Materialize rows into a `QueryResult`
    Collect,
}

/// One logical link to the system under test.
///
/// A driver runs exactly one attempt per call; retrying is the job of
/// [`RetryingConnection`](super::RetryingConnection).
pub trait Driver: Send {
    /// Run one statement.
    ///
    /// With [`ResultMode::Discard`] any rows are consumed and `None` is
    /// returned. With [`ResultMode::Collect`] the rows are returned when the
    /// statement produced a result set.
    ///
    /// # Errors
    ///
    /// Returns the driver's error for this attempt.
    fn run(
        &mut self,
        sql: &str,
        mode: ResultMode,
    ) -> std::result::Result<Option<QueryResult>, DriverError>;

    /// Release the underlying link.
    ///
    /// # Errors
    ///
    /// Returns the driver's error if the link could not be released.
    fn close(&mut self) -> std::result::Result<(), DriverError>;
}
