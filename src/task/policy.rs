//! Failure policies: fatal or skippable

use crate::Error;

/// Key of the skip-substring argument.
pub const SKIP_ERRONEOUS_QUERY_STRINGS_KEY: &str = "skip_erroneous_query_strings";

/// Separator between skip substrings.
pub const SKIP_ERRONEOUS_QUERY_DELIMITER: char = ';';

/// What to do with a statement whose connection gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Record FAILURE and abort the file and task.
    Fail,
    /// Record WARN and continue with the next statement.
    Skip,
}

/// Classifies a statement failure.
pub trait FailurePolicy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Decide the fate of a failed statement.
    fn disposition(&self, error: &Error) -> Disposition;
}

/// Every failure is fatal.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailFast;

impl FailurePolicy for FailFast {
    fn name(&self) -> &'static str {
        "fail_fast"
    }

    fn disposition(&self, _error: &Error) -> Disposition {
        Disposition::Fail
    }
}

/// Failures whose message contains a configured substring are skipped.
///
/// With no substrings this behaves exactly like [`FailFast`].
#[derive(Debug, Clone, Default)]
pub struct SkipOnError {
    skip_strings: Vec<String>,
}

impl SkipOnError {
    /// Policy skipping errors containing any of `skip_strings`.
    ///
    /// Empty strings are dropped: they would match every error.
    #[must_use]
    pub fn new<I, S>(skip_strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skip_strings: skip_strings
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        }
    }

    /// Parse a `;`-delimited substring list.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(SKIP_ERRONEOUS_QUERY_DELIMITER))
    }

    /// Configured substrings.
    #[must_use]
    pub fn skip_strings(&self) -> &[String] {
        &self.skip_strings
    }
}

impl FailurePolicy for SkipOnError {
    fn name(&self) -> &'static str {
        "skip_on_error"
    }

    fn disposition(&self, error: &Error) -> Disposition {
        let message = error.to_string();
        if self
            .skip_strings
            .iter()
            .any(|s| message.contains(s.as_str()))
        {
            Disposition::Skip
        } else {
            Disposition::Fail
        }
    }
}
