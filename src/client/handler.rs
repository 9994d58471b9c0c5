//! Exception classification policies
//!
//! A handler marks a driver error as "externally handled": a known,
//! domain-specific condition such as an isolation conflict that a retry can
//! absorb. The classification is advisory; the retry loop reports it but
//! never changes its behavior because of it.

use super::DriverError;

/// Message emitted by snapshot-isolation engines when a concurrent writer wins.
pub const SNAPSHOT_CONFLICT_MESSAGE: &str =
    "Snapshot isolation transaction aborted due to update conflict";

/// Pluggable classifier for driver errors.
pub trait ExceptionHandler: Send + Sync {
    /// Whether the error is a condition this handler recognizes.
    fn is_handled(&self, error: &DriverError) -> bool;
}

/// Classifies an error as handled when its message contains any fragment.
#[derive(Debug, Clone, Default)]
pub struct MessageSubstringHandler {
    fragments: Vec<String>,
}

impl MessageSubstringHandler {
    /// Create a handler from message fragments. Empty fragments are dropped.
    #[must_use]
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: fragments
                .into_iter()
                .map(Into::into)
                .filter(|f: &String| !f.is_empty())
                .collect(),
        }
    }

    /// Handler recognizing snapshot-isolation update conflicts.
    #[must_use]
    pub fn snapshot_isolation_conflict() -> Self {
        Self::new([SNAPSHOT_CONFLICT_MESSAGE])
    }

    /// Configured fragments.
    #[must_use]
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }
}

impl ExceptionHandler for MessageSubstringHandler {
    fn is_handled(&self, error: &DriverError) -> bool {
        self.fragments
            .iter()
            .any(|fragment| error.message().contains(fragment.as_str()))
    }
}
