//! Error types for lst-bench
//!
//! Every failure that escapes a statement, file, task or session ends up as
//! one of these variants. The Display text is what skip-on-error matching
//! and telemetry payloads see, so variants wrapping driver failures always
//! embed the driver diagnostic verbatim.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// lst-bench error types
#[derive(Error, Debug)]
pub enum Error {
    /// Statement failed on every attempt of the retry loop
    #[error("Query execution ({max_retries} retries) unsuccessful: {diagnostic}")]
    RetriesExhausted {
        /// Configured retry budget (attempts made = `max_retries + 1`)
        max_retries: u32,
        /// Diagnostic text of the last underlying driver error
        diagnostic: String,
    },

    /// Client-level failure outside the retry loop (connect, close, use after close)
    #[error("Client error: {0}")]
    Client(String),

    /// Workload does not fit the task library or its own phase ordering
    #[error("Invalid workload: {0}")]
    InvalidWorkload(String),

    /// Configuration value out of range or malformed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed input data (e.g. ragged query result rows)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Statement rewrite rule failed to compile
    #[error("Invalid rewrite pattern: {0}")]
    Regex(#[from] regex::Error),

    /// A session terminated with an unrecovered error
    #[error("Session {session} of phase '{phase_id}' failed: {source}")]
    SessionFailed {
        /// Phase the session belongs to
        phase_id: String,
        /// Position of the session within the phase
        session: usize,
        /// First failure surfaced by the session
        #[source]
        source: Box<Error>,
    },

    /// Session worker panicked or was aborted before reaching a terminal state
    #[error("Session worker terminated abnormally: {0}")]
    WorkerPanicked(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error came out of the connection's retry loop.
    #[must_use]
    pub const fn is_retries_exhausted(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }
}
