//! Connection layer
//!
//! ```text
//! ConnectionFactory ──> Box<dyn Connection>
//!                           │
//!                 RetryingConnection<D: Driver>  ── ExceptionHandler (advisory)
//!                           │
//!            SqliteDriver | ScriptedDriver | your driver
//! ```
//!
//! A [`Driver`] performs exactly one attempt per call. [`RetryingConnection`]
//! turns that into the engine's retry contract: up to `max_num_retries + 1`
//! attempts, each a full resubmission of the statement text.

mod connection;
mod driver;
mod factory;
mod handler;
mod result;
mod scripted;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use connection::{Connection, RetryingConnection};
pub use driver::{Driver, DriverError, ResultMode};
pub use factory::ConnectionFactory;
#[cfg(feature = "sqlite")]
pub use factory::SqliteConnectionFactory;
pub use handler::{ExceptionHandler, MessageSubstringHandler, SNAPSHOT_CONFLICT_MESSAGE};
pub use result::{QueryResult, Value};
pub use scripted::ScriptedDriver;
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteDriver, DEFAULT_BUSY_TIMEOUT};
