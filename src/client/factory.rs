//! Connection factories: one ready-to-use connection per session

use std::sync::Arc;

use super::{Connection, ExceptionHandler};
use crate::Result;

/// Produces a fresh connection for a session bound to `target_endpoint`.
///
/// Implemented for closures so tests and embedders can wire their own
/// drivers without a dedicated type.
pub trait ConnectionFactory: Send + Sync {
    /// Open a connection to the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is unknown or unreachable.
    fn connect(&self, target_endpoint: usize) -> Result<Box<dyn Connection>>;
}

impl<F> ConnectionFactory for F
where
    F: Fn(usize) -> Result<Box<dyn Connection>> + Send + Sync,
{
    fn connect(&self, target_endpoint: usize) -> Result<Box<dyn Connection>> {
        self(target_endpoint)
    }
}

#[cfg(feature = "sqlite")]
pub use sqlite_factory::SqliteConnectionFactory;

#[cfg(feature = "sqlite")]
mod sqlite_factory {
    use std::path::PathBuf;

    use super::{Arc, Connection, ConnectionFactory, ExceptionHandler, Result};
    use crate::client::{RetryingConnection, SqliteDriver};
    use crate::config::RunConfig;
    use crate::Error;

    /// Opens SQLite databases, one path per endpoint.
    pub struct SqliteConnectionFactory {
        endpoints: Vec<PathBuf>,
        max_num_retries: u32,
        exception_handler: Option<Arc<dyn ExceptionHandler>>,
    }

    impl SqliteConnectionFactory {
        /// Factory over the given database files.
        #[must_use]
        pub fn new(endpoints: Vec<PathBuf>, max_num_retries: u32) -> Self {
            Self {
                endpoints,
                max_num_retries,
                exception_handler: None,
            }
        }

        /// Factory whose connections retry as `config` says.
        #[must_use]
        pub fn from_config(endpoints: Vec<PathBuf>, config: &RunConfig) -> Self {
            Self::new(endpoints, config.max_num_retries())
        }

        /// Retries per statement on every connection.
        #[must_use]
        pub const fn max_num_retries(&self) -> u32 {
            self.max_num_retries
        }

        /// Inject an exception classification policy into every connection.
        #[must_use]
        pub fn with_exception_handler(mut self, handler: Arc<dyn ExceptionHandler>) -> Self {
            self.exception_handler = Some(handler);
            self
        }

        /// Configured endpoints.
        #[must_use]
        pub fn endpoints(&self) -> &[PathBuf] {
            &self.endpoints
        }
    }

    impl ConnectionFactory for SqliteConnectionFactory {
        fn connect(&self, target_endpoint: usize) -> Result<Box<dyn Connection>> {
            let path = self.endpoints.get(target_endpoint).ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "target endpoint {target_endpoint} out of range ({} configured)",
                    self.endpoints.len()
                ))
            })?;
            let driver = SqliteDriver::open(path)?;
            let mut connection = RetryingConnection::new(driver, self.max_num_retries);
            if let Some(handler) = &self.exception_handler {
                connection = connection.with_exception_handler(Arc::clone(handler));
            }
            Ok(Box::new(connection))
        }
    }
}
