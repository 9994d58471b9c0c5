//! SQLite driver backed by `rusqlite`

use std::path::Path;
use std::time::Duration;

use rusqlite::types::ValueRef;

use super::{Driver, DriverError, QueryResult, ResultMode, Value};
use crate::{Error, Result};

/// How long a writer waits on a locked database before the attempt fails.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Driver for a single SQLite database connection.
#[derive(Debug)]
pub struct SqliteDriver {
    conn: Option<rusqlite::Connection>,
}

impl SqliteDriver {
    /// Open (or create) a database file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Client` if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = rusqlite::Connection::open(path.as_ref()).map_err(|e| {
            Error::Client(format!(
                "failed to open sqlite database {}: {e}",
                path.as_ref().display()
            ))
        })?;
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)
            .map_err(|e| Error::Client(format!("failed to set busy timeout: {e}")))?;
        Ok(Self::from_connection(conn))
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns `Error::Client` if SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| Error::Client(format!("failed to open in-memory sqlite: {e}")))?;
        Ok(Self::from_connection(conn))
    }

    /// Wrap an already configured `rusqlite` connection.
    #[must_use]
    pub const fn from_connection(conn: rusqlite::Connection) -> Self {
        Self { conn: Some(conn) }
    }
}

impl From<rusqlite::Error> for DriverError {
    fn from(err: rusqlite::Error) -> Self {
        let driver_error = Self::new(err.to_string());
        match &err {
            rusqlite::Error::SqliteFailure(failure, _) => driver_error
                .with_sql_state(format!("{:?}", failure.code))
                .with_error_code(i64::from(failure.extended_code)),
            _ => driver_error,
        }
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(v) => Self::Integer(v),
            ValueRef::Real(v) => Self::Real(v),
            ValueRef::Text(v) => Self::Text(String::from_utf8_lossy(v).into_owned()),
            ValueRef::Blob(v) => Self::Blob(v.to_vec()),
        }
    }
}

impl Driver for SqliteDriver {
    fn run(
        &mut self,
        sql: &str,
        mode: ResultMode,
    ) -> std::result::Result<Option<QueryResult>, DriverError> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| DriverError::new("sqlite connection is closed"))?;

        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let width = columns.len();

        // Rows are lazy: the statement only executes when stepped.
        let mut rows = stmt.query([])?;
        match mode {
            ResultMode::Discard => {
                while rows.next()?.is_some() {}
                Ok(None)
            }
            ResultMode::Collect => {
                let mut values = Vec::new();
                while let Some(row) = rows.next()? {
                    let mut record = Vec::with_capacity(width);
                    for index in 0..width {
                        record.push(Value::from(row.get_ref(index)?));
                    }
                    values.push(record);
                }
                QueryResult::try_new(columns, values)
                    .map(Some)
                    .map_err(|e| DriverError::new(e.to_string()))
            }
        }
    }

    fn close(&mut self) -> std::result::Result<(), DriverError> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, err)| DriverError::from(err)),
            None => Ok(()),
        }
    }
}
