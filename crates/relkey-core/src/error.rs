//! Core error types.

use thiserror::Error;

/// Boxed error reported by an executor implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core data-access errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Value conversion or arithmetic error.
    #[error("protocol error: {0}")]
    Protocol(#[from] relkey_proto::Error),

    /// Column id not declared by the table.
    #[error("unknown column `{column}` in table `{table}`")]
    UnknownColumn { table: String, column: String },

    /// Update/delete target whose baseline lacks a key column.
    #[error("missing key value for `{column}` in table `{table}`")]
    MissingKeyValue { table: String, column: String },

    /// Fetch request tuple that does not fit the composite key.
    #[error("invalid key tuple for table `{table}`: {reason}")]
    InvalidKeyTuple { table: String, reason: String },

    /// Inconsistent table definition.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// A batch planner was used after a failed flush.
    #[error("batch planner is unusable after a failed flush")]
    PlannerPoisoned,

    /// Executor failure.
    #[error("storage error executing `{statement}`: {source}")]
    Storage {
        /// SQL text of the failed statement.
        statement: String,
        /// Original executor error.
        #[source]
        source: StorageError,
    },
}

/// Failure reported by an [`Executor`](crate::executor::Executor).
///
/// The original error stays available through `source()` for logging.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StorageError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl StorageError {
    /// Wrap an executor error.
    pub fn new(source: impl Into<BoxError>) -> Self {
        let source = source.into();
        Self {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create an error from a message alone.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::new(err)
    }
}
