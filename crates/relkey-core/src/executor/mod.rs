//! Storage boundary.
//!
//! The crate never opens connections or manages transactions itself: callers
//! hand an [`Executor`] to a unit of work, which runs built statements
//! through it.

mod context;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use context::ExecutorContext;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteExecutor;

use relkey_proto::RawValue;

use crate::error::StorageError;
use crate::query::Statement;

/// One result row, columns in select-list order.
pub type Row = Vec<RawValue>;

/// Runs statements against storage.
pub trait Executor {
    /// Run a query and return every row.
    fn fetch(&mut self, statement: &Statement) -> Result<Vec<Row>, StorageError>;

    /// Run a write and return the number of affected rows.
    fn execute(&mut self, statement: &Statement) -> Result<u64, StorageError>;
}

impl<E: Executor + ?Sized> Executor for &mut E {
    fn fetch(&mut self, statement: &Statement) -> Result<Vec<Row>, StorageError> {
        (**self).fetch(statement)
    }

    fn execute(&mut self, statement: &Statement) -> Result<u64, StorageError> {
        (**self).execute(statement)
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn fetch(&mut self, statement: &Statement) -> Result<Vec<Row>, StorageError> {
        (**self).fetch(statement)
    }

    fn execute(&mut self, statement: &Statement) -> Result<u64, StorageError> {
        (**self).execute(statement)
    }
}
