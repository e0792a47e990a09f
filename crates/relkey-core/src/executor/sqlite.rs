//! SQLite executor over rusqlite.

use std::borrow::Borrow;
use std::path::Path;

use relkey_proto::RawValue;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use tracing::trace;

use super::{Executor, Row};
use crate::error::StorageError;
use crate::query::Statement;

/// Executor running statements on a SQLite connection.
///
/// Works over an owned `Connection` or a borrowed one; pass `&*tx` to run
/// inside a caller-managed transaction.
pub struct SqliteExecutor<C = Connection> {
    conn: C,
}

impl SqliteExecutor<Connection> {
    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Ok(Self::new(Connection::open(path)?))
    }
}

impl<C: Borrow<Connection>> SqliteExecutor<C> {
    /// Wrap a connection.
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        self.conn.borrow()
    }

    /// Release the connection.
    pub fn into_inner(self) -> C {
        self.conn
    }
}

impl<C: Borrow<Connection>> Executor for SqliteExecutor<C> {
    fn fetch(&mut self, statement: &Statement) -> Result<Vec<Row>, StorageError> {
        trace!(sql = %statement.sql, "SQLite fetch");
        let mut stmt = self.connection().prepare_cached(&statement.sql)?;
        let width = stmt.column_count();
        let mut rows = stmt.query(params_from_iter(statement.bindings.iter().map(to_sql)))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(from_sql(row.get_ref(i)?));
            }
            out.push(values);
        }
        Ok(out)
    }

    fn execute(&mut self, statement: &Statement) -> Result<u64, StorageError> {
        trace!(sql = %statement.sql, "SQLite execute");
        let mut stmt = self.connection().prepare_cached(&statement.sql)?;
        let affected = stmt.execute(params_from_iter(statement.bindings.iter().map(to_sql)))?;
        Ok(affected as u64)
    }
}

fn to_sql(raw: &RawValue) -> SqlValue {
    match raw {
        RawValue::Null => SqlValue::Null,
        RawValue::Integer(i) => SqlValue::Integer(*i),
        RawValue::Real(r) => SqlValue::Real(*r),
        RawValue::Text(s) => SqlValue::Text(s.clone()),
    }
}

fn from_sql(value: ValueRef<'_>) -> RawValue {
    match value {
        ValueRef::Null => RawValue::Null,
        ValueRef::Integer(i) => RawValue::Integer(i),
        ValueRef::Real(r) => RawValue::Real(r),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            RawValue::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}
