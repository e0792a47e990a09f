//! Unit of work: one executor, one context, many statements.

use std::sync::Arc;

use relkey_proto::{RawValue, TypeTag, Value};
use tracing::debug;

use crate::catalog::TableDef;
use crate::config::BuilderConfig;
use crate::entity::KeyedEntity;
use crate::error::{Error, StorageError};
use crate::executor::{Executor, ExecutorContext};
use crate::query::{BatchQueryPlanner, KeyRange, SelectQuery, Statement, StatementBuilder};

/// Runs built statements for one inbound unit of work.
///
/// The unit of work owns its executor for its whole lifetime. Transaction
/// boundaries belong to the caller: wrap a transaction-scoped executor and
/// commit after [`into_executor`](Self::into_executor).
pub struct UnitOfWork<E: Executor> {
    executor: E,
    context: ExecutorContext,
    config: BuilderConfig,
}

impl<E: Executor> UnitOfWork<E> {
    /// Create a unit of work with the default builder configuration.
    pub fn new(executor: E, context: ExecutorContext) -> Self {
        Self::with_config(executor, context, BuilderConfig::default())
    }

    /// Create a unit of work with an explicit builder configuration.
    pub fn with_config(executor: E, context: ExecutorContext, config: BuilderConfig) -> Self {
        Self {
            executor,
            context,
            config,
        }
    }

    /// The executor context.
    pub fn context(&self) -> &ExecutorContext {
        &self.context
    }

    /// The builder configuration.
    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Mutable access to the executor.
    pub fn executor(&mut self) -> &mut E {
        &mut self.executor
    }

    /// Release the executor.
    pub fn into_executor(self) -> E {
        self.executor
    }

    /// Load the rows matching `query`, in key order.
    pub fn select(
        &mut self,
        table: &Arc<TableDef>,
        query: &SelectQuery,
    ) -> Result<Vec<KeyedEntity>, Error> {
        let Some(statement) = StatementBuilder::new(table, &self.config).select(query)? else {
            return Ok(Vec::new());
        };
        let rows = self.fetch(&statement)?;
        rows.iter()
            .map(|row| KeyedEntity::from_row(Arc::clone(table), row))
            .collect()
    }

    /// Load the first row matching `range`, if any.
    pub fn first(
        &mut self,
        table: &Arc<TableDef>,
        range: KeyRange,
    ) -> Result<Option<KeyedEntity>, Error> {
        let query = SelectQuery::range(range).with_limit(1);
        Ok(self.select(table, &query)?.into_iter().next())
    }

    /// Count the rows in `range`, or the whole table.
    pub fn count(&mut self, table: &TableDef, range: Option<&KeyRange>) -> Result<u64, Error> {
        let Some(statement) = StatementBuilder::new(table, &self.config).count(range)? else {
            return Ok(0);
        };
        let rows = self.fetch(&statement)?;
        let count = rows
            .first()
            .and_then(|row| row.first())
            .map(|raw| TypeTag::Integer.from_raw(raw))
            .transpose()?;
        match count {
            Some(Value::Integer(n)) => Ok(u64::try_from(n).unwrap_or(0)),
            _ => Ok(0),
        }
    }

    /// Insert the entity, then capture its values as the baseline.
    pub fn insert(&mut self, entity: &mut KeyedEntity) -> Result<u64, Error> {
        let statement =
            StatementBuilder::new(entity.table(), &self.config).insert(entity, &self.context)?;
        let affected = self.execute(&statement)?;
        entity.capture_baseline();
        Ok(affected)
    }

    /// Update the entity's row; re-captures the baseline when a row changed.
    ///
    /// Returns 0 without touching storage when nothing needs writing.
    pub fn update(&mut self, entity: &mut KeyedEntity) -> Result<u64, Error> {
        let Some(statement) =
            StatementBuilder::new(entity.table(), &self.config).update(entity, &self.context)?
        else {
            return Ok(0);
        };
        let affected = self.execute(&statement)?;
        if affected > 0 {
            entity.capture_baseline();
        }
        Ok(affected)
    }

    /// Delete the entity's row.
    pub fn delete(&mut self, entity: &KeyedEntity) -> Result<u64, Error> {
        let statement = StatementBuilder::new(entity.table(), &self.config).delete(entity)?;
        self.execute(&statement)
    }

    /// Create a batch planner sharing this unit's configuration.
    pub fn planner(&self, table: Arc<TableDef>) -> BatchQueryPlanner {
        BatchQueryPlanner::new(table, self.config.clone())
    }

    /// Flush a planner through this unit's executor.
    pub fn flush(&mut self, planner: &mut BatchQueryPlanner) -> Result<(), Error> {
        planner.flush(&mut self.executor)
    }

    fn fetch(&mut self, statement: &Statement) -> Result<Vec<Vec<RawValue>>, Error> {
        let rows = self
            .executor
            .fetch(statement)
            .map_err(|source| storage_error(statement, source))?;
        debug!(kind = ?statement.kind, rows = rows.len(), "Fetched rows");
        Ok(rows)
    }

    fn execute(&mut self, statement: &Statement) -> Result<u64, Error> {
        let affected = self
            .executor
            .execute(statement)
            .map_err(|source| storage_error(statement, source))?;
        debug!(kind = ?statement.kind, affected, "Executed statement");
        Ok(affected)
    }
}

fn storage_error(statement: &Statement, source: StorageError) -> Error {
    Error::Storage {
        statement: statement.sql.clone(),
        source,
    }
}
