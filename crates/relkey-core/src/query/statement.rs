//! Statement construction for one table.
//!
//! [`StatementBuilder`] turns key ranges and entities into [`Statement`]s:
//! keyset selects and counts, inserts with stamp and default filling, and
//! baseline-targeted updates and deletes.

use relkey_proto::{RawValue, Value};
use tracing::{debug, warn};

use super::predicate::{CompareOp, KeyRange, Predicate};
use super::sql::{SqlWriter, Statement, StatementKind};
use crate::catalog::{ColumnSpec, TableDef};
use crate::config::BuilderConfig;
use crate::entity::{FieldState, KeyedEntity};
use crate::error::Error;
use crate::executor::ExecutorContext;

/// Parameters of a keyset select.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    /// Key range to match; `None` selects every row.
    pub range: Option<KeyRange>,
    /// Maximum number of rows.
    pub limit: Option<u64>,
    /// Invert every ordering direction.
    pub reverse: bool,
}

impl SelectQuery {
    /// Select every row in key order.
    pub fn all() -> Self {
        Self::default()
    }

    /// Select the rows in a key range.
    pub fn range(range: KeyRange) -> Self {
        Self {
            range: Some(range),
            ..Self::default()
        }
    }

    /// Limit the number of rows.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Walk the key order backwards.
    pub fn reversed(mut self) -> Self {
        self.reverse = !self.reverse;
        self
    }
}

/// Builds statements against one table definition.
pub struct StatementBuilder<'a> {
    table: &'a TableDef,
    config: &'a BuilderConfig,
}

impl<'a> StatementBuilder<'a> {
    /// Create a builder.
    pub fn new(table: &'a TableDef, config: &'a BuilderConfig) -> Self {
        Self { table, config }
    }

    /// Expand a key range; `None` means the range matches nothing.
    pub fn predicate(&self, range: &KeyRange) -> Option<Predicate> {
        match range.expand(&self.table.key) {
            Ok(predicate) => Some(predicate),
            Err(reason) => {
                warn!(
                    table = %self.table.name,
                    range = range.name(),
                    reason,
                    "Key range has no predicate; matching nothing"
                );
                None
            }
        }
    }

    /// Keyset select. `Ok(None)` when the range matches nothing.
    pub fn select(&self, query: &SelectQuery) -> Result<Option<Statement>, Error> {
        let predicate = match &query.range {
            Some(range) => match self.predicate(range) {
                Some(predicate) => Some(predicate),
                None => return Ok(None),
            },
            None => None,
        };
        self.select_where(predicate.as_ref(), query.limit, query.reverse)
            .map(Some)
    }

    /// Select with an already expanded predicate.
    pub(crate) fn select_where(
        &self,
        predicate: Option<&Predicate>,
        limit: Option<u64>,
        reverse: bool,
    ) -> Result<Statement, Error> {
        let mut w = SqlWriter::new(self.table, self.config);
        w.push("SELECT ");
        w.push_identifiers(self.table.columns.iter().map(|c| c.id.as_str()));
        w.push(" FROM ");
        w.push_identifier(&self.table.name);
        if let Some(predicate) = predicate {
            w.push(" WHERE ");
            w.push_predicate(predicate)?;
        }
        if self.table.has_key() {
            w.push(" ORDER BY ");
            for (i, part) in self.table.key.parts().iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                let direction = if reverse {
                    part.direction().reversed()
                } else {
                    part.direction()
                };
                w.push_identifier(&part.column);
                w.push(" ");
                w.push(direction.keyword());
            }
        }
        if let Some(limit) = limit {
            w.push(" LIMIT ");
            w.push_raw(RawValue::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        }
        Ok(self.finish(w, StatementKind::Select))
    }

    /// Row count over a key range, or the whole table. `Ok(None)` when the
    /// range matches nothing.
    pub fn count(&self, range: Option<&KeyRange>) -> Result<Option<Statement>, Error> {
        let predicate = match range {
            Some(range) => match self.predicate(range) {
                Some(predicate) => Some(predicate),
                None => return Ok(None),
            },
            None => None,
        };
        let mut w = SqlWriter::new(self.table, self.config);
        w.push("SELECT COUNT(*) FROM ");
        w.push_identifier(&self.table.name);
        if let Some(predicate) = &predicate {
            w.push(" WHERE ");
            w.push_predicate(predicate)?;
        }
        Ok(Some(self.finish(w, StatementKind::Count)))
    }

    /// Insert every set column, unset columns with a default, and stamps.
    pub fn insert(&self, entity: &KeyedEntity, ctx: &ExecutorContext) -> Result<Statement, Error> {
        self.check_entity(entity)?;
        let mut columns: Vec<(&ColumnSpec, Value)> = Vec::new();
        for (column, state) in entity.states() {
            let value = match column.stamp {
                Some(role) if !(ctx.input && state.is_set()) => Some(ctx.stamp_value(role)),
                _ => match state {
                    FieldState::Unset => column.default.clone(),
                    set => set.to_value(),
                },
            };
            if let Some(value) = value {
                columns.push((column, value));
            }
        }

        let mut w = SqlWriter::new(self.table, self.config);
        w.push("INSERT INTO ");
        w.push_identifier(&self.table.name);
        if columns.is_empty() {
            w.push(" DEFAULT VALUES");
            return Ok(self.finish(w, StatementKind::Insert));
        }
        w.push(" (");
        w.push_identifiers(columns.iter().map(|(c, _)| c.id.as_str()));
        w.push(") VALUES (");
        for (i, (column, value)) in columns.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push_value(&column.id, value)?;
        }
        w.push(")");
        Ok(self.finish(w, StatementKind::Insert))
    }

    /// Update the row addressed by the entity's baseline key.
    ///
    /// Returns `Ok(None)` when no column needs writing. In diff-only mode
    /// only columns that differ from the baseline are written, and the
    /// statement skips rows that already hold every new value.
    pub fn update(
        &self,
        entity: &KeyedEntity,
        ctx: &ExecutorContext,
    ) -> Result<Option<Statement>, Error> {
        self.check_entity(entity)?;
        self.require_key()?;
        let keys = entity.baseline_key_values()?;

        let mut targets: Vec<(&ColumnSpec, Value)> = Vec::new();
        for (column, state) in entity.states() {
            if column.is_stamp() {
                continue;
            }
            let Some(value) = state.to_value() else {
                continue;
            };
            let changed = entity.is_changed(&column.id);
            if !changed && (ctx.diff_only || self.table.is_key_column(&column.id)) {
                continue;
            }
            targets.push((column, value));
        }
        if targets.is_empty() {
            debug!(table = %self.table.name, "No updatable columns; skipping update");
            return Ok(None);
        }

        let mut assignments: Vec<(&ColumnSpec, Value)> = targets.clone();
        for (column, state) in entity.states() {
            let Some(role) = column.stamp.filter(|role| role.on_update()) else {
                continue;
            };
            let value = match state.to_value() {
                Some(value) if ctx.input => value,
                _ => ctx.stamp_value(role),
            };
            assignments.push((column, value));
        }

        let mut clauses = vec![self.key_predicate(keys)];
        if ctx.diff_only {
            clauses.push(Predicate::or(
                targets
                    .iter()
                    .map(|(column, value)| differs(column, value))
                    .collect(),
            ));
        }

        let mut w = SqlWriter::new(self.table, self.config);
        w.push("UPDATE ");
        w.push_identifier(&self.table.name);
        w.push(" SET ");
        for (i, (column, value)) in assignments.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push_identifier(&column.id);
            w.push(" = ");
            w.push_value(&column.id, value)?;
        }
        w.push(" WHERE ");
        w.push_predicate(&Predicate::and(clauses))?;
        Ok(Some(self.finish(w, StatementKind::Update)))
    }

    /// Delete the row addressed by the entity's baseline key.
    pub fn delete(&self, entity: &KeyedEntity) -> Result<Statement, Error> {
        self.check_entity(entity)?;
        self.require_key()?;
        let keys = entity.baseline_key_values()?;

        let mut w = SqlWriter::new(self.table, self.config);
        w.push("DELETE FROM ");
        w.push_identifier(&self.table.name);
        w.push(" WHERE ");
        w.push_predicate(&self.key_predicate(keys))?;
        Ok(self.finish(w, StatementKind::Delete))
    }

    fn key_predicate(&self, keys: Vec<Value>) -> Predicate {
        Predicate::and(
            self.table
                .key
                .columns()
                .zip(keys)
                .map(|(column, value)| Predicate::eq(column, value))
                .collect(),
        )
    }

    fn require_key(&self) -> Result<(), Error> {
        if self.table.has_key() {
            Ok(())
        } else {
            Err(Error::InvalidSchema(format!(
                "table `{}` has no composite key",
                self.table.name
            )))
        }
    }

    fn check_entity(&self, entity: &KeyedEntity) -> Result<(), Error> {
        if entity.table().name == self.table.name {
            Ok(())
        } else {
            Err(Error::InvalidSchema(format!(
                "entity of table `{}` passed to builder for `{}`",
                entity.table().name,
                self.table.name
            )))
        }
    }

    fn finish(&self, writer: SqlWriter<'_>, kind: StatementKind) -> Statement {
        let statement = writer.finish(kind);
        debug!(
            table = %self.table.name,
            kind = ?statement.kind,
            bindings = statement.bindings.len(),
            "Built statement"
        );
        statement
    }
}

/// Row still differs from the new value of `column`.
fn differs(column: &ColumnSpec, value: &Value) -> Predicate {
    if value.is_null() {
        Predicate::IsNotNull {
            column: column.id.clone(),
        }
    } else {
        Predicate::or(vec![
            Predicate::IsNull {
                column: column.id.clone(),
            },
            Predicate::compare(column.id.clone(), CompareOp::Ne, value.clone()),
        ])
    }
}
