//! SQL text rendering with typed bindings.

use relkey_proto::{RawValue, Value};

use super::predicate::Predicate;
use crate::catalog::TableDef;
use crate::config::BuilderConfig;
use crate::error::Error;

/// Kind of statement, for logging and executor dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Count,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    /// Check if the statement returns rows.
    pub fn is_query(&self) -> bool {
        matches!(self, StatementKind::Select | StatementKind::Count)
    }
}

/// Statement text plus ordered bindings in storage form.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// What the statement does.
    pub kind: StatementKind,
    /// SQL text with placeholders.
    pub sql: String,
    /// One binding per placeholder, in text order.
    pub bindings: Vec<RawValue>,
}

/// Accumulates statement text and bindings for one table.
pub(crate) struct SqlWriter<'a> {
    table: &'a TableDef,
    config: &'a BuilderConfig,
    sql: String,
    bindings: Vec<RawValue>,
}

impl<'a> SqlWriter<'a> {
    pub(crate) fn new(table: &'a TableDef, config: &'a BuilderConfig) -> Self {
        Self {
            table,
            config,
            sql: String::new(),
            bindings: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    pub(crate) fn push_identifier(&mut self, name: &str) {
        let quoted = self.config.identifier(name);
        self.sql.push_str(&quoted);
    }

    /// Comma-separated list of identifiers.
    pub(crate) fn push_identifiers<'n>(&mut self, names: impl IntoIterator<Item = &'n str>) {
        for (i, name) in names.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_identifier(name);
        }
    }

    /// Placeholder for an already-converted binding.
    pub(crate) fn push_raw(&mut self, raw: RawValue) {
        self.bindings.push(raw);
        let placeholder = self.config.placeholder.render(self.bindings.len());
        self.sql.push_str(&placeholder);
    }

    /// Placeholder for `value`, converted through the column's type tag.
    pub(crate) fn push_value(&mut self, column: &str, value: &Value) -> Result<(), Error> {
        let spec = self.table.require_column(column)?;
        let raw = spec.tag.to_raw(value)?;
        self.push_raw(raw);
        Ok(())
    }

    pub(crate) fn push_predicate(&mut self, predicate: &Predicate) -> Result<(), Error> {
        match predicate {
            Predicate::Compare { column, op, value } => {
                self.push_identifier(column);
                self.push(" ");
                self.push(op.sql());
                self.push(" ");
                self.push_value(column, value)?;
            }
            Predicate::IsNull { column } => {
                self.push_identifier(column);
                self.push(" IS NULL");
            }
            Predicate::IsNotNull { column } => {
                self.push_identifier(column);
                self.push(" IS NOT NULL");
            }
            Predicate::In { column, values } => {
                self.push_identifier(column);
                self.push(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.push_value(column, value)?;
                }
                self.push(")");
            }
            Predicate::Between { column, low, high } => {
                self.push_identifier(column);
                self.push(" BETWEEN ");
                self.push_value(column, low)?;
                self.push(" AND ");
                self.push_value(column, high)?;
            }
            Predicate::Like { column, pattern } => {
                self.table.require_column(column)?;
                self.push_identifier(column);
                self.push(" LIKE ");
                // Patterns bind as text whatever the column type.
                self.push_raw(RawValue::Text(pattern.to_string()));
                if let Some(escape) = self.config.like_escape {
                    let escape = escape.to_string().replace('\'', "''");
                    self.push(&format!(" ESCAPE '{escape}'"));
                }
            }
            Predicate::And(parts) => self.push_joined(parts, " AND ", "1 = 1")?,
            Predicate::Or(parts) => self.push_joined(parts, " OR ", "1 = 0")?,
        }
        Ok(())
    }

    fn push_joined(
        &mut self,
        parts: &[Predicate],
        separator: &str,
        empty: &str,
    ) -> Result<(), Error> {
        if parts.is_empty() {
            self.push(empty);
            return Ok(());
        }
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                self.push(separator);
            }
            if part.is_compound() {
                self.push("(");
                self.push_predicate(part)?;
                self.push(")");
            } else {
                self.push_predicate(part)?;
            }
        }
        Ok(())
    }

    pub(crate) fn finish(self, kind: StatementKind) -> Statement {
        Statement {
            kind,
            sql: self.sql,
            bindings: self.bindings,
        }
    }
}
