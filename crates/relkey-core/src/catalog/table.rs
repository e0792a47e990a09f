//! Table definitions.

use std::collections::HashSet;

use super::column::ColumnSpec;
use super::key::CompositeKey;
use crate::error::Error;
use serde::{Deserialize, Serialize};

/// A table definition: the static schema descriptor of one table type.
///
/// Built once per table type and shared (`Arc<TableDef>`) by every entity,
/// statement builder and planner working on that table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    /// Table name.
    pub name: String,
    /// Column definitions in select order.
    pub columns: Vec<ColumnSpec>,
    /// Composite key; empty when the table exposes no range queries.
    #[serde(default)]
    pub key: CompositeKey,
}

impl TableDef {
    /// Create a new table definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            key: CompositeKey::default(),
        }
    }

    /// Add a column to the table.
    pub fn with_column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    /// Add multiple columns.
    pub fn with_columns(mut self, columns: impl IntoIterator<Item = ColumnSpec>) -> Self {
        self.columns.extend(columns);
        self
    }

    /// Set the composite key.
    pub fn with_key(mut self, key: CompositeKey) -> Self {
        self.key = key;
        self
    }

    /// Load and validate a definition from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let table: TableDef =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        table.validate()?;
        Ok(table)
    }

    /// Check column ids are unique and key parts name declared columns.
    pub fn validate(&self) -> Result<(), Error> {
        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.id.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate column `{}` in table `{}`",
                    column.id, self.name
                )));
            }
        }
        for part in self.key.parts() {
            if !seen.contains(part.column.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "key column `{}` is not declared in table `{}`",
                    part.column, self.name
                )));
            }
        }
        Ok(())
    }

    /// Get a column by id.
    pub fn column(&self, id: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Position of a column in select order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == id)
    }

    /// Position of a column, or `UnknownColumn`.
    pub fn require_position(&self, id: &str) -> Result<usize, Error> {
        self.position(id).ok_or_else(|| Error::UnknownColumn {
            table: self.name.clone(),
            column: id.to_string(),
        })
    }

    /// Get a column by id, or `UnknownColumn`.
    pub fn require_column(&self, id: &str) -> Result<&ColumnSpec, Error> {
        self.require_position(id).map(|i| &self.columns[i])
    }

    /// Check if this table can answer range queries.
    pub fn has_key(&self) -> bool {
        !self.key.is_empty()
    }

    /// Check if `id` is a key column.
    pub fn is_key_column(&self, id: &str) -> bool {
        self.key.contains(id)
    }
}
