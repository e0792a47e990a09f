//! In-memory rows keyed by a composite key.

use std::sync::Arc;

use relkey_proto::{RawValue, Value};

use super::field::FieldState;
use crate::catalog::{ColumnSpec, TableDef};
use crate::error::Error;

/// A row of one table held in memory.
///
/// Every declared column carries a [`FieldState`]. Entities loaded from
/// storage also keep a snapshot baseline of the loaded values; updates and
/// deletes target the row through that baseline, so editing a key field in
/// place never redirects a statement to another row.
///
/// `Clone` deep-copies the field values and the baseline. The table
/// definition stays shared.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedEntity {
    table: Arc<TableDef>,
    fields: Vec<FieldState>,
    baseline: Option<Vec<FieldState>>,
}

impl KeyedEntity {
    /// Create an entity with every column unset and no baseline.
    pub fn new(table: Arc<TableDef>) -> Self {
        let fields = vec![FieldState::Unset; table.columns.len()];
        Self {
            table,
            fields,
            baseline: None,
        }
    }

    /// Create an entity with every column explicitly null and no baseline.
    pub fn null_filled(table: Arc<TableDef>) -> Self {
        let fields = vec![FieldState::Null; table.columns.len()];
        Self {
            table,
            fields,
            baseline: None,
        }
    }

    /// Load a storage row (columns in table order) and capture the baseline.
    pub fn from_row(table: Arc<TableDef>, row: &[RawValue]) -> Result<Self, Error> {
        if row.len() != table.columns.len() {
            return Err(Error::InvalidSchema(format!(
                "row has {} values but table `{}` declares {} columns",
                row.len(),
                table.name,
                table.columns.len()
            )));
        }
        let fields = table
            .columns
            .iter()
            .zip(row)
            .map(|(column, raw)| column.tag.from_raw(raw).map(FieldState::from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            table,
            baseline: Some(fields.clone()),
            fields,
        })
    }

    /// Create an entity from caller-supplied values, without a baseline.
    pub fn from_values<I, K, V>(table: Arc<TableDef>, values: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut entity = Self::new(table);
        for (column, value) in values {
            entity.set(column.as_ref(), value)?;
        }
        Ok(entity)
    }

    /// The shared table definition.
    pub fn table(&self) -> &Arc<TableDef> {
        &self.table
    }

    /// State of a column; `None` for undeclared ids.
    pub fn state(&self, column: &str) -> Option<&FieldState> {
        self.table.position(column).map(|i| &self.fields[i])
    }

    /// Non-null value of a column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.state(column).and_then(FieldState::value)
    }

    /// Column specs paired with their current state, in table order.
    pub fn states(&self) -> impl Iterator<Item = (&ColumnSpec, &FieldState)> {
        self.table.columns.iter().zip(&self.fields)
    }

    /// Assign a value; `Value::Null` stores an explicit null.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> Result<(), Error> {
        let i = self.table.require_position(column)?;
        self.fields[i] = FieldState::from(value.into());
        Ok(())
    }

    /// Assign an explicit null.
    pub fn set_null(&mut self, column: &str) -> Result<(), Error> {
        let i = self.table.require_position(column)?;
        self.fields[i] = FieldState::Null;
        Ok(())
    }

    /// Return a column to the unset state.
    pub fn unset(&mut self, column: &str) -> Result<(), Error> {
        let i = self.table.require_position(column)?;
        self.fields[i] = FieldState::Unset;
        Ok(())
    }

    /// Check if a column holds a value or an explicit null.
    pub fn is_set(&self, column: &str) -> bool {
        self.state(column).is_some_and(FieldState::is_set)
    }

    /// Reset every declared column to unset. The baseline is kept.
    pub fn set_nothing(&mut self) {
        self.fields.fill(FieldState::Unset);
    }

    /// Re-run each column's conversion pair over the current values.
    ///
    /// Wire forms supplied by callers become typed values, e.g. `"7"` in an
    /// integer column becomes `Integer(7)`.
    pub fn refresh(&mut self) -> Result<(), Error> {
        for (column, state) in self.table.columns.iter().zip(self.fields.iter_mut()) {
            if let FieldState::Value(value) = state {
                *state = FieldState::from(column.tag.coerce(value)?);
            }
        }
        Ok(())
    }

    /// Check if a baseline was captured.
    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    /// Baseline state of a column.
    pub fn baseline_state(&self, column: &str) -> Option<&FieldState> {
        let i = self.table.position(column)?;
        self.baseline.as_ref().map(|b| &b[i])
    }

    /// Replace the baseline with the current values.
    pub fn capture_baseline(&mut self) {
        self.baseline = Some(self.fields.clone());
    }

    /// Columns whose current state differs from the baseline.
    ///
    /// Without a baseline every set column counts as changed. Unset columns
    /// are never reported.
    pub fn changed_columns(&self) -> Vec<&ColumnSpec> {
        self.table
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| self.fields[*i].is_set() && self.changed_at(*i))
            .map(|(_, column)| column)
            .collect()
    }

    /// Check if a column's current state differs from its baseline.
    ///
    /// Values compare after conversion through the column type, so `"2"` in
    /// an integer column equals a baseline of `2`. Without a baseline every
    /// set column counts as changed.
    pub fn is_changed(&self, column: &str) -> bool {
        self.table
            .position(column)
            .is_some_and(|i| self.changed_at(i))
    }

    fn changed_at(&self, i: usize) -> bool {
        let current = &self.fields[i];
        let Some(baseline) = &self.baseline else {
            return current.is_set();
        };
        match (&baseline[i], current) {
            (FieldState::Value(before), FieldState::Value(after)) => {
                let tag = self.table.columns[i].tag;
                match (tag.coerce(before), tag.coerce(after)) {
                    (Ok(b), Ok(a)) => b != a,
                    _ => before != after,
                }
            }
            (before, after) => before != after,
        }
    }

    /// Current key values in key order; `None` if any key column is unset.
    pub fn key_values(&self) -> Option<Vec<Value>> {
        self.table
            .key
            .columns()
            .map(|c| self.state(c).and_then(FieldState::to_value))
            .collect()
    }

    /// Baseline key values in key order.
    ///
    /// Fails with `MissingKeyValue` when there is no baseline or a key column
    /// is unset or null in it.
    pub fn baseline_key_values(&self) -> Result<Vec<Value>, Error> {
        self.table
            .key
            .columns()
            .map(|column| match self.baseline_state(column) {
                Some(FieldState::Value(v)) => Ok(v.clone()),
                _ => Err(Error::MissingKeyValue {
                    table: self.table.name.clone(),
                    column: column.to_string(),
                }),
            })
            .collect()
    }
}
