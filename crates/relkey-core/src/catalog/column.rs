//! Column definitions for tables.

use relkey_proto::{TypeTag, Value};
use serde::{Deserialize, Serialize};

/// A column definition within a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column identifier.
    pub id: String,
    /// Column data type; selects the conversion pair.
    #[serde(rename = "type")]
    pub tag: TypeTag,
    /// Value used on insert when the column is unset.
    #[serde(default)]
    pub default: Option<Value>,
    /// Executor stamp filled from the executor context on write.
    #[serde(default)]
    pub stamp: Option<StampRole>,
}

/// Audit columns written from the executor context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StampRole {
    /// Timestamp of the inserting unit of work.
    CreatedAt,
    /// Acting user of the insert.
    CreatedBy,
    /// Acting program of the insert.
    CreatedProgram,
    /// Timestamp of the last write.
    UpdatedAt,
    /// Acting user of the last write.
    UpdatedBy,
    /// Acting program of the last write.
    UpdatedProgram,
}

impl StampRole {
    /// Check if this stamp is written on update as well as insert.
    pub fn on_update(&self) -> bool {
        matches!(
            self,
            StampRole::UpdatedAt | StampRole::UpdatedBy | StampRole::UpdatedProgram
        )
    }
}

impl ColumnSpec {
    /// Create a new column.
    pub fn new(id: impl Into<String>, tag: TypeTag) -> Self {
        Self {
            id: id.into(),
            tag,
            default: None,
            stamp: None,
        }
    }

    /// Set the default value.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Mark as an executor stamp column.
    pub fn stamped(mut self, role: StampRole) -> Self {
        self.stamp = Some(role);
        self
    }

    /// Check if this column is written from the executor context.
    pub fn is_stamp(&self) -> bool {
        self.stamp.is_some()
    }
}
