//! Per-unit-of-work executor context.
//!
//! The context carries the acting identity and the clock reading used to
//! stamp audit columns, plus the flags that select write behavior.

use chrono::NaiveDateTime;
use relkey_proto::Value;

use crate::catalog::StampRole;

/// Identity, clock and write flags of one unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorContext {
    /// Timestamp written to `*_at` stamp columns.
    pub timestamp: NaiveDateTime,
    /// Acting user written to `*_by` stamp columns.
    pub user_id: String,
    /// Acting program written to `*_program` stamp columns.
    pub program_id: String,
    /// Replaying inbound data: stamp values already set on an entity are kept.
    pub input: bool,
    /// Updates target only changed columns and skip rows already equal.
    pub diff_only: bool,
}

impl ExecutorContext {
    /// Create a context stamped with the current local time.
    pub fn new(user_id: impl Into<String>, program_id: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Local::now().naive_local(),
            user_id: user_id.into(),
            program_id: program_id.into(),
            input: false,
            diff_only: false,
        }
    }

    /// Pin the stamp timestamp.
    pub fn at(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the inbound-data flag.
    pub fn with_input(mut self, input: bool) -> Self {
        self.input = input;
        self
    }

    /// Set diff-only update mode.
    pub fn with_diff_only(mut self, diff_only: bool) -> Self {
        self.diff_only = diff_only;
        self
    }

    /// Value written to a column with the given stamp role.
    pub fn stamp_value(&self, role: StampRole) -> Value {
        match role {
            StampRole::CreatedAt | StampRole::UpdatedAt => Value::Timestamp(self.timestamp),
            StampRole::CreatedBy | StampRole::UpdatedBy => Value::String(self.user_id.clone()),
            StampRole::CreatedProgram | StampRole::UpdatedProgram => {
                Value::String(self.program_id.clone())
            }
        }
    }
}
