//! Key-range queries and statement building.
//!
//! [`KeyRange`]s expand into [`Predicate`] trees over a table's composite
//! key, [`StatementBuilder`] renders them into [`Statement`]s, and
//! [`BatchQueryPlanner`] folds many key lookups into one query.

mod batch;
mod predicate;
mod sql;
mod statement;

pub use batch::{BatchQueryPlanner, CollectionHandle, EntityHandle, PlannerStats, Resolution};
pub use predicate::{CompareOp, KeyRange, Predicate};
pub use sql::{Statement, StatementKind};
pub use statement::{SelectQuery, StatementBuilder};
